use serde::Serialize;
use uuid::Uuid;

use crate::attachments::rules::{AttachmentRules, FileRejection};
use crate::domain::attachment::{FileCandidate, PendingAttachment};

/// Files held client-side until the surrounding action succeeds.
#[derive(Clone, Debug, Default)]
pub struct AttachmentStaging {
    rules: AttachmentRules,
    pending: Vec<PendingAttachment>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub accepted: Vec<Uuid>,
    pub rejected: Vec<FileRejection>,
}

impl AttachmentStaging {
    pub fn new(rules: AttachmentRules) -> Self {
        Self { rules, pending: Vec::new() }
    }

    /// Validates each file on its own; one bad file does not drop the rest.
    pub fn stage(&mut self, files: Vec<FileCandidate>) -> StageReport {
        let mut report = StageReport::default();
        for file in files {
            match self.rules.check(&file) {
                Ok(()) => {
                    let temp_id = Uuid::new_v4();
                    self.pending.push(PendingAttachment {
                        temp_id,
                        description: file.name.clone(),
                        file,
                    });
                    report.accepted.push(temp_id);
                }
                Err(rejection) => {
                    tracing::debug!(
                        event_name = "attachments.stage.rejected",
                        reason = %rejection,
                        "file refused before staging"
                    );
                    report.rejected.push(rejection);
                }
            }
        }
        report
    }

    pub fn describe(&mut self, temp_id: Uuid, description: impl Into<String>) -> bool {
        match self.pending.iter_mut().find(|pending| pending.temp_id == temp_id) {
            Some(pending) => {
                pending.description = description.into();
                true
            }
            None => false,
        }
    }

    /// Removes a staged file that was never sent.
    pub fn discard(&mut self, temp_id: Uuid) -> bool {
        let before = self.pending.len();
        self.pending.retain(|pending| pending.temp_id != temp_id);
        self.pending.len() != before
    }

    pub fn pending(&self) -> &[PendingAttachment] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Hands the staged files over for upload and empties the stage.
    pub fn take(&mut self) -> Vec<PendingAttachment> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::AttachmentStaging;
    use crate::attachments::rules::FileRejection;
    use crate::domain::attachment::FileCandidate;

    #[test]
    fn stage_keeps_valid_files_and_reports_the_rest() {
        let mut staging = AttachmentStaging::default();
        let report = staging.stage(vec![
            FileCandidate::new("devis.pdf", "application/pdf", vec![1; 64]),
            FileCandidate::new("vide.png", "image/png", Vec::new()),
            FileCandidate::new("notes.docx", "application/msword", vec![1; 8]),
        ]);

        assert_eq!(report.accepted.len(), 1);
        assert_eq!(
            report.rejected,
            vec![
                FileRejection::Empty { name: "vide.png".to_owned() },
                FileRejection::UnsupportedType {
                    name: "notes.docx".to_owned(),
                    mime_type: "application/msword".to_owned()
                },
            ]
        );
        assert_eq!(staging.pending()[0].description, "devis.pdf");
    }

    #[test]
    fn discard_and_take_empty_the_stage() {
        let mut staging = AttachmentStaging::default();
        let report = staging.stage(vec![
            FileCandidate::new("a.pdf", "application/pdf", vec![1]),
            FileCandidate::new("b.pdf", "application/pdf", vec![1]),
        ]);

        assert!(staging.discard(report.accepted[0]));
        assert!(!staging.discard(report.accepted[0]));
        assert!(staging.describe(report.accepted[1], "Bon de commande"));

        let taken = staging.take();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].description, "Bon de commande");
        assert!(staging.is_empty());
    }
}
