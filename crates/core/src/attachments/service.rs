use futures_util::future::join_all;
use serde::Serialize;

use crate::api::AttachmentsApi;
use crate::attachments::rules::{AttachmentRules, FileRejection};
use crate::domain::attachment::{
    AttachmentId, FileCandidate, PendingAttachment, PersistedAttachment,
};
use crate::domain::request::RequestId;
use crate::errors::ApiError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of a batch of uploads. Every file is accounted for exactly once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub uploaded: Vec<PersistedAttachment>,
    pub failed: Vec<UploadFailure>,
    pub rejected: Vec<FileRejection>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.uploaded.len()
    }

    /// Failed uploads plus files refused before any call was made.
    pub fn failures(&self) -> usize {
        self.failed.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploaded.is_empty() && self.failures() == 0
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures() == 0
    }

    pub fn summary(&self) -> String {
        format!("{} fichier(s) ajouté(s), {} échec(s)", self.succeeded(), self.failures())
    }
}

pub struct AttachmentService<A> {
    api: A,
    rules: AttachmentRules,
}

impl<A> AttachmentService<A>
where
    A: AttachmentsApi,
{
    pub fn new(api: A, rules: AttachmentRules) -> Self {
        Self { api, rules }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn rules(&self) -> &AttachmentRules {
        &self.rules
    }

    pub async fn list(&self, request_id: RequestId) -> Result<Vec<PersistedAttachment>, ApiError> {
        self.api.list(request_id).await
    }

    /// Uploads staged files once the owning action has succeeded.
    ///
    /// All uploads run concurrently and every one is awaited; a failure
    /// never cancels or undoes its siblings.
    pub async fn settle_staged(
        &self,
        request_id: RequestId,
        staged: Vec<PendingAttachment>,
    ) -> BatchReport {
        let uploads = staged.iter().map(|pending| async move {
            let result = self.api.upload(request_id, &pending.file, &pending.description).await;
            (pending.file.name.clone(), result)
        });
        let settled = join_all(uploads).await;

        let mut report = BatchReport::default();
        for (name, result) in settled {
            record(&mut report, name, result);
        }
        tracing::info!(
            event_name = "attachments.batch.settled",
            request_id = request_id.0,
            succeeded = report.succeeded(),
            failed = report.failures(),
            "staged uploads settled"
        );
        report
    }

    /// Validates and uploads each file right away, one after the other.
    pub async fn upload_now(
        &self,
        request_id: RequestId,
        files: Vec<FileCandidate>,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for file in files {
            if let Err(rejection) = self.rules.check(&file) {
                report.rejected.push(rejection);
                continue;
            }
            let result = self.api.upload(request_id, &file, &file.name).await;
            record(&mut report, file.name.clone(), result);
        }
        tracing::info!(
            event_name = "attachments.upload.completed",
            request_id = request_id.0,
            succeeded = report.succeeded(),
            failed = report.failures(),
            "immediate uploads completed"
        );
        report
    }

    pub async fn delete(&self, attachment_id: AttachmentId) -> Result<(), ApiError> {
        let result = self.api.delete(attachment_id).await;
        if let Err(error) = &result {
            tracing::warn!(
                event_name = "attachments.delete.failed",
                attachment_id = attachment_id.0,
                error = %error,
                "attachment delete failed"
            );
        }
        result
    }
}

fn record(
    report: &mut BatchReport,
    name: String,
    result: Result<PersistedAttachment, ApiError>,
) {
    match result {
        Ok(attachment) => report.uploaded.push(attachment),
        Err(error) => {
            tracing::warn!(
                event_name = "attachments.upload.failed",
                file = %name,
                error = %error,
                "attachment upload failed"
            );
            report.failed.push(UploadFailure { name, error: error.to_string() });
        }
    }
}
