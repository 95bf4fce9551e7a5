use serde::Serialize;
use thiserror::Error;

use crate::config::AttachmentsConfig;
use crate::domain::attachment::{Attachment, FileCandidate};
use crate::domain::request::RequestStatus;
use crate::domain::user::{UserId, UserRole};
use crate::policy::Viewer;

pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Where the request sits when files are being added.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestPhase {
    /// The request form is open and nothing exists server-side yet.
    Creating,
    Stored(RequestStatus),
}

impl RequestPhase {
    fn is_closed(&self) -> bool {
        matches!(self, Self::Stored(RequestStatus::Rejected | RequestStatus::DirectorApproved))
    }

    fn mg_window(&self, viewer: &Viewer) -> bool {
        viewer.role == UserRole::Mg
            && matches!(self, Self::Creating | Self::Stored(RequestStatus::Pending))
    }
}

/// Whether the viewer may add files.
///
/// Accounting and director only ever read attachments, even while a
/// decision is waiting on them.
pub fn can_upload(phase: &RequestPhase, viewer: &Viewer, owner: UserId) -> bool {
    phase.mg_window(viewer) || (viewer.id == owner && !phase.is_closed())
}

/// Same rules as [`can_upload`], except that the owner may only remove files
/// they uploaded themselves. Files still held locally can be discarded by
/// anyone allowed to add them.
pub fn can_delete(
    attachment: &Attachment,
    phase: &RequestPhase,
    viewer: &Viewer,
    owner: UserId,
) -> bool {
    if phase.mg_window(viewer) {
        return true;
    }
    match attachment {
        Attachment::Pending(_) => can_upload(phase, viewer, owner),
        Attachment::Persisted(persisted) => {
            viewer.id == owner && persisted.uploaded_by == viewer.id && !phase.is_closed()
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FileRejection {
    #[error("{name} trop volumineux (max {max_mb}MB)")]
    TooLarge { name: String, max_mb: u64 },
    #[error("Format non supporté: {name}")]
    UnsupportedType { name: String, mime_type: String },
    #[error("{name} est vide")]
    Empty { name: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentRules {
    pub max_file_size_bytes: u64,
    pub allowed_mime_types: Vec<String>,
}

impl Default for AttachmentRules {
    fn default() -> Self {
        Self::from(&AttachmentsConfig::default())
    }
}

impl From<&AttachmentsConfig> for AttachmentRules {
    fn from(config: &AttachmentsConfig) -> Self {
        Self {
            max_file_size_bytes: config.max_file_size_mb.saturating_mul(BYTES_PER_MB),
            allowed_mime_types: config.allowed_mime_types.clone(),
        }
    }
}

impl AttachmentRules {
    /// Size first, then type, then emptiness.
    pub fn check(&self, file: &FileCandidate) -> Result<(), FileRejection> {
        if file.size > self.max_file_size_bytes {
            return Err(FileRejection::TooLarge {
                name: file.name.clone(),
                max_mb: self.max_file_size_bytes / BYTES_PER_MB,
            });
        }
        let mime_type = file.mime_type.trim().to_ascii_lowercase();
        if !self.allowed_mime_types.iter().any(|allowed| allowed.eq_ignore_ascii_case(&mime_type)) {
            return Err(FileRejection::UnsupportedType {
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
            });
        }
        if file.size == 0 {
            return Err(FileRejection::Empty { name: file.name.clone() });
        }
        Ok(())
    }
}
