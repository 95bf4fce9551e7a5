use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentId(pub u64);

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file picked locally and not yet sent anywhere.
#[derive(Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub last_modified: Option<i64>,
    pub content: Vec<u8>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: content.len() as u64,
            mime_type: mime_type.into(),
            last_modified: None,
            content,
        }
    }
}

impl fmt::Debug for FileCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCandidate")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("mime_type", &self.mime_type)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingAttachment {
    pub temp_id: Uuid,
    pub description: String,
    pub file: FileCandidate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedAttachment {
    pub id: AttachmentId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file_size_mb: Option<Decimal>,
    pub uploaded_by: UserId,
    #[serde(default)]
    pub uploaded_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub file_url: Option<String>,
}

/// An attachment is either held client-side or already stored by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Attachment {
    Pending(PendingAttachment),
    Persisted(PersistedAttachment),
}

impl Attachment {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Pending(pending) => &pending.description,
            Self::Persisted(persisted) => &persisted.description,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}
