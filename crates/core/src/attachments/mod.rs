//! Files attached to purchase requests, from local selection to storage.

pub mod rules;
pub mod service;
pub mod staging;

pub use rules::{can_delete, can_upload, AttachmentRules, FileRejection, RequestPhase};
pub use service::{AttachmentService, BatchReport, UploadFailure};
pub use staging::{AttachmentStaging, StageReport};
