pub mod api;
pub mod attachments;
pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod forms;
pub mod listing;
pub mod password_reset;
pub mod policy;
pub mod session;
pub mod stats;
pub mod status;
pub mod workflow;

pub use domain::attachment::{
    Attachment, AttachmentId, FileCandidate, PendingAttachment, PersistedAttachment,
};
pub use domain::request::{ApprovalStage, Request, RequestId, RequestStatus, Step, Urgency};
pub use domain::user::{User, UserId, UserPatch, UserRole};
pub use errors::{ApiError, ApplicationError, DomainError, Notice, NoticeKind};
pub use flows::{derive_timeline, FlowEngine, FlowState, TimelineStage};
pub use policy::{is_visible, needs_action, Viewer};
pub use session::{AuthProvider, AuthState};
pub use workflow::{RequestWorkflow, WorkflowOutcome};
