use serde::{Deserialize, Serialize};

use crate::api::{Decision, DecisionAction};
use crate::domain::request::{ApprovalStage, Request, RequestStatus};
use crate::domain::user::UserRole;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowState {
    Pending,
    MgApproved,
    AccountingReviewed,
    DirectorApproved,
    Rejected { stage: Option<ApprovalStage> },
}

impl FlowState {
    /// Lifecycle position of a loaded request; `None` for statuses this
    /// client does not know.
    pub fn of(request: &Request) -> Option<Self> {
        let state = match &request.status {
            RequestStatus::Pending => Self::Pending,
            RequestStatus::MgApproved => Self::MgApproved,
            RequestStatus::AccountingReviewed => Self::AccountingReviewed,
            RequestStatus::DirectorApproved => Self::DirectorApproved,
            RequestStatus::Rejected => Self::Rejected {
                stage: request.rejected_by_role.as_ref().and_then(ApprovalStage::for_role),
            },
            RequestStatus::Unrecognized(_) => return None,
        };
        Some(state)
    }

    pub fn status(self) -> RequestStatus {
        match self {
            Self::Pending => RequestStatus::Pending,
            Self::MgApproved => RequestStatus::MgApproved,
            Self::AccountingReviewed => RequestStatus::AccountingReviewed,
            Self::DirectorApproved => RequestStatus::DirectorApproved,
            Self::Rejected { .. } => RequestStatus::Rejected,
        }
    }

    /// Stage whose decision is awaited, if any.
    pub fn awaiting(self) -> Option<ApprovalStage> {
        match self {
            Self::Pending => Some(ApprovalStage::Mg),
            Self::MgApproved => Some(ApprovalStage::Accounting),
            Self::AccountingReviewed => Some(ApprovalStage::Director),
            Self::DirectorApproved | Self::Rejected { .. } => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.awaiting().is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowEvent {
    MgValidated,
    AccountingReviewed { budget_available: bool },
    DirectorApproved,
    Rejected { stage: ApprovalStage },
}

impl FlowEvent {
    /// Event a decision produces when taken at `stage`.
    pub fn from_decision(stage: ApprovalStage, decision: &Decision) -> Self {
        match (decision.action, stage) {
            (DecisionAction::Reject, stage) => Self::Rejected { stage },
            (DecisionAction::Approve, ApprovalStage::Mg) => Self::MgValidated,
            (DecisionAction::Approve, ApprovalStage::Accounting) => Self::AccountingReviewed {
                budget_available: decision.budget_available.unwrap_or(true),
            },
            (DecisionAction::Approve, ApprovalStage::Director) => Self::DirectorApproved,
        }
    }

    pub fn stage(self) -> ApprovalStage {
        match self {
            Self::MgValidated => ApprovalStage::Mg,
            Self::AccountingReviewed { .. } => ApprovalStage::Accounting,
            Self::DirectorApproved => ApprovalStage::Director,
            Self::Rejected { stage } => stage,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowContext {
    pub actor: UserRole,
    pub comment: Option<String>,
}

impl FlowContext {
    pub fn new(actor: UserRole) -> Self {
        Self { actor, comment: None }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    UploadStagedAttachments,
    RecordBudgetVerdict { budget_available: bool },
    NotifyStage(ApprovalStage),
    NotifyRequester,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: FlowState,
    pub to: FlowState,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}
