use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::domain::request::ApprovalStage;
use crate::domain::user::UserRole;
use crate::flows::states::{FlowAction, FlowContext, FlowEvent, FlowState, TransitionOutcome};

pub trait FlowDefinition {
    fn initial_state(&self, creator: &UserRole) -> FlowState;
    fn transition(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// MG, then accounting, then director; any of them may reject.
#[derive(Clone, Debug, Default)]
pub struct RequestApprovalFlow;

impl FlowDefinition for RequestApprovalFlow {
    /// Requests created by MG skip their own stage.
    fn initial_state(&self, creator: &UserRole) -> FlowState {
        match creator {
            UserRole::Mg => FlowState::MgApproved,
            _ => FlowState::Pending,
        }
    }

    fn transition(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_request(current, event, context)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self, creator: &UserRole) -> FlowState {
        self.flow.initial_state(creator)
    }

    pub fn apply(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    audit
                        .event("flow.transition_applied", AuditCategory::Flow, AuditOutcome::Success)
                        .with_metadata("from", format!("{:?}", outcome.from))
                        .with_metadata("to", format!("{:?}", outcome.to))
                        .with_metadata("event", format!("{:?}", outcome.event))
                        .with_metadata("comment", context.comment.clone().unwrap_or_default()),
                );
            }
            Err(error) => {
                sink.emit(
                    audit
                        .event(
                            "flow.transition_rejected",
                            AuditCategory::Flow,
                            AuditOutcome::Rejected,
                        )
                        .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FlowEngine<RequestApprovalFlow> {
    fn default() -> Self {
        Self::new(RequestApprovalFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: FlowState, event: FlowEvent },
    #[error("{actor} cannot decide at the {stage:?} stage")]
    WrongActor { stage: ApprovalStage, actor: UserRole },
    #[error("request status `{0}` is not part of the approval lifecycle")]
    UnknownStatus(String),
}

fn transition_request(
    current: &FlowState,
    event: &FlowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{NotifyRequester, NotifyStage, RecordBudgetVerdict, UploadStagedAttachments};
    use FlowState::{AccountingReviewed, DirectorApproved, MgApproved, Pending, Rejected};

    let invalid = || FlowTransitionError::InvalidTransition { state: *current, event: *event };

    if current.awaiting() != Some(event.stage()) {
        return Err(invalid());
    }

    let stage = event.stage();
    if ApprovalStage::for_role(&context.actor) != Some(stage) {
        return Err(FlowTransitionError::WrongActor { stage, actor: context.actor.clone() });
    }

    let (to, actions) = match (current, event) {
        (Pending, FlowEvent::MgValidated) => {
            (MgApproved, vec![UploadStagedAttachments, NotifyStage(ApprovalStage::Accounting)])
        }
        (MgApproved, FlowEvent::AccountingReviewed { budget_available }) => (
            AccountingReviewed,
            vec![
                RecordBudgetVerdict { budget_available: *budget_available },
                NotifyStage(ApprovalStage::Director),
            ],
        ),
        (AccountingReviewed, FlowEvent::DirectorApproved) => {
            (DirectorApproved, vec![NotifyRequester])
        }
        (_, FlowEvent::Rejected { stage }) => {
            let mut actions = vec![NotifyRequester];
            if *stage == ApprovalStage::Mg {
                actions.insert(0, UploadStagedAttachments);
            }
            (Rejected { stage: Some(*stage) }, actions)
        }
        _ => return Err(invalid()),
    };

    Ok(TransitionOutcome { from: *current, to, event: *event, actions })
}
