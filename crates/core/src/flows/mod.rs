pub mod engine;
pub mod states;
pub mod timeline;

pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, RequestApprovalFlow};
pub use states::{FlowAction, FlowContext, FlowEvent, FlowState, TransitionOutcome};
pub use timeline::{derive_timeline, StageStatus, TimelineStage, TimelineStageKey};
