use std::path::Path;

use procure_core::flows::FlowState;
use procure_core::status;
use procure_core::{derive_timeline, ApprovalStage, RequestId, TimelineStage};
use serde::Serialize;

use crate::commands::input::load_requests;
use crate::commands::CommandResult;

const COMMAND: &str = "timeline";

#[derive(Debug, Serialize)]
struct TimelineReport {
    id: RequestId,
    status: String,
    status_label: String,
    terminal: bool,
    awaiting: Option<ApprovalStage>,
    stages: [TimelineStage; 4],
}

pub fn run(input: &Path, id: u64) -> CommandResult {
    let requests = match load_requests(COMMAND, input) {
        Ok(requests) => requests,
        Err(failure) => return failure,
    };
    let Some(request) = requests.iter().find(|request| request.id == RequestId(id)) else {
        return CommandResult::failure(
            COMMAND,
            "not_found",
            format!("request {id} is not in `{}`", input.display()),
            6,
        );
    };

    let state = FlowState::of(request);
    let report = TimelineReport {
        id: request.id,
        status: request.status.code().to_owned(),
        status_label: status::badge(&request.status).label,
        terminal: state.map(FlowState::is_terminal).unwrap_or(false),
        awaiting: state.and_then(FlowState::awaiting),
        stages: derive_timeline(request),
    };
    CommandResult::with_data(COMMAND, format!("timeline for request {id}"), report)
}
