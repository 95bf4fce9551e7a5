use std::path::Path;

use procure_core::listing::{validation_queue, UrgencyFilter};
use procure_core::policy::{queue_status, Route};
use serde::Serialize;

use crate::commands::input::{load_requests, resolve_now, viewer};
use crate::commands::CommandResult;

const COMMAND: &str = "inbox";

#[derive(Debug, Serialize)]
struct InboxSummary {
    total: usize,
    overdue: usize,
    urgent: usize,
}

pub struct InboxArgs<'a> {
    pub input: &'a Path,
    pub user_id: i64,
    pub role: &'a str,
    pub urgency: &'a str,
    pub search: Option<&'a str>,
    pub now: Option<&'a str>,
}

/// The validation queue of one reviewer.
pub fn run(args: InboxArgs<'_>) -> CommandResult {
    let viewer = viewer(args.user_id, args.role);
    if !Route::Validations.allows(&viewer.role) || queue_status(&viewer.role).is_none() {
        return CommandResult::failure(
            COMMAND,
            "forbidden",
            format!("role `{}` has no validation queue", viewer.role),
            5,
        );
    }
    let now = match resolve_now(COMMAND, args.now) {
        Ok(now) => now,
        Err(failure) => return failure,
    };
    let requests = match load_requests(COMMAND, args.input) {
        Ok(requests) => requests,
        Err(failure) => return failure,
    };

    let queue = validation_queue(
        &requests,
        &viewer,
        UrgencyFilter::from_code(args.urgency),
        args.search,
        now,
    );
    let summary = InboxSummary {
        total: queue.len(),
        overdue: queue.iter().filter(|entry| entry.overdue).count(),
        urgent: queue.iter().filter(|entry| entry.request.urgency.is_urgent()).count(),
    };
    let message = format!("{} request(s) awaiting {}", summary.total, viewer.role.display_name());
    CommandResult::with_data(
        COMMAND,
        message,
        serde_json::json!({ "summary": summary, "queue": queue }),
    )
}
