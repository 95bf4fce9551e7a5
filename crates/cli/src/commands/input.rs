//! Reading request exports and the flags shared by the offline commands.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use procure_core::api::{DashboardPayload, Page};
use procure_core::policy::Viewer;
use procure_core::{Request, UserId, UserRole};
use serde::Deserialize;

use crate::commands::CommandResult;

/// Accepted export shapes: a bare array, a paginated list, or a dashboard
/// payload (its `all_requests` list).
#[derive(Deserialize)]
#[serde(untagged)]
enum RequestExport {
    Plain(Vec<Request>),
    Paged(Page<Request>),
    Dashboard(DashboardPayload),
}

pub fn load_requests(command: &str, path: &Path) -> Result<Vec<Request>, CommandResult> {
    let raw = fs::read_to_string(path).map_err(|error| {
        CommandResult::failure(
            command,
            "input_read",
            format!("could not read `{}`: {error}", path.display()),
            3,
        )
    })?;
    let export = serde_json::from_str::<RequestExport>(&raw).map_err(|error| {
        CommandResult::failure(
            command,
            "input_parse",
            format!("`{}` is not a request export: {error}", path.display()),
            3,
        )
    })?;
    let requests = match export {
        RequestExport::Plain(requests) => requests,
        RequestExport::Paged(page) => page.results,
        RequestExport::Dashboard(payload) => payload.all_requests,
    };
    tracing::debug!(
        event_name = "cli.input.loaded",
        command,
        path = %path.display(),
        requests = requests.len(),
        "request export loaded"
    );
    Ok(requests)
}

/// `--now` as RFC 3339, defaulting to the wall clock.
pub fn resolve_now(command: &str, raw: Option<&str>) -> Result<DateTime<Utc>, CommandResult> {
    let Some(raw) = raw else {
        return Ok(Utc::now());
    };
    DateTime::parse_from_rfc3339(raw.trim()).map(|at| at.with_timezone(&Utc)).map_err(|error| {
        CommandResult::failure(
            command,
            "invalid_argument",
            format!("--now `{raw}` is not an RFC 3339 timestamp: {error}"),
            4,
        )
    })
}

pub fn viewer(user_id: i64, role: &str) -> Viewer {
    Viewer::new(UserId(user_id), UserRole::from_code(role))
}
