use std::path::Path;

use procure_core::listing::{
    list_requests, sort_requests, ListQuery, SortDirection, SortKey, SortState, StatusFilter,
};
use procure_core::policy::needs_action;
use procure_core::status;
use procure_core::Request;
use serde::Serialize;
use serde_json::Value;

use crate::commands::input::{load_requests, viewer};
use crate::commands::CommandResult;

const COMMAND: &str = "list";

#[derive(Debug, Serialize)]
struct ListedRequest<'a> {
    #[serde(flatten)]
    request: &'a Request,
    status_label: String,
    urgency_label: String,
    needs_action: bool,
}

pub struct ListArgs<'a> {
    pub input: &'a Path,
    pub user_id: i64,
    pub role: &'a str,
    pub status: &'a str,
    pub search: Option<&'a str>,
    pub sort: &'a str,
    pub ascending: bool,
}

pub fn parse_sort_key(raw: &str) -> Option<SortKey> {
    serde_json::from_value(Value::String(raw.trim().to_ascii_lowercase())).ok()
}

/// Requests the viewer may see, filtered then ordered.
pub fn run(args: ListArgs<'_>) -> CommandResult {
    let Some(key) = parse_sort_key(args.sort) else {
        return CommandResult::failure(
            COMMAND,
            "invalid_argument",
            format!("unknown sort key `{}`", args.sort),
            4,
        );
    };
    let requests = match load_requests(COMMAND, args.input) {
        Ok(requests) => requests,
        Err(failure) => return failure,
    };

    let viewer = viewer(args.user_id, args.role);
    let query = ListQuery {
        status: StatusFilter::from_code(args.status),
        search: args.search.map(str::to_owned),
    };
    let mut visible = list_requests(&requests, &viewer, &query);
    let direction = if args.ascending { SortDirection::Asc } else { SortDirection::Desc };
    sort_requests(&mut visible, SortState { key, direction });

    let rows: Vec<ListedRequest<'_>> = visible
        .into_iter()
        .map(|request| ListedRequest {
            request,
            status_label: status::badge(&request.status).label,
            urgency_label: status::urgency_badge(request.urgency).label,
            needs_action: needs_action(request, &viewer.role),
        })
        .collect();
    CommandResult::with_data(COMMAND, format!("{} request(s) listed", rows.len()), rows)
}

#[cfg(test)]
mod tests {
    use procure_core::listing::SortKey;

    use super::parse_sort_key;

    #[test]
    fn sort_keys_use_column_names() {
        assert_eq!(parse_sort_key("estimated_cost"), Some(SortKey::EstimatedCost));
        assert_eq!(parse_sort_key("USER_NAME"), Some(SortKey::UserName));
        assert_eq!(parse_sort_key("price"), None);
    }
}
