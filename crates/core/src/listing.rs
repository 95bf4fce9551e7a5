//! Filtering and ordering behind the request list and validation queue.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::request::{Request, RequestStatus, Urgency};
use crate::policy::{is_visible, needs_action, queue_status, Viewer};
use crate::status;

/// Days a queued request may wait before it is flagged as late.
pub const OVERDUE_AFTER_DAYS: i64 = 3;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    /// Past MG but not yet decided by the director.
    InProgress,
    Exactly(RequestStatus),
}

impl StatusFilter {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "" | "all" => Self::All,
            "in_progress" => Self::InProgress,
            other => Self::Exactly(RequestStatus::from_code(other)),
        }
    }

    pub fn matches(&self, status: &RequestStatus) -> bool {
        match self {
            Self::All => true,
            Self::InProgress => status.is_in_progress(),
            Self::Exactly(expected) => expected == status,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub status: StatusFilter,
    pub search: Option<String>,
}

fn matches_search(request: &Request, search: Option<&str>) -> bool {
    let Some(needle) = search.map(str::trim).filter(|needle| !needle.is_empty()) else {
        return true;
    };
    let needle = needle.to_lowercase();
    [&request.item_description, &request.user_name, &request.justification]
        .into_iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Requests the viewer may see that pass the status and search filters.
pub fn list_requests<'a>(
    requests: &'a [Request],
    viewer: &Viewer,
    query: &ListQuery,
) -> Vec<&'a Request> {
    requests
        .iter()
        .filter(|request| is_visible(request, viewer))
        .filter(|request| query.status.matches(&request.status))
        .filter(|request| matches_search(request, query.search.as_deref()))
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyFilter {
    #[default]
    All,
    /// High or critical.
    Urgent,
    Only(Urgency),
}

impl UrgencyFilter {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "" | "all" => Self::All,
            "urgent" => Self::Urgent,
            other => Urgency::from_code(other).map_or(Self::All, Self::Only),
        }
    }

    pub fn matches(self, urgency: Urgency) -> bool {
        match self {
            Self::All => true,
            Self::Urgent => urgency.is_urgent(),
            Self::Only(expected) => urgency == expected,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueueEntry<'a> {
    pub request: &'a Request,
    pub days_waiting: i64,
    pub overdue: bool,
    pub needs_action: bool,
}

/// The viewer's validation queue. Empty for roles without a queue.
pub fn validation_queue<'a>(
    requests: &'a [Request],
    viewer: &Viewer,
    urgency: UrgencyFilter,
    search: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<QueueEntry<'a>> {
    let Some(status) = queue_status(&viewer.role) else {
        return Vec::new();
    };
    requests
        .iter()
        .filter(|request| request.status == status)
        .filter(|request| urgency.matches(request.urgency))
        .filter(|request| matches_search(request, search))
        .map(|request| {
            let days_waiting = request.age_in_days(now);
            QueueEntry {
                request,
                days_waiting,
                overdue: days_waiting > OVERDUE_AFTER_DAYS,
                needs_action: needs_action(request, &viewer.role),
            }
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    CreatedAt,
    EstimatedCost,
    Urgency,
    Status,
    ItemDescription,
    UserName,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortState {
    /// Newest first.
    fn default() -> Self {
        Self { key: SortKey::CreatedAt, direction: SortDirection::Desc }
    }
}

impl SortState {
    /// Clicking a column: ascending first, a second click on an ascending
    /// column flips it.
    pub fn toggle(self, key: SortKey) -> Self {
        let direction = if self.key == key && self.direction == SortDirection::Asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        Self { key, direction }
    }

    fn compare(self, a: &Request, b: &Request) -> Ordering {
        let ordering = match self.key {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::EstimatedCost => a
                .estimated_cost
                .unwrap_or(Decimal::ZERO)
                .cmp(&b.estimated_cost.unwrap_or(Decimal::ZERO)),
            SortKey::Urgency => status::urgency_badge(a.urgency)
                .rank
                .cmp(&status::urgency_badge(b.urgency).rank),
            SortKey::Status => {
                status::badge(&a.status).sort_key.cmp(&status::badge(&b.status).sort_key)
            }
            SortKey::ItemDescription => a.item_description.cmp(&b.item_description),
            SortKey::UserName => a.user_name.cmp(&b.user_name),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Stable sort: equal keys keep their incoming order in both directions.
pub fn sort_requests(requests: &mut [&Request], sort: SortState) {
    requests.sort_by(|a, b| sort.compare(a, b));
}
