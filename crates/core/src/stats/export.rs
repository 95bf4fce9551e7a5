//! Data behind the statistics spreadsheet export.
//!
//! Produces plain rows; turning them into a workbook is left to the caller.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::request::{Request, RequestId, RequestStatus, Urgency};
use crate::stats::department::{department_name, Naming};
use crate::stats::kpi::{summarize, PeriodStats};
use crate::stats::period::YearMonth;
use crate::stats::series::{long_label, months_between};
use crate::status;

pub const DEFAULT_OVERDUE_ALERT_DAYS: i64 = 7;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSelection {
    #[serde(default)]
    pub months: Vec<YearMonth>,
    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default = "enabled")]
    pub include_details: bool,
    #[serde(default = "enabled")]
    pub include_alerts: bool,
    #[serde(default = "default_overdue_days")]
    pub overdue_alert_days: i64,
}

fn enabled() -> bool {
    true
}

fn default_overdue_days() -> i64 {
    DEFAULT_OVERDUE_ALERT_DAYS
}

impl Default for ExportSelection {
    fn default() -> Self {
        Self {
            months: Vec::new(),
            departments: Vec::new(),
            include_details: true,
            include_alerts: true,
            overdue_alert_days: DEFAULT_OVERDUE_ALERT_DAYS,
        }
    }
}

impl ExportSelection {
    fn matches(&self, request: &Request) -> bool {
        let month_ok = self.months.is_empty()
            || self.months.iter().any(|month| month.contains(&request.created_at));
        let department_ok = self.departments.is_empty()
            || self.departments.contains(&department_name(request, Naming::Export));
        month_ok && department_ok
    }

    pub fn label(&self) -> String {
        let mut label = if self.months.is_empty() {
            "Toutes les données".to_owned()
        } else {
            let months: Vec<String> = self.months.iter().copied().map(long_label).collect();
            format!("Mois: {}", months.join(", "))
        };
        if !self.departments.is_empty() {
            label.push_str(&format!(" - Départements: {}", self.departments.join(", ")));
        }
        label
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub label: String,
    #[serde(flatten)]
    pub stats: PeriodStats,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DetailRow {
    pub id: RequestId,
    pub description: String,
    pub requester: String,
    pub department: String,
    pub status: String,
    pub created_on: NaiveDate,
    pub quantity: u32,
    pub estimated_cost: Decimal,
    pub updated_on: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AlertRow {
    pub id: RequestId,
    pub description: String,
    pub requester: String,
    pub status: String,
    pub urgency: String,
    pub created_on: NaiveDate,
    pub days_waiting: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportModel {
    pub generated_on: NaiveDate,
    pub period_label: String,
    pub summary: PeriodStats,
    pub monthly: Vec<ExportRow>,
    pub departments: Vec<ExportRow>,
    pub details: Vec<DetailRow>,
    pub alerts: Vec<AlertRow>,
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.trim().is_empty() {
        placeholder.to_owned()
    } else {
        value.to_owned()
    }
}

pub fn build_export(
    requests: &[Request],
    selection: &ExportSelection,
    now: DateTime<Utc>,
) -> ExportModel {
    let filtered: Vec<&Request> =
        requests.iter().filter(|request| selection.matches(request)).collect();

    let monthly = selection
        .months
        .iter()
        .map(|month| ExportRow {
            label: long_label(*month),
            stats: summarize(
                filtered
                    .iter()
                    .copied()
                    .filter(|request| month.contains(&request.created_at))
                    .collect(),
            ),
        })
        .collect();

    let departments = selection
        .departments
        .iter()
        .map(|department| ExportRow {
            label: department.clone(),
            stats: summarize(
                filtered
                    .iter()
                    .copied()
                    .filter(|request| department_name(request, Naming::Export) == *department)
                    .collect(),
            ),
        })
        .collect();

    let details = if selection.include_details {
        filtered.iter().map(|request| detail_row(request)).collect()
    } else {
        Vec::new()
    };

    let alerts = if selection.include_alerts {
        alert_rows(&filtered, selection.overdue_alert_days, now)
    } else {
        Vec::new()
    };

    ExportModel {
        generated_on: now.date_naive(),
        period_label: selection.label(),
        summary: summarize(filtered),
        monthly,
        departments,
        details,
        alerts,
    }
}

fn detail_row(request: &Request) -> DetailRow {
    DetailRow {
        id: request.id,
        description: or_placeholder(&request.item_description, "Sans titre"),
        requester: or_placeholder(&request.user_name, "Inconnu"),
        department: department_name(request, Naming::Export),
        status: status::badge(&request.status).label,
        created_on: request.created_at.date_naive(),
        quantity: request.quantity,
        estimated_cost: request.estimated_cost.unwrap_or(Decimal::ZERO),
        updated_on: request.updated_at.map(|at| at.date_naive()),
    }
}

/// Critical requests first, then those waiting at least `overdue_days`.
/// Approved requests never alert and each request appears once.
fn alert_rows(requests: &[&Request], overdue_days: i64, now: DateTime<Utc>) -> Vec<AlertRow> {
    let open = || {
        requests.iter().copied().filter(|request| request.status != RequestStatus::DirectorApproved)
    };
    let critical = open().filter(|request| request.urgency == Urgency::Critical);
    let overdue = open().filter(|request| request.age_in_days(now) >= overdue_days);

    let mut seen = BTreeSet::new();
    critical
        .chain(overdue)
        .filter(|request| seen.insert(request.id))
        .map(|request| AlertRow {
            id: request.id,
            description: or_placeholder(&request.item_description, "Sans titre"),
            requester: or_placeholder(&request.user_name, "Inconnu"),
            status: status::badge(&request.status).label,
            urgency: status::urgency_badge(request.urgency).label,
            created_on: request.created_at.date_naive(),
            days_waiting: request.age_in_days(now),
        })
        .collect()
}

/// Departments offered in the export filter, sorted and distinct.
pub fn department_options(requests: &[Request]) -> Vec<String> {
    requests
        .iter()
        .map(|request| department_name(request, Naming::Export))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Months offered in the export filter with their display labels.
pub fn month_options(project_start: YearMonth, now: DateTime<Utc>) -> Vec<(YearMonth, String)> {
    months_between(project_start, now).into_iter().map(|month| (month, long_label(month))).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{build_export, department_options, month_options, ExportSelection};
    use crate::domain::fixtures::{at, request};
    use crate::domain::request::{Request, RequestId, RequestOwner, Urgency};
    use crate::domain::user::UserRole;
    use crate::stats::period::YearMonth;

    fn owned(id: u64, status: &str, role: UserRole, created: (i32, u32, u32)) -> Request {
        let mut request = request(id, status);
        request.user = Some(RequestOwner { department: None, role: Some(role) });
        request.created_at = at(created.0, created.1, created.2);
        request
    }

    fn sample() -> Vec<Request> {
        let mut critical = owned(1, "mg_approved", UserRole::Employee, (2025, 2, 10));
        critical.urgency = Urgency::Critical;
        let mut approved_critical = owned(2, "director_approved", UserRole::Mg, (2025, 1, 5));
        approved_critical.urgency = Urgency::Critical;
        vec![
            critical,
            approved_critical,
            owned(3, "pending", UserRole::Employee, (2025, 1, 20)),
            owned(4, "rejected", UserRole::Accounting, (2025, 2, 11)),
        ]
    }

    #[test]
    fn filters_by_month_and_department() {
        let now = Utc.with_ymd_and_hms(2025, 2, 12, 12, 0, 0).unwrap();
        let selection = ExportSelection {
            months: vec![YearMonth { year: 2025, month: 2 }],
            departments: vec!["Personnel".to_owned()],
            ..ExportSelection::default()
        };

        let model = build_export(&sample(), &selection, now);

        assert_eq!(model.summary.counts.total_requests, 1);
        assert_eq!(model.details[0].id, RequestId(1));
        assert_eq!(model.details[0].department, "Personnel");
        assert_eq!(model.monthly[0].label, "février 2025");
        assert_eq!(model.departments[0].stats.counts.in_progress_requests, 1);
        assert_eq!(model.period_label, "Mois: février 2025 - Départements: Personnel");
    }

    #[test]
    fn alerts_put_critical_first_and_skip_approved() {
        let now = Utc.with_ymd_and_hms(2025, 2, 12, 12, 0, 0).unwrap();
        let model = build_export(&sample(), &ExportSelection::default(), now);

        let ids: Vec<RequestId> = model.alerts.iter().map(|alert| alert.id).collect();
        assert_eq!(ids, vec![RequestId(1), RequestId(3)]);
        assert_eq!(model.alerts[0].urgency, "Critique");
        assert_eq!(model.alerts[1].days_waiting, 23);
        assert!(model.monthly.is_empty());
        assert_eq!(model.period_label, "Toutes les données");
    }

    #[test]
    fn critical_and_overdue_request_alerts_once() {
        let mut old_critical = owned(7, "pending", UserRole::Employee, (2024, 12, 1));
        old_critical.urgency = Urgency::Critical;
        let now = Utc.with_ymd_and_hms(2025, 2, 12, 12, 0, 0).unwrap();

        let model = build_export(&[old_critical], &ExportSelection::default(), now);
        assert_eq!(model.alerts.len(), 1);
    }

    #[test]
    fn options_are_sorted_and_distinct() {
        assert_eq!(
            department_options(&sample()),
            vec!["Comptabilité".to_owned(), "Moyens Généraux".to_owned(), "Personnel".to_owned()]
        );

        let now = Utc.with_ymd_and_hms(2024, 10, 3, 0, 0, 0).unwrap();
        let months = month_options(YearMonth { year: 2024, month: 8 }, now);
        assert_eq!(months.len(), 3);
        assert_eq!(months[2].1, "octobre 2024");
    }
}
