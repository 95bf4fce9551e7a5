use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::request::{Request, RequestStatus};
use crate::stats::period::{Period, PeriodWindow};
use crate::stats::round_percent;
use crate::stats::trend::{trend, Trend};
use crate::status;

/// Counts per lifecycle bucket, as the dashboard shows them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStats {
    #[serde(default)]
    pub total_requests: u64,
    #[serde(default)]
    pub pending_requests: u64,
    #[serde(default)]
    pub in_progress_requests: u64,
    #[serde(default)]
    pub approved_requests: u64,
    #[serde(default)]
    pub rejected_requests: u64,
}

pub fn request_stats<'a>(requests: impl IntoIterator<Item = &'a Request>) -> RequestStats {
    let mut stats = RequestStats::default();
    for request in requests {
        stats.total_requests += 1;
        match request.status {
            RequestStatus::Pending => stats.pending_requests += 1,
            RequestStatus::MgApproved | RequestStatus::AccountingReviewed => {
                stats.in_progress_requests += 1
            }
            RequestStatus::DirectorApproved => stats.approved_requests += 1,
            RequestStatus::Rejected => stats.rejected_requests += 1,
            RequestStatus::Unrecognized(_) => {}
        }
    }
    stats
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PeriodStats {
    #[serde(flatten)]
    pub counts: RequestStats,
    /// Sum of displayed costs over director-approved requests.
    pub total_amount: Decimal,
    pub validation_rate: u32,
}

pub fn validation_rate(approved: u64, total: u64) -> u32 {
    round_percent(approved, total)
}

/// Figures for requests whose creation date falls in `window`.
pub fn period_stats(requests: &[Request], window: &PeriodWindow) -> PeriodStats {
    let in_window: Vec<&Request> =
        requests.iter().filter(|request| window.contains(&request.created_at)).collect();
    summarize(in_window)
}

pub(crate) fn summarize(requests: Vec<&Request>) -> PeriodStats {
    let total_amount = requests
        .iter()
        .filter(|request| request.status == RequestStatus::DirectorApproved)
        .map(|request| request.display_cost())
        .sum();
    let counts = request_stats(requests);
    let validation_rate = validation_rate(counts.approved_requests, counts.total_requests);
    PeriodStats { counts, total_amount, validation_rate }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeriodTrends {
    pub total_requests: Trend,
    pub approved_requests: Trend,
    pub total_amount: Trend,
    pub validation_rate: Trend,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeriodComparison {
    pub period: Period,
    pub window: PeriodWindow,
    pub current: PeriodStats,
    pub previous: PeriodStats,
    pub trends: PeriodTrends,
}

/// Current window against the one just before it.
pub fn compare_periods(
    requests: &[Request],
    period: Period,
    now: DateTime<Utc>,
) -> PeriodComparison {
    let window = period.window(0, now);
    let current = period_stats(requests, &window);
    let previous = period_stats(requests, &period.window(1, now));

    let trends = PeriodTrends {
        total_requests: trend(
            Decimal::from(current.counts.total_requests),
            Decimal::from(previous.counts.total_requests),
        ),
        approved_requests: trend(
            Decimal::from(current.counts.approved_requests),
            Decimal::from(previous.counts.approved_requests),
        ),
        total_amount: trend(current.total_amount, previous.total_amount),
        validation_rate: trend(
            Decimal::from(current.validation_rate),
            Decimal::from(previous.validation_rate),
        ),
    };

    PeriodComparison { period, window, current, previous, trends }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusShare {
    pub status: RequestStatus,
    pub label: String,
    pub count: u64,
    pub percentage: u32,
}

/// One entry per known status that has at least one request in `window`.
pub fn status_distribution(requests: &[Request], window: &PeriodWindow) -> Vec<StatusShare> {
    let counts: Vec<(RequestStatus, u64)> = RequestStatus::KNOWN
        .iter()
        .map(|status| {
            let count = requests
                .iter()
                .filter(|request| window.contains(&request.created_at) && request.status == *status)
                .count() as u64;
            (status.clone(), count)
        })
        .collect();
    let total: u64 = counts.iter().map(|(_, count)| count).sum();

    counts
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(status, count)| StatusShare {
            label: status::badge(&status).label,
            status,
            count,
            percentage: round_percent(count, total),
        })
        .collect()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingDelays {
    pub average_days: Decimal,
    pub mg_validation_days: Decimal,
    pub accounting_review_days: Decimal,
    pub director_approval_days: Decimal,
}

/// Average days from creation to final approval, split across the stages
/// in a fixed 30/40/30 ratio. Each request counts for at least one day.
pub fn processing_delays(requests: &[Request], now: DateTime<Utc>) -> ProcessingDelays {
    let delays: Vec<i64> = requests
        .iter()
        .filter(|request| request.status == RequestStatus::DirectorApproved)
        .map(|request| {
            let finished = request.updated_at.unwrap_or(now);
            (finished - request.created_at).num_days().max(1)
        })
        .collect();
    if delays.is_empty() {
        return ProcessingDelays::default();
    }

    let average = Decimal::from(delays.iter().sum::<i64>()) / Decimal::from(delays.len() as u64);
    let share = |ratio: Decimal| round_tenths(average * ratio);
    ProcessingDelays {
        average_days: round_tenths(average),
        mg_validation_days: share(Decimal::new(3, 1)),
        accounting_review_days: share(Decimal::new(4, 1)),
        director_approval_days: share(Decimal::new(3, 1)),
    }
}

fn round_tenths(value: Decimal) -> Decimal {
    ((value * Decimal::TEN) + Decimal::new(5, 1)).floor() / Decimal::TEN
}
