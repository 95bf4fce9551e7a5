use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::request::{Request, RequestStatus};
use crate::stats::period::YearMonth;

const SHORT_MONTHS: [&str; 12] = [
    "janv.", "févr.", "mars", "avr.", "mai", "juin", "juil.", "août", "sept.", "oct.", "nov.",
    "déc.",
];

const LONG_MONTHS: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// `août 2024`, `janv. 2025`.
pub fn short_label(month: YearMonth) -> String {
    format!("{} {}", SHORT_MONTHS[(month.month as usize - 1) % 12], month.year)
}

/// `août 2024`, `janvier 2025`.
pub fn long_label(month: YearMonth) -> String {
    format!("{} {}", LONG_MONTHS[(month.month as usize - 1) % 12], month.year)
}

/// Every month from `start` through the month of `now`, oldest first.
pub fn months_between(start: YearMonth, now: DateTime<Utc>) -> Vec<YearMonth> {
    let last = YearMonth::of(&now);
    let mut months = Vec::new();
    let mut month = start;
    while month <= last {
        months.push(month);
        let next = month.next();
        // `next` saturates on the last supported month.
        if next <= month {
            break;
        }
        month = next;
    }
    months
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    pub month: YearMonth,
    pub label: String,
    pub request_count: u64,
    pub approved_amount: Decimal,
}

pub fn monthly_series(
    requests: &[Request],
    project_start: YearMonth,
    now: DateTime<Utc>,
) -> Vec<MonthBucket> {
    months_between(project_start, now)
        .into_iter()
        .map(|month| {
            let in_month: Vec<&Request> =
                requests.iter().filter(|request| month.contains(&request.created_at)).collect();
            MonthBucket {
                month,
                label: short_label(month),
                request_count: in_month.len() as u64,
                approved_amount: in_month
                    .iter()
                    .filter(|request| request.status == RequestStatus::DirectorApproved)
                    .map(|request| request.display_cost())
                    .sum(),
            }
        })
        .collect()
}

/// The trailing `count` buckets.
pub fn recent_months(series: &[MonthBucket], count: usize) -> &[MonthBucket] {
    &series[series.len().saturating_sub(count)..]
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{long_label, monthly_series, months_between, recent_months, short_label};
    use crate::domain::fixtures::{at, request};
    use crate::stats::period::YearMonth;

    #[test]
    fn series_covers_project_start_to_now() {
        let mut approved = request(1, "director_approved");
        approved.created_at = at(2024, 9, 12);
        approved.estimated_cost = Some(Decimal::new(75_000, 0));
        let mut pending = request(2, "pending");
        pending.created_at = at(2024, 9, 20);

        let now = Utc.with_ymd_and_hms(2025, 3, 2, 8, 0, 0).unwrap();
        let series = monthly_series(&[approved, pending], YearMonth { year: 2024, month: 8 }, now);

        assert_eq!(series.len(), 8);
        assert_eq!(series[0].label, "août 2024");
        assert_eq!(series[1].request_count, 2);
        assert_eq!(series[1].approved_amount, Decimal::new(75_000, 0));
        assert_eq!(series[7].label, "mars 2025");

        let recent = recent_months(&series, 6);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].month, YearMonth { year: 2024, month: 10 });
    }

    #[test]
    fn start_after_now_yields_nothing() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert!(monthly_series(&[], YearMonth { year: 2024, month: 8 }, now).is_empty());
        assert!(recent_months(&[], 6).is_empty());
    }

    #[test]
    fn months_between_stops_at_last_supported_month() {
        let now = Utc.with_ymd_and_hms(9999, 12, 31, 0, 0, 0).unwrap();
        let months = months_between(YearMonth { year: 9999, month: 11 }, now);
        assert_eq!(months.len(), 2);
    }

    #[test]
    fn french_labels() {
        assert_eq!(short_label(YearMonth { year: 2025, month: 1 }), "janv. 2025");
        assert_eq!(long_label(YearMonth { year: 2025, month: 2 }), "février 2025");
    }
}
