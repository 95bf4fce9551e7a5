//! Aggregates over the request list returned by the dashboard endpoint.
//!
//! Everything here is a pure function of the request list and an explicit
//! `now`, so the same inputs always produce the same figures.

pub mod department;
pub mod export;
pub mod kpi;
pub mod period;
pub mod series;
pub mod trend;

pub use department::{department_breakdown, DepartmentCount};
pub use export::{build_export, ExportModel, ExportSelection};
pub use kpi::{
    compare_periods, period_stats, processing_delays, request_stats, status_distribution,
    validation_rate, PeriodComparison, PeriodStats, ProcessingDelays, RequestStats, StatusShare,
};
pub use period::{Period, PeriodWindow, YearMonth};
pub use series::{monthly_series, recent_months, MonthBucket};
pub use trend::{trend, Trend, TrendDirection};

/// `round(100 * part / whole)` with halves rounded up; 0 when `whole` is 0.
pub fn round_percent(part: u64, whole: u64) -> u32 {
    if whole == 0 {
        return 0;
    }
    let rounded = (200 * part + whole) / (2 * whole);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::round_percent;

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(round_percent(0, 0), 0);
        assert_eq!(round_percent(1, 4), 25);
        assert_eq!(round_percent(1, 8), 13);
        assert_eq!(round_percent(2, 3), 67);
        assert_eq!(round_percent(1, 3), 33);
    }
}
