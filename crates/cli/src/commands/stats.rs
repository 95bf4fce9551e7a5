use std::path::{Path, PathBuf};

use procure_core::policy::Route;
use procure_core::stats::{
    compare_periods, department_breakdown, monthly_series, processing_delays, recent_months,
    request_stats, status_distribution, DepartmentCount, MonthBucket, Period, PeriodComparison,
    ProcessingDelays, RequestStats, StatusShare, YearMonth,
};
use procure_core::UserRole;
use serde::Serialize;

use crate::commands::input::{load_requests, resolve_now};
use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "stats";
const TOP_DEPARTMENTS: usize = 5;

#[derive(Debug, Serialize)]
struct StatisticsReport<'a> {
    overall: RequestStats,
    comparison: PeriodComparison,
    distribution: Vec<StatusShare>,
    departments: Vec<DepartmentCount>,
    monthly: &'a [MonthBucket],
    delays: ProcessingDelays,
}

/// `current_month`, `last_month`, `quarter`, `year`, or a `YYYY-MM` month.
pub fn parse_period(raw: &str) -> Option<Period> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "current_month" | "month" => Some(Period::CurrentMonth),
        "last_month" => Some(Period::LastMonth),
        "quarter" => Some(Period::Quarter),
        "year" => Some(Period::Year),
        other => other
            .parse::<YearMonth>()
            .ok()
            .map(|month| Period::Custom { month: month.month, year: month.year }),
    }
}

pub fn run(
    config_path: Option<PathBuf>,
    input: &Path,
    period: &str,
    role: &str,
    now: Option<&str>,
) -> CommandResult {
    let config = match load_config(COMMAND, config_path) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let role = UserRole::from_code(role);
    if !Route::Statistics.allows(&role) {
        return CommandResult::failure(
            COMMAND,
            "forbidden",
            format!("statistics are reserved to mg and director, not `{role}`"),
            5,
        );
    }
    let Some(period) = parse_period(period) else {
        return CommandResult::failure(
            COMMAND,
            "invalid_argument",
            format!(
                "unknown period `{period}` (expected current_month|last_month|quarter|year|YYYY-MM)"
            ),
            4,
        );
    };
    let now = match resolve_now(COMMAND, now) {
        Ok(now) => now,
        Err(failure) => return failure,
    };
    let requests = match load_requests(COMMAND, input) {
        Ok(requests) => requests,
        Err(failure) => return failure,
    };

    let comparison = compare_periods(&requests, period, now);
    let series = monthly_series(&requests, config.statistics.project_start, now);
    let report = StatisticsReport {
        overall: request_stats(&requests),
        distribution: status_distribution(&requests, &comparison.window),
        departments: department_breakdown(&requests, TOP_DEPARTMENTS),
        monthly: recent_months(&series, config.statistics.trend_window_months),
        delays: processing_delays(&requests, now),
        comparison,
    };

    tracing::info!(
        event_name = "cli.stats.computed",
        requests = requests.len(),
        "statistics computed"
    );
    CommandResult::with_data(
        COMMAND,
        format!("{} requests summarized", report.comparison.current.counts.total_requests),
        report,
    )
}

#[cfg(test)]
mod tests {
    use procure_core::stats::Period;

    use super::parse_period;

    #[test]
    fn periods_parse_by_name_or_month() {
        assert_eq!(parse_period("quarter"), Some(Period::Quarter));
        assert_eq!(parse_period(" Last_Month "), Some(Period::LastMonth));
        assert_eq!(parse_period("2024-11"), Some(Period::Custom { month: 11, year: 2024 }));
        assert_eq!(parse_period("semaine"), None);
        assert_eq!(parse_period("2147483647-12"), None);
    }
}
