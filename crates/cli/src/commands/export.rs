use std::fs;
use std::path::{Path, PathBuf};

use procure_core::stats::export::{department_options, month_options};
use procure_core::stats::{build_export, ExportSelection, YearMonth};
use serde::Serialize;

use crate::commands::input::{load_requests, resolve_now};
use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "export";

pub struct ExportArgs<'a> {
    pub config_path: Option<PathBuf>,
    pub input: &'a Path,
    pub months: &'a [String],
    pub departments: &'a [String],
    pub skip_details: bool,
    pub skip_alerts: bool,
    pub options_only: bool,
    pub output: Option<&'a Path>,
    pub now: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct MonthOption {
    value: YearMonth,
    label: String,
}

#[derive(Debug, Serialize)]
struct ExportOptions {
    months: Vec<MonthOption>,
    departments: Vec<String>,
}

pub fn run(args: ExportArgs<'_>) -> CommandResult {
    let config = match load_config(COMMAND, args.config_path.clone()) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let now = match resolve_now(COMMAND, args.now) {
        Ok(now) => now,
        Err(failure) => return failure,
    };
    let requests = match load_requests(COMMAND, args.input) {
        Ok(requests) => requests,
        Err(failure) => return failure,
    };

    if args.options_only {
        let options = ExportOptions {
            months: month_options(config.statistics.project_start, now)
                .into_iter()
                .map(|(value, label)| MonthOption { value, label })
                .collect(),
            departments: department_options(&requests),
        };
        return CommandResult::with_data(COMMAND, "export filter options", options);
    }

    let mut months = Vec::with_capacity(args.months.len());
    for raw in args.months {
        match raw.parse::<YearMonth>() {
            Ok(month) => months.push(month),
            Err(error) => {
                return CommandResult::failure(COMMAND, "invalid_argument", error.to_string(), 4);
            }
        }
    }
    let selection = ExportSelection {
        months,
        departments: args.departments.to_vec(),
        include_details: !args.skip_details,
        include_alerts: !args.skip_alerts,
        overdue_alert_days: config.statistics.overdue_alert_days,
    };
    let model = build_export(&requests, &selection, now);
    let message = format!(
        "{} ({} request(s), {} alert(s))",
        model.period_label,
        model.summary.counts.total_requests,
        model.alerts.len()
    );

    let Some(output) = args.output else {
        return CommandResult::with_data(COMMAND, message, model);
    };
    let written = serde_json::to_vec_pretty(&model)
        .map_err(|error| error.to_string())
        .and_then(|bytes| fs::write(output, bytes).map_err(|error| error.to_string()));
    match written {
        Ok(()) => {
            tracing::info!(
                event_name = "cli.export.written",
                path = %output.display(),
                alerts = model.alerts.len(),
                "export written"
            );
            CommandResult::success(COMMAND, format!("{message} written to {}", output.display()))
        }
        Err(error) => CommandResult::failure(
            COMMAND,
            "output_write",
            format!("could not write `{}`: {error}", output.display()),
            8,
        ),
    }
}
