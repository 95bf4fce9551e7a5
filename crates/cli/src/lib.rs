pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::export::ExportArgs;
use crate::commands::inbox::InboxArgs;
use crate::commands::list::ListArgs;

#[derive(Debug, Parser)]
#[command(
    name = "procure",
    about = "Procure operator CLI",
    long_about = "Inspect configuration, check backend readiness, and run the purchase-request \
                  policies and statistics over exported request lists.",
    after_help = "Examples:\n  procure config\n  procure fetch --output requests.json\n  \
                  procure inbox --input requests.json --user-id 3 --role mg\n  \
                  procure stats --input requests.json --period quarter"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Config file (defaults to procure.toml or config/procure.toml)"
    )]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, backend reachability, and configured credentials")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Sign in with the configured account and save the dashboard payload")]
    Fetch {
        #[arg(long, help = "File the payload is written to")]
        output: PathBuf,
    },
    #[command(about = "Requests visible to a user, filtered and sorted")]
    List {
        #[arg(long, help = "Request export (array, paginated list, or dashboard payload)")]
        input: PathBuf,
        #[arg(long)]
        user_id: i64,
        #[arg(long, help = "employee|mg|accounting|director")]
        role: String,
        #[arg(long, default_value = "all", help = "Status code, `in_progress`, or `all`")]
        status: String,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value = "created_at")]
        sort: String,
        #[arg(long, help = "Ascending order (newest first otherwise)")]
        asc: bool,
    },
    #[command(about = "Validation queue of a reviewer, with overdue flags")]
    Inbox {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        user_id: i64,
        #[arg(long, help = "mg|accounting|director")]
        role: String,
        #[arg(long, default_value = "all", help = "all|urgent|low|medium|high|critical")]
        urgency: String,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, help = "Reference time (RFC 3339), defaults to now")]
        now: Option<String>,
    },
    #[command(about = "Approval timeline of one request")]
    Timeline {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        id: u64,
    },
    #[command(about = "Period KPIs, trends, distribution, and departments")]
    Stats {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "current_month")]
        period: String,
        #[arg(long, default_value = "director", help = "mg|director")]
        role: String,
        #[arg(long)]
        now: Option<String>,
    },
    #[command(about = "Build the statistics export model for selected months and departments")]
    Export {
        #[arg(long)]
        input: PathBuf,
        #[arg(long = "month", help = "YYYY-MM, repeatable")]
        months: Vec<String>,
        #[arg(long = "department", help = "Department name, repeatable")]
        departments: Vec<String>,
        #[arg(long)]
        no_details: bool,
        #[arg(long)]
        no_alerts: bool,
        #[arg(long, help = "Only list the month and department choices")]
        options: bool,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        now: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = dispatch(cli);
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Runs a parsed command line; split out so tests can drive it.
pub fn dispatch(cli: Cli) -> commands::CommandResult {
    let config_path = cli.config;
    match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(config_path) }
        }
        Command::Doctor { json } => commands::CommandResult {
            exit_code: 0,
            output: commands::doctor::run(config_path, json),
        },
        Command::Fetch { output } => commands::fetch::run(config_path, &output),
        Command::List { input, user_id, role, status, search, sort, asc } => {
            commands::list::run(ListArgs {
                input: &input,
                user_id,
                role: &role,
                status: &status,
                search: search.as_deref(),
                sort: &sort,
                ascending: asc,
            })
        }
        Command::Inbox { input, user_id, role, urgency, search, now } => {
            commands::inbox::run(InboxArgs {
                input: &input,
                user_id,
                role: &role,
                urgency: &urgency,
                search: search.as_deref(),
                now: now.as_deref(),
            })
        }
        Command::Timeline { input, id } => commands::timeline::run(&input, id),
        Command::Stats { input, period, role, now } => {
            commands::stats::run(config_path, &input, &period, &role, now.as_deref())
        }
        Command::Export {
            input,
            months,
            departments,
            no_details,
            no_alerts,
            options,
            output,
            now,
        } => commands::export::run(ExportArgs {
            config_path,
            input: &input,
            months: &months,
            departments: &departments,
            skip_details: no_details,
            skip_alerts: no_alerts,
            options_only: options,
            output: output.as_deref(),
            now: now.as_deref(),
        }),
    }
}
