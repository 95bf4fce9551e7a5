use std::path::PathBuf;

use procure_client::BackendClient;
use procure_core::api::AuthApi;
use procure_core::config::{AppConfig, LoadOptions};
use procure_core::forms::Credentials;
use procure_core::ApiError;
use secrecy::ExposeSecret;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(config_path: Option<PathBuf>, json_output: bool) -> String {
    let report = build_report(config_path);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(config_path: Option<PathBuf>) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions { config_path, ..LoadOptions::default() }) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.extend(check_backend(&config));
        }
        Err(error) => {
            let details = error.to_string();
            checks.push(DoctorCheck::new("config_validation", CheckStatus::Fail, details));
            for name in ["backend_reachability", "credentials"] {
                checks.push(DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    // Skipped checks do not fail the report.
    let all_pass = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_backend(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![DoctorCheck::new(
                "backend_reachability",
                CheckStatus::Fail,
                format!("failed to initialize async runtime: {error}"),
            )];
        }
    };
    let client = match BackendClient::new(&config.api) {
        Ok(client) => client,
        Err(error) => {
            let details = error.to_string();
            return vec![DoctorCheck::new("backend_reachability", CheckStatus::Fail, details)];
        }
    };

    runtime.block_on(async {
        // Any HTTP answer, 401 included, proves the backend is up.
        let reachability = match client.current_user().await {
            Ok(_) | Err(ApiError::Unauthorized) => DoctorCheck::new(
                "backend_reachability",
                CheckStatus::Pass,
                format!("reached `{}`", client.base_url()),
            ),
            Err(ApiError::Transport(message)) => {
                DoctorCheck::new("backend_reachability", CheckStatus::Fail, message)
            }
            Err(other) => DoctorCheck::new(
                "backend_reachability",
                CheckStatus::Pass,
                format!("reached `{}` ({other})", client.base_url()),
            ),
        };
        if reachability.status == CheckStatus::Fail {
            let skipped =
                DoctorCheck::new("credentials", CheckStatus::Skipped, "backend unreachable");
            return vec![reachability, skipped];
        }

        let credentials = match (&config.auth.identifier, &config.auth.password) {
            (Some(identifier), Some(password)) => {
                let credentials =
                    Credentials::new(identifier.clone(), password.expose_secret().to_string());
                match client.login(&credentials).await {
                    Ok(response) if response.success => {
                        let _ = client.logout().await;
                        DoctorCheck::new(
                            "credentials",
                            CheckStatus::Pass,
                            format!("signed in as `{identifier}`"),
                        )
                    }
                    Ok(response) => {
                        DoctorCheck::new("credentials", CheckStatus::Fail, response.message)
                    }
                    Err(error) => {
                        DoctorCheck::new("credentials", CheckStatus::Fail, error.to_string())
                    }
                }
            }
            _ => DoctorCheck::new(
                "credentials",
                CheckStatus::Skipped,
                "auth.identifier and auth.password are not configured",
            ),
        };
        vec![reachability, credentials]
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
