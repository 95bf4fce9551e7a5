use std::path::{Path, PathBuf};

use procure_client::BackendClient;
use procure_core::api::DashboardApi;
use procure_core::config::AppConfig;
use procure_core::forms::Credentials;
use procure_core::AuthProvider;
use secrecy::ExposeSecret;

use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "fetch";

/// Signs in with the configured account and saves the dashboard payload,
/// which the offline commands accept as input.
pub fn run(config_path: Option<PathBuf>, output: &Path) -> CommandResult {
    let config = match load_config(COMMAND, config_path) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                10,
            );
        }
    };

    match runtime.block_on(fetch(&config, output)) {
        Ok(count) => CommandResult::success(
            COMMAND,
            format!("{count} request(s) saved to {}", output.display()),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(COMMAND, error_class, message, exit_code)
        }
    }
}

async fn fetch(config: &AppConfig, output: &Path) -> Result<usize, (&'static str, String, u8)> {
    let (Some(identifier), Some(password)) = (&config.auth.identifier, &config.auth.password)
    else {
        return Err((
            "config_validation",
            "set auth.identifier and auth.password (or PROCURE_AUTH_*) to fetch".to_string(),
            2,
        ));
    };
    let client =
        BackendClient::new(&config.api).map_err(|error| ("backend", error.to_string(), 7u8))?;
    let session = AuthProvider::new(client);

    let credentials = Credentials::new(identifier.clone(), password.expose_secret().to_string());
    session
        .login(&credentials)
        .await
        .map_err(|error| ("authentication", error.notice().message, 7u8))?;

    let fetched = DashboardApi::get(session.api()).await;
    session.logout().await;
    let payload = fetched.map_err(|error| ("backend", error.to_string(), 7u8))?;

    let bytes = serde_json::to_vec_pretty(&payload)
        .map_err(|error| ("serialization", error.to_string(), 9u8))?;
    tokio::fs::write(output, bytes).await.map_err(|error| {
        ("output_write", format!("could not write `{}`: {error}", output.display()), 8u8)
    })?;

    tracing::info!(
        event_name = "cli.fetch.saved",
        path = %output.display(),
        requests = payload.all_requests.len(),
        "dashboard payload saved"
    );
    Ok(payload.all_requests.len())
}
