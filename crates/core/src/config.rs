use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::ApplicationError;
use crate::stats::YearMonth;

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["procure.toml", "config/procure.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub attachments: AttachmentsConfig,
    pub statistics: StatisticsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Credentials the CLI signs in with when it talks to a live backend.
#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    pub identifier: Option<String>,
    pub password: Option<SecretString>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentsConfig {
    pub max_file_size_mb: u64,
    pub allowed_mime_types: Vec<String>,
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 10,
            allowed_mime_types: ["application/pdf", "image/jpeg", "image/png", "image/jpg"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatisticsConfig {
    /// First month shown in the monthly series and export pickers.
    pub project_start: YearMonth,
    pub overdue_alert_days: i64,
    pub trend_window_months: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub auth_identifier: Option<String>,
    pub auth_password: Option<String>,
    pub project_start: Option<YearMonth>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl From<ConfigError> for ApplicationError {
    fn from(error: ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig { base_url: "http://localhost:8000/api".to_string(), timeout_secs: 30 },
            auth: AuthConfig::default(),
            attachments: AttachmentsConfig::default(),
            statistics: StatisticsConfig {
                project_start: YearMonth { year: 2024, month: 8 },
                overdue_alert_days: 7,
                trend_window_months: 6,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(api) = patch.api {
            if let Some(base_url) = api.base_url {
                self.api.base_url = base_url;
            }
            if let Some(timeout_secs) = api.timeout_secs {
                self.api.timeout_secs = timeout_secs;
            }
        }

        if let Some(auth) = patch.auth {
            if let Some(identifier) = auth.identifier {
                self.auth.identifier = Some(identifier);
            }
            if let Some(password_value) = auth.password {
                self.auth.password = Some(secret_value(password_value));
            }
        }

        if let Some(attachments) = patch.attachments {
            if let Some(max_file_size_mb) = attachments.max_file_size_mb {
                self.attachments.max_file_size_mb = max_file_size_mb;
            }
            if let Some(allowed_mime_types) = attachments.allowed_mime_types {
                self.attachments.allowed_mime_types = allowed_mime_types;
            }
        }

        if let Some(statistics) = patch.statistics {
            if let Some(project_start) = statistics.project_start {
                self.statistics.project_start =
                    parse_month("statistics.project_start", &project_start)?;
            }
            if let Some(overdue_alert_days) = statistics.overdue_alert_days {
                self.statistics.overdue_alert_days = overdue_alert_days;
            }
            if let Some(trend_window_months) = statistics.trend_window_months {
                self.statistics.trend_window_months = trend_window_months;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PROCURE_API_BASE_URL") {
            self.api.base_url = value;
        }
        if let Some(value) = read_env("PROCURE_API_TIMEOUT_SECS") {
            self.api.timeout_secs = parse_u64("PROCURE_API_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("PROCURE_AUTH_IDENTIFIER") {
            self.auth.identifier = Some(value);
        }
        if let Some(value) = read_env("PROCURE_AUTH_PASSWORD") {
            self.auth.password = Some(secret_value(value));
        }

        if let Some(value) = read_env("PROCURE_ATTACHMENTS_MAX_FILE_SIZE_MB") {
            self.attachments.max_file_size_mb =
                parse_u64("PROCURE_ATTACHMENTS_MAX_FILE_SIZE_MB", &value)?;
        }
        if let Some(value) = read_env("PROCURE_ATTACHMENTS_ALLOWED_MIME_TYPES") {
            self.attachments.allowed_mime_types = value
                .split(',')
                .map(str::trim)
                .filter(|mime| !mime.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(value) = read_env("PROCURE_STATISTICS_PROJECT_START") {
            self.statistics.project_start = value.trim().parse().map_err(|_| {
                ConfigError::InvalidEnvOverride {
                    key: "PROCURE_STATISTICS_PROJECT_START".to_string(),
                    value: value.clone(),
                }
            })?;
        }
        if let Some(value) = read_env("PROCURE_STATISTICS_OVERDUE_ALERT_DAYS") {
            self.statistics.overdue_alert_days =
                parse_i64("PROCURE_STATISTICS_OVERDUE_ALERT_DAYS", &value)?;
        }
        if let Some(value) = read_env("PROCURE_STATISTICS_TREND_WINDOW_MONTHS") {
            self.statistics.trend_window_months =
                parse_usize("PROCURE_STATISTICS_TREND_WINDOW_MONTHS", &value)?;
        }

        let log_level =
            read_env("PROCURE_LOGGING_LEVEL").or_else(|| read_env("PROCURE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PROCURE_LOGGING_FORMAT").or_else(|| read_env("PROCURE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(api_base_url) = overrides.api_base_url {
            self.api.base_url = api_base_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(identifier) = overrides.auth_identifier {
            self.auth.identifier = Some(identifier);
        }
        if let Some(password) = overrides.auth_password {
            self.auth.password = Some(secret_value(password));
        }
        if let Some(project_start) = overrides.project_start {
            self.statistics.project_start = project_start;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_api(&self.api)?;
        validate_auth(&self.auth)?;
        validate_attachments(&self.attachments)?;
        validate_statistics(&self.statistics)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_api(api: &ApiConfig) -> Result<(), ConfigError> {
    let base_url = api.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "api.base_url must start with http:// or https://".to_string(),
        ));
    }

    if api.timeout_secs == 0 || api.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "api.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_auth(auth: &AuthConfig) -> Result<(), ConfigError> {
    let has_identifier =
        auth.identifier.as_deref().is_some_and(|identifier| !identifier.trim().is_empty());
    let has_password =
        auth.password.as_ref().is_some_and(|password| !password.expose_secret().is_empty());

    if has_identifier && !has_password {
        return Err(ConfigError::Validation(
            "auth.password is required when auth.identifier is set (use PROCURE_AUTH_PASSWORD to keep it out of the file)".to_string(),
        ));
    }
    if has_password && !has_identifier {
        return Err(ConfigError::Validation(
            "auth.identifier is required when auth.password is set".to_string(),
        ));
    }

    Ok(())
}

fn validate_attachments(attachments: &AttachmentsConfig) -> Result<(), ConfigError> {
    if attachments.max_file_size_mb == 0 {
        return Err(ConfigError::Validation(
            "attachments.max_file_size_mb must be greater than zero".to_string(),
        ));
    }

    if let Some(bad) = attachments.allowed_mime_types.iter().find(|mime| !mime.contains('/')) {
        return Err(ConfigError::Validation(format!(
            "attachments.allowed_mime_types contains `{bad}`, expected a type/subtype MIME string"
        )));
    }

    if attachments.allowed_mime_types.is_empty() {
        return Err(ConfigError::Validation(
            "attachments.allowed_mime_types must list at least one MIME type".to_string(),
        ));
    }

    Ok(())
}

fn validate_statistics(statistics: &StatisticsConfig) -> Result<(), ConfigError> {
    if statistics.overdue_alert_days < 1 {
        return Err(ConfigError::Validation(
            "statistics.overdue_alert_days must be at least 1".to_string(),
        ));
    }

    if statistics.trend_window_months == 0 || statistics.trend_window_months > 24 {
        return Err(ConfigError::Validation(
            "statistics.trend_window_months must be in range 1..=24".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_env(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_env(key, value))
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.trim().parse::<i64>().map_err(|_| invalid_env(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_env(key, value))
}

fn parse_month(key: &str, value: &str) -> Result<YearMonth, ConfigError> {
    value.trim().parse::<YearMonth>().map_err(|_| {
        ConfigError::Validation(format!("{key} must be formatted YYYY-MM, got `{value}`"))
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    api: Option<ApiPatch>,
    auth: Option<AuthPatch>,
    attachments: Option<AttachmentsPatch>,
    statistics: Option<StatisticsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthPatch {
    identifier: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AttachmentsPatch {
    max_file_size_mb: Option<u64>,
    allowed_mime_types: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct StatisticsPatch {
    project_start: Option<String>,
    overdue_alert_days: Option<i64>,
    trend_window_months: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::stats::YearMonth;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid() -> Result<(), String> {
        let config = AppConfig::default();
        config.validate().map_err(|err| err.to_string())?;
        ensure(config.attachments.max_file_size_mb == 10, "default upload cap is 10 MB")?;
        ensure(
            config.statistics.project_start == YearMonth { year: 2024, month: 8 },
            "series starts in August 2024",
        )?;
        ensure(config.statistics.overdue_alert_days == 7, "alerts after a week")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_PROCURE_PASSWORD", "from-env-secret");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("procure.toml");
            fs::write(
                &path,
                r#"
[auth]
identifier = "ops.bot"
password = "${TEST_PROCURE_PASSWORD}"

[statistics]
project_start = "2024-01"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.auth.password.as_ref().map(|secret| secret.expose_secret())
                    == Some("from-env-secret"),
                "password should be interpolated from environment",
            )?;
            ensure(
                config.statistics.project_start == YearMonth { year: 2024, month: 1 },
                "project start should come from the file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_PROCURE_PASSWORD"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PROCURE_LOG_LEVEL", "warn");
        env::set_var("PROCURE_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["PROCURE_LOG_LEVEL", "PROCURE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PROCURE_API_BASE_URL", "https://env.example.org/api");
        env::set_var("PROCURE_ATTACHMENTS_MAX_FILE_SIZE_MB", "25");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("procure.toml");
            fs::write(
                &path,
                r#"
[api]
base_url = "https://file.example.org/api"
timeout_secs = 12

[attachments]
max_file_size_mb = 5

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.api.base_url == "https://env.example.org/api",
                "env base url should win over the file",
            )?;
            ensure(config.api.timeout_secs == 12, "file timeout should win over the default")?;
            ensure(config.attachments.max_file_size_mb == 25, "env size cap should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            Ok(())
        })();

        clear_vars(&["PROCURE_API_BASE_URL", "PROCURE_ATTACHMENTS_MAX_FILE_SIZE_MB"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PROCURE_AUTH_IDENTIFIER", "ops.bot");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("auth.password")
            );
            ensure(has_message, "validation failure should mention auth.password")
        })();

        clear_vars(&["PROCURE_AUTH_IDENTIFIER"]);
        result
    }

    #[test]
    fn malformed_project_start_names_the_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("procure.toml");
        fs::write(&path, "[statistics]\nproject_start = \"août 2024\"\n")
            .map_err(|err| err.to_string())?;

        match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }) {
            Err(ConfigError::Validation(message)) => ensure(
                message.contains("statistics.project_start"),
                "error should name statistics.project_start",
            ),
            _ => Err("expected a validation error".to_string()),
        }
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("PROCURE_AUTH_IDENTIFIER", "ops.bot");
        env::set_var("PROCURE_AUTH_PASSWORD", "hunter2-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("hunter2-secret-value"),
                "debug output should not contain the password",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["PROCURE_AUTH_IDENTIFIER", "PROCURE_AUTH_PASSWORD"]);
        result
    }
}
