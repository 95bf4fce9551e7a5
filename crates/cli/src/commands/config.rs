use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use procure_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct ConfigField {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

impl ConfigField {
    fn new(key_path: &'static str, env_keys: &'static [&'static str], value: String) -> Self {
        Self { key_path, env_keys, value }
    }
}

pub fn run(config_path: Option<PathBuf>) -> String {
    let config = match AppConfig::load(LoadOptions {
        config_path: config_path.clone(),
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<ConfigField> {
    let password = match &config.auth.password {
        Some(password) => redact_secret(password.expose_secret()),
        None => "<unset>".to_string(),
    };

    vec![
        ConfigField::new("api.base_url", &["PROCURE_API_BASE_URL"], config.api.base_url.clone()),
        ConfigField::new(
            "api.timeout_secs",
            &["PROCURE_API_TIMEOUT_SECS"],
            config.api.timeout_secs.to_string(),
        ),
        ConfigField::new(
            "auth.identifier",
            &["PROCURE_AUTH_IDENTIFIER"],
            config.auth.identifier.clone().unwrap_or_else(|| "<unset>".to_string()),
        ),
        ConfigField::new("auth.password", &["PROCURE_AUTH_PASSWORD"], password),
        ConfigField::new(
            "attachments.max_file_size_mb",
            &["PROCURE_ATTACHMENTS_MAX_FILE_SIZE_MB"],
            config.attachments.max_file_size_mb.to_string(),
        ),
        ConfigField::new(
            "attachments.allowed_mime_types",
            &["PROCURE_ATTACHMENTS_ALLOWED_MIME_TYPES"],
            config.attachments.allowed_mime_types.join(","),
        ),
        ConfigField::new(
            "statistics.project_start",
            &["PROCURE_STATISTICS_PROJECT_START"],
            config.statistics.project_start.to_string(),
        ),
        ConfigField::new(
            "statistics.overdue_alert_days",
            &["PROCURE_STATISTICS_OVERDUE_ALERT_DAYS"],
            config.statistics.overdue_alert_days.to_string(),
        ),
        ConfigField::new(
            "statistics.trend_window_months",
            &["PROCURE_STATISTICS_TREND_WINDOW_MONTHS"],
            config.statistics.trend_window_months.to_string(),
        ),
        ConfigField::new(
            "logging.level",
            &["PROCURE_LOGGING_LEVEL", "PROCURE_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        ConfigField::new(
            "logging.format",
            &["PROCURE_LOGGING_FORMAT", "PROCURE_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Secrets only ever render as a placeholder.
fn redact_secret(secret: &str) -> String {
    if secret.trim().is_empty() {
        return "<empty>".to_string();
    }
    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, redact_secret};

    #[test]
    fn nested_keys_are_found_in_file_doc() {
        let doc: Value = "[statistics]\nproject_start = \"2024-08\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "statistics.project_start"));
        assert!(!contains_path(&doc, "statistics.overdue_alert_days"));
        assert!(!contains_path(&doc, "api.base_url"));
    }

    #[test]
    fn secrets_never_render() {
        assert_eq!(redact_secret("hunter22"), "<redacted>");
        assert_eq!(redact_secret("  "), "<empty>");
    }
}
