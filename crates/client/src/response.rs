//! Turning HTTP responses into `ApiError`s.

use procure_core::errors::ApiError;
use procure_core::forms::FieldErrors;
use serde_json::Value;

/// Best human-readable message in an error body: a bare string, then the
/// `error`, `detail` and `message` keys, then the first `non_field_errors`
/// entry. Empty when none is present.
pub fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().chars().take(200).collect();
    };
    match &value {
        Value::String(message) => message.clone(),
        Value::Object(object) => ["error", "detail", "message"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))
            .map(str::to_owned)
            .or_else(|| {
                object
                    .get("non_field_errors")
                    .and_then(Value::as_array)
                    .and_then(|items| items.iter().find_map(Value::as_str))
                    .map(str::to_owned)
            })
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Maps a non-success status and its body.
pub fn status_error(status: u16, body: &str) -> ApiError {
    if status == 401 {
        return ApiError::Unauthorized;
    }
    if status == 400 {
        let fields = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| FieldErrors::from_server_body(&value));
        if let Some(fields) = fields {
            return ApiError::Validation(fields);
        }
    }
    ApiError::Server { status, message: error_message(body) }
}

/// Login answers 400 and 401 with a message meant for the login form.
pub fn login_error(status: u16, body: &str) -> ApiError {
    match status {
        400 | 401 => ApiError::InvalidCredentials(error_message(body)),
        _ => status_error(status, body),
    }
}

pub fn transport_error(error: reqwest::Error) -> ApiError {
    if error.is_decode() {
        ApiError::Decode(error.to_string())
    } else {
        ApiError::Transport(error.to_string())
    }
}
