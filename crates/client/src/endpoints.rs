use async_trait::async_trait;
use procure_core::api::{
    AttachmentsApi, AuthApi, CreateRequestPayload, DashboardApi, DashboardPayload, Decision,
    ListFilters, LoginResponse, Page, PasswordResetApi, RequestsApi, ResetRequested,
};
use procure_core::domain::attachment::{AttachmentId, FileCandidate, PersistedAttachment};
use procure_core::domain::request::{Request, RequestId};
use procure_core::domain::user::{User, UserId, UserPatch};
use procure_core::errors::ApiError;
use procure_core::forms::{Credentials, PasswordChangeForm};
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::response::{login_error, transport_error};
use crate::BackendClient;

/// Backend paths, relative to `api.base_url`.
pub mod routes {
    use procure_core::domain::attachment::AttachmentId;
    use procure_core::domain::request::RequestId;
    use procure_core::domain::user::UserId;

    pub const CURRENT_USER: &str = "auth/me/";
    pub const LOGIN: &str = "auth/login/";
    pub const LOGOUT: &str = "auth/logout/";
    pub const REFRESH: &str = "auth/refresh/";
    pub const CHANGE_PASSWORD: &str = "auth/change-password/";
    pub const RESET_REQUEST: &str = "auth/password-reset/request/";
    pub const RESET_VERIFY: &str = "auth/password-reset/verify/";
    pub const RESET_CONFIRM: &str = "auth/password-reset/confirm/";
    pub const REQUESTS: &str = "requests/";
    pub const ATTACHMENTS: &str = "attachments/";
    pub const DASHBOARD: &str = "dashboard/";

    pub fn user(id: UserId) -> String {
        format!("users/{id}/")
    }

    pub fn validate(id: RequestId) -> String {
        format!("requests/{id}/validate/")
    }

    pub fn attachment(id: AttachmentId) -> String {
        format!("attachments/{id}/")
    }
}

/// List endpoints answer either a bare array or a paginated envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Paged(Page<T>),
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    fn into_page(self) -> Page<T> {
        match self {
            Self::Paged(page) => page,
            Self::Plain(results) => {
                let count = results.len() as u64;
                Page { results, count }
            }
        }
    }
}

/// Login answer as sent; `success` is only inferred when the field is absent.
#[derive(Deserialize)]
struct LoginBody {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    message: String,
}

impl From<LoginBody> for LoginResponse {
    fn from(body: LoginBody) -> Self {
        let inferred = body.user.is_some() && body.message.is_empty();
        Self { success: body.success.unwrap_or(inferred), user: body.user, message: body.message }
    }
}

#[derive(Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct ResetToken {
    reset_token: String,
}

#[async_trait]
impl AuthApi for BackendClient {
    async fn current_user(&self) -> Result<User, ApiError> {
        self.json(self.get(routes::CURRENT_USER)).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let body = json!({
            "username": credentials.identifier.trim(),
            "password": credentials.password.expose_secret(),
        });
        let response: LoginBody =
            self.json_with(self.post(routes::LOGIN).json(&body), login_error).await?;
        Ok(response.into())
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.empty(self.post(routes::LOGOUT)).await
    }

    async fn refresh_session(&self) -> Result<(), ApiError> {
        self.empty(self.post(routes::REFRESH)).await
    }

    async fn update_profile(&self, user_id: UserId, patch: &UserPatch) -> Result<User, ApiError> {
        self.json(self.patch(&routes::user(user_id)).json(patch)).await
    }

    async fn change_password(&self, change: &PasswordChangeForm) -> Result<String, ApiError> {
        let body = json!({
            "old_password": change.old_password.expose_secret(),
            "new_password": change.new_password.expose_secret(),
            "confirm_password": change.confirm_password.expose_secret(),
        });
        let answer: MessageBody = self.json(self.post(routes::CHANGE_PASSWORD).json(&body)).await?;
        Ok(answer.message)
    }
}

#[async_trait]
impl PasswordResetApi for BackendClient {
    async fn request_reset(&self, email: &str) -> Result<ResetRequested, ApiError> {
        self.json(self.post(routes::RESET_REQUEST).json(&json!({ "email": email }))).await
    }

    async fn verify_code(&self, email: &str, code: &str) -> Result<SecretString, ApiError> {
        let body = json!({ "email": email, "code": code });
        let token: ResetToken = self.json(self.post(routes::RESET_VERIFY).json(&body)).await?;
        Ok(SecretString::from(token.reset_token))
    }

    async fn confirm_reset(
        &self,
        reset_token: &SecretString,
        new_password: &SecretString,
        confirm_password: &SecretString,
    ) -> Result<(), ApiError> {
        let body = json!({
            "reset_token": reset_token.expose_secret(),
            "new_password": new_password.expose_secret(),
            "confirm_password": confirm_password.expose_secret(),
        });
        self.empty(self.post(routes::RESET_CONFIRM).json(&body)).await
    }
}

#[async_trait]
impl RequestsApi for BackendClient {
    async fn list(&self, filters: &ListFilters) -> Result<Page<Request>, ApiError> {
        let listing: Listing<Request> = self.json(self.get(routes::REQUESTS).query(filters)).await?;
        Ok(listing.into_page())
    }

    async fn create(&self, payload: &CreateRequestPayload) -> Result<Request, ApiError> {
        let request: Request = self.json(self.post(routes::REQUESTS).json(payload)).await?;
        info!(event_name = "client.request.created", request_id = request.id.0, "request stored");
        Ok(request)
    }

    async fn validate(&self, id: RequestId, decision: &Decision) -> Result<Request, ApiError> {
        self.json(self.post(&routes::validate(id)).json(decision)).await
    }
}

#[async_trait]
impl AttachmentsApi for BackendClient {
    async fn list(&self, request_id: RequestId) -> Result<Vec<PersistedAttachment>, ApiError> {
        let listing: Listing<PersistedAttachment> = self
            .json(self.get(routes::ATTACHMENTS).query(&[("request", request_id.0)]))
            .await?;
        Ok(listing.into_page().results)
    }

    async fn upload(
        &self,
        request_id: RequestId,
        file: &FileCandidate,
        description: &str,
    ) -> Result<PersistedAttachment, ApiError> {
        let part = Part::bytes(file.content.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(transport_error)?;
        let description = if description.trim().is_empty() { &file.name } else { description };
        let form = Form::new()
            .text("request", request_id.to_string())
            .text("file_type", "other")
            .text("description", description.to_string())
            .part("file", part);
        self.json(self.post(routes::ATTACHMENTS).multipart(form)).await
    }

    async fn delete(&self, attachment_id: AttachmentId) -> Result<(), ApiError> {
        self.empty(self.delete(&routes::attachment(attachment_id))).await
    }
}

#[async_trait]
impl DashboardApi for BackendClient {
    async fn get(&self) -> Result<DashboardPayload, ApiError> {
        self.json(BackendClient::get(self, routes::DASHBOARD)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use procure_core::api::{
        AttachmentsApi, AuthApi, CreateRequestPayload, ListFilters, RequestsApi,
    };
    use procure_core::config::ApiConfig;
    use procure_core::domain::attachment::FileCandidate;
    use procure_core::domain::request::{RequestId, RequestStatus, Urgency};
    use procure_core::errors::ApiError;
    use procure_core::forms::Credentials;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::BackendClient;

    struct Canned {
        status: u16,
        body: String,
        headers: &'static str,
    }

    fn canned(status: u16, body: impl Into<String>) -> Canned {
        Canned { status, body: body.into(), headers: "" }
    }

    /// Serves one scripted answer per connection and records every raw
    /// request, lowercased.
    async fn stub(answers: Vec<Canned>) -> (BackendClient, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);

        tokio::spawn(async move {
            for answer in answers {
                let Ok((mut socket, _)) = listener.accept().await else { return };
                let raw = read_request(&mut socket).await;
                recorded.lock().unwrap().push(raw.to_lowercase());
                let response = format!(
                    "HTTP/1.1 {} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n{}\r\n{}",
                    answer.status,
                    answer.body.len(),
                    answer.headers,
                    answer.body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        let config = ApiConfig { base_url: format!("http://{address}/api/"), timeout_secs: 5 };
        (BackendClient::new(&config).unwrap(), seen)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0_u8; 4096];
        loop {
            let read = socket.read(&mut chunk).await.unwrap_or(0);
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
            let text = String::from_utf8_lossy(&buffer).to_string();
            let Some(head_end) = text.find("\r\n\r\n") else { continue };
            let head = text[..head_end].to_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok());
            match body_len {
                Some(len) if buffer.len() >= head_end + 4 + len => break,
                Some(_) => continue,
                None if head.contains("transfer-encoding: chunked") => {
                    if text.ends_with("0\r\n\r\n") {
                        break;
                    }
                }
                None => break,
            }
        }
        String::from_utf8_lossy(&buffer).to_string()
    }

    const USER: &str = r#"{"id": 4, "username": "awa", "first_name": "Awa", "role": "mg"}"#;

    const REQUEST: &str = r#"{
        "id": 31, "status": "mg_validated", "urgency": "high",
        "item_description": "Classeurs", "user_id": 4,
        "created_at": "2024-11-04T10:00:00Z"
    }"#;

    #[tokio::test]
    async fn session_cookie_is_replayed_after_login() {
        let login = Canned {
            status: 200,
            body: r#"{"success": true, "user": {"id": 4, "username": "awa", "role": "mg"}}"#
                .to_owned(),
            headers: "set-cookie: sessionid=abc123; Path=/\r\n",
        };
        let (client, seen) = stub(vec![login, canned(200, USER)]).await;

        let response = client.login(&Credentials::new("awa", "secret123")).await.unwrap();
        assert!(response.success);
        let user = client.current_user().await.unwrap();
        assert_eq!(user.first_name, "Awa");

        let seen = seen.lock().unwrap();
        assert!(seen[0].starts_with("post /api/auth/login/"));
        assert!(seen[0].contains(r#""username":"awa""#));
        assert!(seen[1].starts_with("get /api/auth/me/"));
        assert!(seen[1].contains("sessionid=abc123"));
    }

    #[tokio::test]
    async fn explicit_login_failure_is_kept_even_with_a_user() {
        let user = r#"{"id": 4, "username": "awa", "role": "mg"}"#;
        let refused = format!(r#"{{"success": false, "user": {user}}}"#);
        let inferred = format!(r#"{{"user": {user}}}"#);
        let (client, _) = stub(vec![canned(200, refused), canned(200, inferred)]).await;

        let response = client.login(&Credentials::new("awa", "secret123")).await.unwrap();
        assert!(!response.success);
        assert!(response.user.is_some());

        let response = client.login(&Credentials::new("awa", "secret123")).await.unwrap();
        assert!(response.success);
    }

    #[tokio::test]
    async fn rejected_login_carries_server_message() {
        let (client, _) = stub(vec![canned(401, r#"{"error": "Identifiants invalides"}"#)]).await;
        let error = client.login(&Credentials::new("awa", "wrong-pass")).await.unwrap_err();
        assert_eq!(error, ApiError::InvalidCredentials("Identifiants invalides".to_owned()));
    }

    #[tokio::test]
    async fn expired_session_is_unauthorized() {
        let (client, _) = stub(vec![canned(401, r#"{"detail": "expired"}"#)]).await;
        assert_eq!(client.current_user().await.unwrap_err(), ApiError::Unauthorized);
    }

    #[tokio::test]
    async fn list_accepts_plain_and_paged_bodies() {
        let plain = format!("[{REQUEST}]");
        let paged = format!(r#"{{"results": [{REQUEST}], "count": 57}}"#);
        let (client, seen) = stub(vec![canned(200, plain), canned(200, paged)]).await;

        let filters = ListFilters { status: Some("pending".to_owned()), ..ListFilters::default() };
        let first = RequestsApi::list(&client, &filters).await.unwrap();
        assert_eq!(first.count, 1);
        assert_eq!(first.results[0].status, RequestStatus::MgApproved);

        let second = RequestsApi::list(&client, &ListFilters::default()).await.unwrap();
        assert_eq!(second.count, 57);
        assert!(seen.lock().unwrap()[0].starts_with("get /api/requests/?status=pending"));
    }

    #[tokio::test]
    async fn field_errors_on_create_become_validation() {
        let (client, _) = stub(vec![canned(400, r#"{"quantity": ["Doit être positive"]}"#)]).await;
        let payload = CreateRequestPayload {
            item_description: "Classeurs A4".to_owned(),
            quantity: 0,
            estimated_cost: None,
            urgency: Urgency::Low,
            justification: "Archivage des dossiers fournisseurs".to_owned(),
            auto_validate_mg: false,
        };
        match client.create(&payload).await.unwrap_err() {
            ApiError::Validation(fields) => {
                assert_eq!(fields.get("quantity"), Some("Doit être positive"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_is_multipart_with_description() {
        let stored = r#"{"id": 9, "description": "Devis", "uploaded_by": 4, "created_at": "2024-11-04T10:05:00Z"}"#;
        let (client, seen) = stub(vec![canned(201, stored)]).await;
        let file = FileCandidate::new("devis.pdf", "application/pdf", b"%PDF-1.4".to_vec());

        let attachment = client.upload(RequestId(31), &file, "Devis").await.unwrap();
        assert_eq!(attachment.id.0, 9);

        let seen = seen.lock().unwrap();
        assert!(seen[0].contains("multipart/form-data"));
        assert!(seen[0].contains(r#"filename="devis.pdf""#));
        assert!(seen[0].contains("name=\"description\""));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);
        let config = ApiConfig { base_url: format!("http://{address}/api"), timeout_secs: 2 };
        let client = BackendClient::new(&config).unwrap();

        assert!(matches!(client.current_user().await, Err(ApiError::Transport(_))));
    }

    #[test]
    fn base_url_is_normalized() {
        let config = ApiConfig {
            base_url: " https://achats.example.org/api/ ".to_owned(),
            timeout_secs: 30,
        };
        let client = BackendClient::new(&config).unwrap();
        assert_eq!(client.url("/requests/"), "https://achats.example.org/api/requests/");
    }
}
