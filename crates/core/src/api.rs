//! Backend collaborators the core drives.
//!
//! Transport lives in `procure-client`; everything here is the contract
//! shape plus the payload types that cross it.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::domain::attachment::{AttachmentId, FileCandidate, PersistedAttachment};
use crate::domain::request::{Request, RequestId, Urgency};
use crate::domain::user::{User, UserId, UserPatch, UserRole};
use crate::errors::ApiError;
use crate::forms::{CreateRequestForm, Credentials, PasswordChangeForm};
use crate::stats::RequestStats;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: String,
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn current_user(&self) -> Result<User, ApiError>;
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError>;
    async fn logout(&self) -> Result<(), ApiError>;
    /// Renews the session cookie after a 401.
    async fn refresh_session(&self) -> Result<(), ApiError>;
    async fn update_profile(&self, user_id: UserId, patch: &UserPatch) -> Result<User, ApiError>;
    /// Returns the server's confirmation message.
    async fn change_password(&self, change: &PasswordChangeForm) -> Result<String, ApiError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetRequested {
    /// Seconds the emailed code stays valid.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[async_trait]
pub trait PasswordResetApi: Send + Sync {
    async fn request_reset(&self, email: &str) -> Result<ResetRequested, ApiError>;
    async fn verify_code(&self, email: &str, code: &str) -> Result<SecretString, ApiError>;
    async fn confirm_reset(
        &self,
        reset_token: &SecretString,
        new_password: &SecretString,
        confirm_password: &SecretString,
    ) -> Result<(), ApiError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequestPayload {
    pub item_description: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<Decimal>,
    pub urgency: Urgency,
    pub justification: String,
    /// Set when MG creates the request, so the backend skips the MG stage.
    pub auto_validate_mg: bool,
}

impl CreateRequestPayload {
    /// Builds the payload from an already validated form.
    pub fn from_form(form: &CreateRequestForm, creator: &UserRole) -> Self {
        let quantity = form.quantity.and_then(|quantity| u32::try_from(quantity).ok()).unwrap_or(0);
        Self {
            item_description: form.item_description.trim().to_owned(),
            quantity,
            estimated_cost: form.estimated_cost,
            urgency: form.urgency,
            justification: form.justification.trim().to_owned(),
            auto_validate_mg: *creator == UserRole::Mg,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Approve,
    Reject,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Accounting's budget verdict; ignored for other stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_cost: Option<Decimal>,
}

impl Decision {
    pub fn approve() -> Self {
        Self {
            action: DecisionAction::Approve,
            comment: None,
            budget_available: None,
            final_cost: None,
        }
    }

    pub fn reject(comment: impl Into<String>) -> Self {
        Self {
            action: DecisionAction::Reject,
            comment: Some(comment.into()),
            budget_available: None,
            final_cost: None,
        }
    }
}

#[async_trait]
pub trait RequestsApi: Send + Sync {
    async fn list(&self, filters: &ListFilters) -> Result<Page<Request>, ApiError>;
    async fn create(&self, payload: &CreateRequestPayload) -> Result<Request, ApiError>;
    async fn validate(&self, id: RequestId, decision: &Decision) -> Result<Request, ApiError>;
}

#[async_trait]
pub trait AttachmentsApi: Send + Sync {
    async fn list(&self, request_id: RequestId) -> Result<Vec<PersistedAttachment>, ApiError>;
    async fn upload(
        &self,
        request_id: RequestId,
        file: &FileCandidate,
        description: &str,
    ) -> Result<PersistedAttachment, ApiError>;
    async fn delete(&self, attachment_id: AttachmentId) -> Result<(), ApiError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardPayload {
    #[serde(default)]
    pub counts: RequestStats,
    #[serde(default)]
    pub recent_requests: Vec<Request>,
    #[serde(default)]
    pub all_requests: Vec<Request>,
}

#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn get(&self) -> Result<DashboardPayload, ApiError>;
}


#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{CreateRequestPayload, Decision, ListFilters};
    use crate::domain::request::Urgency;
    use crate::domain::user::UserRole;
    use crate::forms::CreateRequestForm;

    #[test]
    fn payload_flags_mg_auto_validation() {
        let form = CreateRequestForm {
            item_description: "  Vidéoprojecteur salle B ".to_owned(),
            quantity: Some(1),
            estimated_cost: Some(Decimal::new(400_000, 0)),
            urgency: Urgency::Low,
            justification: "Remplacement du projecteur en panne".to_owned(),
        };

        let mg = CreateRequestPayload::from_form(&form, &UserRole::Mg);
        assert!(mg.auto_validate_mg);
        assert_eq!(mg.item_description, "Vidéoprojecteur salle B");

        let employee = CreateRequestPayload::from_form(&form, &UserRole::Employee);
        assert!(!employee.auto_validate_mg);
    }

    #[test]
    fn empty_filters_serialize_to_empty_object() {
        let encoded = serde_json::to_value(ListFilters::default()).expect("serialize");
        assert_eq!(encoded, serde_json::json!({}));
    }

    #[test]
    fn rejection_carries_comment() {
        let encoded = serde_json::to_value(Decision::reject("Budget épuisé")).expect("serialize");
        assert_eq!(encoded, serde_json::json!({"action": "reject", "comment": "Budget épuisé"}));
    }
}
