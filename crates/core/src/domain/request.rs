use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::user::{UserId, UserRole};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a purchase request.
///
/// `mg_approved` and `mg_validated` are both accepted on the wire and collapse
/// into `MgApproved` when a payload is decoded, so no policy ever has to check
/// for both spellings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    Pending,
    MgApproved,
    AccountingReviewed,
    DirectorApproved,
    Rejected,
    Unrecognized(String),
}

impl RequestStatus {
    pub const KNOWN: [RequestStatus; 5] = [
        RequestStatus::Pending,
        RequestStatus::MgApproved,
        RequestStatus::AccountingReviewed,
        RequestStatus::DirectorApproved,
        RequestStatus::Rejected,
    ];

    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "mg_approved" | "mg_validated" => Self::MgApproved,
            "accounting_reviewed" => Self::AccountingReviewed,
            "director_approved" => Self::DirectorApproved,
            "rejected" => Self::Rejected,
            _ => Self::Unrecognized(code.trim().to_owned()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::MgApproved => "mg_approved",
            Self::AccountingReviewed => "accounting_reviewed",
            Self::DirectorApproved => "director_approved",
            Self::Rejected => "rejected",
            Self::Unrecognized(code) => code,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::DirectorApproved | Self::Rejected)
    }

    /// Past the MG stage but not yet decided by the director.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::MgApproved | Self::AccountingReviewed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for RequestStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for RequestStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_code(&raw))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub fn code(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn is_urgent(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

/// One of the three decision points after creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStage {
    Mg,
    Accounting,
    Director,
}

/// Role labels the backend writes into `Step::user_role`.
///
/// Steps carry a free-text label rather than a structured stage, so the
/// stage has to be recovered by matching both the French and English
/// spellings. Any new spelling on the backend silently drops the actor from
/// the timeline until it is added here.
const STAGE_ROLE_LABELS: [(ApprovalStage, &[&str]); 3] = [
    (ApprovalStage::Mg, &["Moyens Généraux", "MG"]),
    (ApprovalStage::Accounting, &["Comptabilité", "Accounting"]),
    (ApprovalStage::Director, &["Direction", "Director"]),
];

impl ApprovalStage {
    pub const ORDERED: [ApprovalStage; 3] =
        [ApprovalStage::Mg, ApprovalStage::Accounting, ApprovalStage::Director];

    pub fn role(self) -> UserRole {
        match self {
            Self::Mg => UserRole::Mg,
            Self::Accounting => UserRole::Accounting,
            Self::Director => UserRole::Director,
        }
    }

    pub fn for_role(role: &UserRole) -> Option<Self> {
        match role {
            UserRole::Mg => Some(Self::Mg),
            UserRole::Accounting => Some(Self::Accounting),
            UserRole::Director => Some(Self::Director),
            UserRole::Employee | UserRole::Unrecognized(_) => None,
        }
    }

    pub fn from_role_label(label: &str) -> Option<Self> {
        let label = label.trim();
        STAGE_ROLE_LABELS
            .iter()
            .find(|(_, variants)| variants.iter().any(|variant| *variant == label))
            .map(|(stage, _)| *stage)
    }

    pub fn role_label(self) -> &'static str {
        match self {
            Self::Mg => "Moyens Généraux",
            Self::Accounting => "Comptabilité",
            Self::Director => "Direction",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub user_role: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub comment: Option<String>,
    /// Structured stage tag, when the backend supplies one.
    #[serde(default)]
    pub stage: Option<ApprovalStage>,
}

impl Step {
    pub fn stage(&self) -> Option<ApprovalStage> {
        self.stage.or_else(|| ApprovalStage::from_role_label(&self.user_role))
    }
}

/// Requester details the list endpoints embed next to a request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOwner {
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub status: RequestStatus,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub item_description: String,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub estimated_cost: Option<Decimal>,
    #[serde(default)]
    pub final_cost: Option<Decimal>,
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub created_by: Option<UserId>,
    #[serde(default)]
    pub user: Option<RequestOwner>,
    #[serde(default)]
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rejected_by: Option<UserId>,
    #[serde(default)]
    pub rejected_by_role: Option<UserRole>,
    #[serde(default)]
    pub accounting_validated_by: Option<UserId>,
    #[serde(default)]
    pub approved_by: Option<UserId>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub budget_available: Option<bool>,
}

impl Request {
    /// Amount shown to users: the final cost once known, else the estimate.
    pub fn display_cost(&self) -> Decimal {
        self.final_cost.or(self.estimated_cost).unwrap_or(Decimal::ZERO)
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id || self.created_by == Some(user_id)
    }

    pub fn rejected_at(&self, stage: ApprovalStage) -> bool {
        self.status == RequestStatus::Rejected
            && self.rejected_by_role.as_ref() == Some(&stage.role())
    }

    pub fn rejected_by_at(&self, stage: ApprovalStage, user_id: UserId) -> bool {
        self.rejected_at(stage) && self.rejected_by == Some(user_id)
    }

    /// First step recorded for a stage, if any.
    pub fn step_for(&self, stage: ApprovalStage) -> Option<&Step> {
        self.steps.iter().find(|step| step.stage() == Some(stage))
    }

    pub fn age_in_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }
}
