//! Display registry for request statuses and urgencies.
//!
//! Every screen that renders a status badge goes through [`lookup`] or
//! [`badge`], so the same status always gets the same label and styling.

use serde::Serialize;

use crate::domain::request::{RequestStatus, Urgency};

pub const UNKNOWN_STATUS_LABEL: &str = "Statut inconnu";
pub const UNKNOWN_URGENCY_LABEL: &str = "Non défini";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Waiting,
    InProgress,
    Approved,
    Rejected,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub code: String,
    pub label: String,
    pub category: StatusCategory,
    pub dot_style: &'static str,
    pub sort_key: u8,
}

/// Badge for a raw status code as received from the backend. Never fails.
pub fn lookup(raw: &str) -> StatusBadge {
    badge(&RequestStatus::from_code(raw))
}

pub fn badge(status: &RequestStatus) -> StatusBadge {
    let (label, category, dot_style, sort_key) = match status {
        RequestStatus::Pending => ("En attente", StatusCategory::Waiting, "amber", 0),
        RequestStatus::MgApproved => ("Validée MG", StatusCategory::InProgress, "blue", 1),
        RequestStatus::AccountingReviewed => {
            ("Revue Comptabilité", StatusCategory::InProgress, "purple", 2)
        }
        RequestStatus::DirectorApproved => ("Approuvée", StatusCategory::Approved, "emerald", 3),
        RequestStatus::Rejected => ("Refusée", StatusCategory::Rejected, "red", 4),
        RequestStatus::Unrecognized(code) => {
            let label = if code.trim().is_empty() { UNKNOWN_STATUS_LABEL } else { code.as_str() };
            return StatusBadge {
                code: code.clone(),
                label: label.to_owned(),
                category: StatusCategory::Unknown,
                dot_style: "gray",
                sort_key: 5,
            };
        }
    };

    StatusBadge {
        code: status.code().to_owned(),
        label: label.to_owned(),
        category,
        dot_style,
        sort_key,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UrgencyBadge {
    pub code: String,
    pub label: String,
    pub dot_style: &'static str,
    pub rank: u8,
}

pub fn urgency_badge(urgency: Urgency) -> UrgencyBadge {
    let (label, dot_style, rank) = match urgency {
        Urgency::Low => ("Faible", "green", 1),
        Urgency::Medium => ("Moyenne", "yellow", 2),
        Urgency::High => ("Élevée", "orange", 3),
        Urgency::Critical => ("Critique", "red", 4),
    };
    UrgencyBadge { code: urgency.code().to_owned(), label: label.to_owned(), dot_style, rank }
}

/// Urgency badge for a raw code, with the `Non défini` fallback.
pub fn lookup_urgency(raw: &str) -> UrgencyBadge {
    match Urgency::from_code(raw) {
        Some(urgency) => urgency_badge(urgency),
        None => {
            let label = if raw.trim().is_empty() { UNKNOWN_URGENCY_LABEL } else { raw.trim() };
            UrgencyBadge {
                code: raw.trim().to_owned(),
                label: label.to_owned(),
                dot_style: "gray",
                rank: 0,
            }
        }
    }
}
