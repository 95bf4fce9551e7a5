//! Read-only projection of a request's progress through the four stages.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::request::{ApprovalStage, Request, RequestStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineStageKey {
    Creation,
    MgValidation,
    AccountingValidation,
    DirectorValidation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Current,
    Rejected,
    Pending,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimelineStage {
    pub key: TimelineStageKey,
    pub title: &'static str,
    pub description: String,
    pub status: StageStatus,
    pub role_label: &'static str,
    pub actor: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

/// Derives the four timeline stages from status and step history.
///
/// A stage can be `Completed` with no actor or date when the history lacks a
/// matching step; that gap is shown as is.
pub fn derive_timeline(request: &Request) -> [TimelineStage; 4] {
    let creation = TimelineStage {
        key: TimelineStageKey::Creation,
        title: "Demande créée",
        description: format!("Par {}", request.user_name),
        status: StageStatus::Completed,
        role_label: "Employé",
        actor: Some(request.user_name.clone()),
        date: Some(request.created_at),
        comment: None,
    };

    [
        creation,
        approval_stage(request, ApprovalStage::Mg),
        approval_stage(request, ApprovalStage::Accounting),
        approval_stage(request, ApprovalStage::Director),
    ]
}

fn approval_stage(request: &Request, stage: ApprovalStage) -> TimelineStage {
    let (key, title, description) = match stage {
        ApprovalStage::Mg => (
            TimelineStageKey::MgValidation,
            "Validation Moyens Généraux",
            "Vérification de la demande",
        ),
        ApprovalStage::Accounting => (
            TimelineStageKey::AccountingValidation,
            "Validation Comptabilité",
            "Vérification budgétaire",
        ),
        ApprovalStage::Director => {
            (TimelineStageKey::DirectorValidation, "Approbation Direction", "Approbation finale")
        }
    };
    let step = request.step_for(stage);

    TimelineStage {
        key,
        title,
        description: description.to_owned(),
        status: stage_status(request, stage),
        role_label: stage.role_label(),
        actor: step.map(|step| step.user_name.clone()).filter(|name| !name.trim().is_empty()),
        date: step.and_then(|step| step.created_at),
        comment: step.and_then(|step| step.comment.clone()),
    }
}

fn stage_status(request: &Request, stage: ApprovalStage) -> StageStatus {
    use RequestStatus::{AccountingReviewed, DirectorApproved, MgApproved, Pending};

    if request.rejected_at(stage) {
        return StageStatus::Rejected;
    }

    let (completed, current) = match (stage, &request.status) {
        (ApprovalStage::Mg, status) => (
            matches!(status, MgApproved | AccountingReviewed | DirectorApproved),
            *status == Pending,
        ),
        (ApprovalStage::Accounting, status) => {
            (matches!(status, AccountingReviewed | DirectorApproved), *status == MgApproved)
        }
        (ApprovalStage::Director, status) => {
            (*status == DirectorApproved, *status == AccountingReviewed)
        }
    };

    if completed {
        StageStatus::Completed
    } else if current {
        StageStatus::Current
    } else {
        StageStatus::Pending
    }
}
