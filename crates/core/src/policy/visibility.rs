use crate::domain::request::{ApprovalStage, Request, RequestStatus};
use crate::domain::user::UserRole;
use crate::policy::Viewer;

/// Whether `viewer` should see `request` in list views.
///
/// Each role sees what sits at its own decision point plus its own past
/// decisions; only MG sees everything.
pub fn is_visible(request: &Request, viewer: &Viewer) -> bool {
    match &viewer.role {
        UserRole::Employee => request.is_owned_by(viewer.id),
        UserRole::Mg => true,
        UserRole::Accounting => {
            matches!(request.status, RequestStatus::MgApproved | RequestStatus::AccountingReviewed)
                || request.accounting_validated_by == Some(viewer.id)
                || request.rejected_by_at(ApprovalStage::Accounting, viewer.id)
        }
        UserRole::Director => {
            matches!(
                request.status,
                RequestStatus::AccountingReviewed | RequestStatus::DirectorApproved
            ) || request.approved_by == Some(viewer.id)
                || request.rejected_by_at(ApprovalStage::Director, viewer.id)
        }
        UserRole::Unrecognized(_) => false,
    }
}
