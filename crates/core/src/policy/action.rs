use crate::domain::request::{Request, RequestStatus};
use crate::domain::user::UserRole;

/// Whether `role` currently owes a decision on `request`.
///
/// Drives the "action requise" highlight only.
pub fn needs_action(request: &Request, role: &UserRole) -> bool {
    match queue_status(role) {
        Some(status) => request.status == status,
        None => false,
    }
}

/// The status a role works through on its validation queue.
pub fn queue_status(role: &UserRole) -> Option<RequestStatus> {
    match role {
        UserRole::Mg => Some(RequestStatus::Pending),
        UserRole::Accounting => Some(RequestStatus::MgApproved),
        UserRole::Director => Some(RequestStatus::AccountingReviewed),
        UserRole::Employee | UserRole::Unrecognized(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{needs_action, queue_status};
    use crate::domain::fixtures::request;
    use crate::domain::user::{UserId, UserRole};
    use crate::policy::{is_visible, Viewer};

    #[test]
    fn action_table_matches_each_role_stage() {
        assert!(needs_action(&request(1, "pending"), &UserRole::Mg));
        assert!(needs_action(&request(1, "mg_approved"), &UserRole::Accounting));
        assert!(needs_action(&request(1, "mg_validated"), &UserRole::Accounting));
        assert!(needs_action(&request(1, "accounting_reviewed"), &UserRole::Director));

        assert!(!needs_action(&request(1, "mg_approved"), &UserRole::Mg));
        assert!(!needs_action(&request(1, "pending"), &UserRole::Director));
        assert!(!needs_action(&request(1, "director_approved"), &UserRole::Director));
    }

    #[test]
    fn employees_never_have_actions() {
        for status in ["pending", "mg_approved", "accounting_reviewed", "rejected"] {
            assert!(!needs_action(&request(1, status), &UserRole::Employee));
        }
        assert_eq!(queue_status(&UserRole::Employee), None);
        assert_eq!(queue_status(&UserRole::Unrecognized("intern".to_owned())), None);
    }

    #[test]
    fn accounting_sees_and_acts_on_fresh_mg_approval() {
        let request = request(1, "mg_approved");
        let viewer = Viewer::new(UserId(77), UserRole::Accounting);

        assert!(is_visible(&request, &viewer));
        assert!(needs_action(&request, &viewer.role));
    }
}
