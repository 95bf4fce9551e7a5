use serde::{Deserialize, Serialize};

use crate::domain::user::{User, UserPatch};

/// Immutable snapshot of who is signed in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for AuthState {
    /// The state before the session probe has run.
    fn default() -> Self {
        Self { is_authenticated: false, user: None, loading: true, error: None }
    }
}

impl AuthState {
    pub fn phase(&self) -> AuthPhase {
        match (&self.user, self.is_authenticated, self.loading) {
            (Some(_), true, _) => AuthPhase::Authenticated,
            (_, _, true) => AuthPhase::Loading,
            _ => AuthPhase::Unauthenticated,
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        if self.is_authenticated {
            self.user.as_ref()
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    Loading,
    Authenticated,
    Unauthenticated,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthAction {
    InitStart,
    InitComplete,
    LoginStart,
    LoginSuccess(User),
    LoginError(String),
    Logout,
    SetUser(User),
    UpdateUser(UserPatch),
    AuthError(String),
    ClearError,
}

/// Pure transition function for the session.
pub fn reduce(state: &AuthState, action: AuthAction) -> AuthState {
    match action {
        AuthAction::InitStart | AuthAction::LoginStart => {
            AuthState { loading: true, error: None, ..state.clone() }
        }
        AuthAction::InitComplete => AuthState { loading: false, ..state.clone() },
        AuthAction::LoginSuccess(user) | AuthAction::SetUser(user) => {
            AuthState { is_authenticated: true, user: Some(user), loading: false, error: None }
        }
        AuthAction::LoginError(message) | AuthAction::AuthError(message) => AuthState {
            is_authenticated: false,
            user: None,
            loading: false,
            error: Some(message),
        },
        AuthAction::Logout => {
            AuthState { is_authenticated: false, user: None, loading: false, error: None }
        }
        AuthAction::UpdateUser(patch) => {
            let mut next = state.clone();
            if let Some(user) = next.user.as_mut() {
                user.apply_patch(&patch);
            }
            next
        }
        AuthAction::ClearError => AuthState { error: None, ..state.clone() },
    }
}

#[cfg(test)]
mod tests {
    use super::{reduce, AuthAction, AuthPhase, AuthState};
    use crate::domain::fixtures::user;
    use crate::domain::user::UserPatch;

    #[test]
    fn initial_state_is_loading_and_signed_out() {
        let state = AuthState::default();
        assert_eq!(state.phase(), AuthPhase::Loading);
        assert!(state.current_user().is_none());
    }

    #[test]
    fn login_error_is_retained_until_cleared() {
        let state = reduce(&AuthState::default(), AuthAction::InitComplete);
        let state = reduce(&state, AuthAction::LoginStart);
        assert!(state.loading);

        let state = reduce(&state, AuthAction::LoginError("Identifiants invalides".to_owned()));
        assert_eq!(state.phase(), AuthPhase::Unauthenticated);
        assert_eq!(state.error.as_deref(), Some("Identifiants invalides"));

        let state = reduce(&state, AuthAction::InitComplete);
        assert_eq!(state.error.as_deref(), Some("Identifiants invalides"));

        let state = reduce(&state, AuthAction::ClearError);
        assert!(state.error.is_none());
    }

    #[test]
    fn logout_always_lands_signed_out() {
        let state = reduce(&AuthState::default(), AuthAction::LoginSuccess(user(1, "mg")));
        assert_eq!(state.phase(), AuthPhase::Authenticated);

        let state = reduce(&state, AuthAction::Logout);
        assert_eq!(state, AuthState { loading: false, ..AuthState::default() });
    }

    #[test]
    fn update_user_patches_in_place() {
        let state = reduce(&AuthState::default(), AuthAction::SetUser(user(1, "employee")));
        let state = reduce(
            &state,
            AuthAction::UpdateUser(UserPatch {
                phone: Some("770000000".to_owned()),
                ..UserPatch::default()
            }),
        );

        let current = state.current_user().expect("still signed in");
        assert_eq!(current.phone.as_deref(), Some("770000000"));
        assert_eq!(current.first_name, "Mariama");
    }

    #[test]
    fn update_user_without_session_is_a_no_op() {
        let state = AuthState { loading: false, ..AuthState::default() };
        let next = reduce(&state, AuthAction::UpdateUser(UserPatch::default()));
        assert_eq!(next, state);
    }
}
