use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{info, warn};
use uuid::Uuid;

use crate::api::AuthApi;
use crate::domain::user::{User, UserPatch};
use crate::errors::{ApiError, ApplicationError, DomainError, NETWORK_NOTICE};
use crate::forms::{Credentials, PasswordChangeForm, ProfileForm};
use crate::session::state::{reduce, AuthAction, AuthState};

pub const LOGIN_FALLBACK: &str = "Erreur de connexion";
pub const PROFILE_FALLBACK: &str = "Erreur lors de la mise à jour du profil";
pub const PASSWORD_FALLBACK: &str = "Erreur lors du changement de mot de passe";

/// Owns the session snapshot and drives it through [`reduce`].
///
/// One provider per application. The initial probe runs at most once no
/// matter how many times [`AuthProvider::initialize`] is called, and once
/// [`AuthProvider::dispose`] has run every later transition is dropped.
pub struct AuthProvider<A> {
    api: A,
    state: RwLock<AuthState>,
    probed: AtomicBool,
    disposed: AtomicBool,
}

impl<A: AuthApi> AuthProvider<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: RwLock::new(AuthState::default()),
            probed: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn state(&self) -> AuthState {
        self.read().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.read().current_user().cloned()
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn dispatch(&self, action: AuthAction) -> AuthState {
        if self.disposed.load(Ordering::SeqCst) {
            return self.state();
        }
        let mut state = self.write();
        *state = reduce(&state, action);
        state.clone()
    }

    /// Probes the backend for an existing session.
    ///
    /// A 401 gets exactly one refresh followed by one retry; any other
    /// failure leaves the session unauthenticated.
    pub async fn initialize(&self) -> AuthState {
        if self.probed.swap(true, Ordering::SeqCst) {
            return self.state();
        }
        let correlation_id = Uuid::new_v4().to_string();
        info!(
            event_name = "session.probe.start",
            correlation_id = %correlation_id,
            "probing session"
        );
        self.dispatch(AuthAction::InitStart);

        let probed = match self.api.current_user().await {
            Err(ApiError::Unauthorized) => match self.api.refresh_session().await {
                Ok(()) => {
                    info!(
                        event_name = "session.probe.refreshed",
                        correlation_id = %correlation_id,
                        "session refreshed, retrying probe"
                    );
                    self.api.current_user().await
                }
                Err(error) => Err(error),
            },
            other => other,
        };

        match probed {
            Ok(user) => {
                info!(
                    event_name = "session.probe.authenticated",
                    correlation_id = %correlation_id,
                    user_id = %user.id,
                    role = %user.role,
                    "session restored"
                );
                self.dispatch(AuthAction::SetUser(user))
            }
            Err(error) => {
                info!(
                    event_name = "session.probe.unauthenticated",
                    correlation_id = %correlation_id,
                    reason = %error,
                    "no active session"
                );
                self.dispatch(AuthAction::Logout)
            }
        }
    }

    /// Signs in. Local validation failures never reach the backend and
    /// leave the session untouched; backend failures are kept on the state
    /// until [`AuthProvider::clear_error`].
    pub async fn login(&self, credentials: &Credentials) -> Result<User, ApplicationError> {
        credentials.validate().map_err(DomainError::Validation)?;
        self.dispatch(AuthAction::LoginStart);

        let outcome = match self.api.login(credentials).await {
            Ok(response) => match response.user {
                Some(user) if response.success => Ok(user),
                _ => Err(ApiError::InvalidCredentials(non_empty_or(
                    &response.message,
                    LOGIN_FALLBACK,
                ))),
            },
            Err(error) => Err(error),
        };

        match outcome {
            Ok(user) => {
                info!(event_name = "session.login.succeeded", user_id = %user.id, "signed in");
                self.dispatch(AuthAction::LoginSuccess(user.clone()));
                Ok(user)
            }
            Err(error) => {
                let message = login_message(&error);
                warn!(event_name = "session.login.failed", reason = %error, "sign in failed");
                self.dispatch(AuthAction::LoginError(message));
                Err(error.into())
            }
        }
    }

    /// Always ends unauthenticated, even when the backend call fails.
    pub async fn logout(&self) -> AuthState {
        if let Err(error) = self.api.logout().await {
            warn!(
                event_name = "session.logout.remote_failed",
                reason = %error,
                "remote logout failed, clearing local session anyway"
            );
        }
        info!(event_name = "session.logout", "signed out");
        self.dispatch(AuthAction::Logout)
    }

    /// Patches the in-memory user without a reload.
    pub fn update_user(&self, patch: UserPatch) -> AuthState {
        self.dispatch(AuthAction::UpdateUser(patch))
    }

    pub fn clear_error(&self) -> AuthState {
        self.dispatch(AuthAction::ClearError)
    }

    /// Saves the profile form and folds the server's answer into the session.
    pub async fn save_profile(&self, form: &ProfileForm) -> Result<User, ApplicationError> {
        form.validate().map_err(DomainError::Validation)?;
        let user_id = self.current_user().map(|user| user.id).ok_or(ApiError::Unauthorized)?;

        match self.api.update_profile(user_id, &form.to_patch()).await {
            Ok(user) => {
                info!(event_name = "session.profile.updated", user_id = %user.id, "profile saved");
                self.dispatch(AuthAction::SetUser(user.clone()));
                Ok(user)
            }
            Err(error) => {
                warn!(
                    event_name = "session.profile.failed",
                    reason = %error,
                    "profile update failed"
                );
                Err(with_fallback(error, PROFILE_FALLBACK).into())
            }
        }
    }

    pub async fn change_password(
        &self,
        change: &PasswordChangeForm,
    ) -> Result<String, ApplicationError> {
        change.validate().map_err(DomainError::Validation)?;
        match self.api.change_password(change).await {
            Ok(message) => {
                info!(event_name = "session.password.changed", "password changed");
                Ok(message)
            }
            Err(error) => {
                warn!(
                    event_name = "session.password.failed",
                    reason = %error,
                    "password change failed"
                );
                Err(with_fallback(error, PASSWORD_FALLBACK).into())
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, AuthState> {
        match self.state.read() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, AuthState> {
        match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn non_empty_or(message: &str, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_owned()
    } else {
        message.trim().to_owned()
    }
}

/// Message retained on the login form for a failed sign-in.
pub fn login_message(error: &ApiError) -> String {
    match error {
        ApiError::InvalidCredentials(message) => non_empty_or(message, LOGIN_FALLBACK),
        ApiError::Server { status, message } => non_empty_or(message, &format!("Erreur {status}")),
        ApiError::Transport(_) => NETWORK_NOTICE.to_owned(),
        ApiError::Unauthorized | ApiError::Validation(_) | ApiError::Decode(_) => {
            LOGIN_FALLBACK.to_owned()
        }
    }
}

fn with_fallback(error: ApiError, fallback: &str) -> ApiError {
    match error {
        ApiError::Server { status, message } if message.trim().is_empty() => {
            ApiError::Server { status, message: fallback.to_owned() }
        }
        ApiError::Decode(_) => ApiError::Server { status: 0, message: fallback.to_owned() },
        other => other,
    }
}
