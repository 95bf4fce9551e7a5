//! Forgotten-password flow: email, emailed code, new password.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::PasswordResetApi;
use crate::errors::{ApplicationError, DomainError};
use crate::forms::FieldErrors;

pub const DEFAULT_CODE_TTL_SECS: u64 = 300;
pub const CODE_LENGTH: usize = 5;
pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MIN_STRENGTH_SCORE: u8 = 3;

const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordStrength {
    /// One point per satisfied criterion, 0..=5.
    pub score: u8,
    /// Criteria still missing, in display order.
    pub missing: Vec<&'static str>,
}

impl PasswordStrength {
    pub fn evaluate(password: &str) -> Self {
        let criteria: [(bool, &'static str); 5] = [
            (password.chars().count() >= MIN_PASSWORD_CHARS, "Au moins 8 caractères"),
            (password.chars().any(|c| c.is_ascii_lowercase()), "Une lettre minuscule"),
            (password.chars().any(|c| c.is_ascii_uppercase()), "Une lettre majuscule"),
            (password.chars().any(|c| c.is_ascii_digit()), "Un chiffre"),
            (password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)), "Un caractère spécial"),
        ];
        let mut score = 0;
        let mut missing = Vec::new();
        for (met, label) in criteria {
            if met {
                score += 1;
            } else {
                missing.push(label);
            }
        }
        Self { score, missing }
    }

    pub fn label(&self) -> &'static str {
        match self.score {
            0 | 1 => "Très faible",
            2 => "Faible",
            3 => "Moyen",
            4 => "Bon",
            _ => "Fort",
        }
    }

    pub fn is_acceptable(&self) -> bool {
        self.score >= MIN_STRENGTH_SCORE
    }

    /// `Manque : …` line, or `None` when every criterion is met.
    pub fn feedback(&self) -> Option<String> {
        if self.missing.is_empty() {
            None
        } else {
            Some(format!("Manque : {}", self.missing.join(", ")))
        }
    }
}

/// Seconds left on an emailed code, ticking down once per second.
///
/// The ticking task is aborted when the countdown is dropped.
pub struct ExpiryCountdown {
    remaining: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl ExpiryCountdown {
    /// Must be called from within a tokio runtime.
    pub fn start(seconds: u64) -> Self {
        let (sender, remaining) = watch::channel(seconds);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.tick().await;
            let mut left = seconds;
            while left > 0 {
                ticker.tick().await;
                left -= 1;
                if sender.send(left).is_err() {
                    break;
                }
            }
        });
        Self { remaining, task }
    }

    pub fn remaining(&self) -> u64 {
        *self.remaining.borrow()
    }

    pub fn is_expired(&self) -> bool {
        self.remaining() == 0
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.remaining.clone()
    }

    /// `m:ss`, as shown next to the code input.
    pub fn display(&self) -> String {
        let left = self.remaining();
        format!("{}:{:02}", left / 60, left % 60)
    }
}

impl Drop for ExpiryCountdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn field_error(field: &str, message: &str) -> ApplicationError {
    let mut errors = FieldErrors::default();
    errors.insert(field, message);
    DomainError::Validation(errors).into()
}

pub fn is_well_formed_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|byte| byte.is_ascii_digit())
}

/// Checks a new password pair before it is sent.
pub fn validate_new_password(
    new_password: &SecretString,
    confirm_password: &SecretString,
) -> Result<(), FieldErrors> {
    let new = new_password.expose_secret();
    let mut errors = FieldErrors::default();
    let strength = PasswordStrength::evaluate(new);

    if new.chars().count() < MIN_PASSWORD_CHARS {
        errors.insert("new_password", "Le mot de passe doit contenir au moins 8 caractères");
    } else if !strength.is_acceptable() {
        errors.insert("new_password", "Le mot de passe est trop faible. Veuillez le renforcer.");
    }
    if confirm_password.expose_secret() != new {
        errors.insert("confirm_password", "Les mots de passe ne correspondent pas");
    }
    errors.into_result()
}

/// Walks one user through the three reset steps.
pub struct PasswordResetFlow<A> {
    api: A,
    email: Option<String>,
    countdown: Option<ExpiryCountdown>,
    reset_token: Option<SecretString>,
}

impl<A: PasswordResetApi> PasswordResetFlow<A> {
    pub fn new(api: A) -> Self {
        Self { api, email: None, countdown: None, reset_token: None }
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn countdown(&self) -> Option<&ExpiryCountdown> {
        self.countdown.as_ref()
    }

    /// Sends the code and starts the expiry countdown. Returns its length in
    /// seconds.
    pub async fn request_reset(&mut self, email: &str) -> Result<u64, ApplicationError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(field_error("email", "Veuillez entrer une adresse email."));
        }

        let requested = self.api.request_reset(&email).await?;
        let ttl = requested.expires_in.filter(|secs| *secs > 0).unwrap_or(DEFAULT_CODE_TTL_SECS);
        info!(event_name = "password_reset.code.sent", ttl_secs = ttl, "reset code sent");

        self.email = Some(email);
        self.reset_token = None;
        self.countdown = Some(ExpiryCountdown::start(ttl));
        Ok(ttl)
    }

    /// Asks for a fresh code for the same address.
    pub async fn resend(&mut self) -> Result<u64, ApplicationError> {
        let email = self.email.clone().ok_or_else(no_email)?;
        self.request_reset(&email).await
    }

    pub async fn verify_code(&mut self, code: &str) -> Result<(), ApplicationError> {
        let email = self.email.clone().ok_or_else(no_email)?;
        let code = code.trim();
        if !is_well_formed_code(code) {
            return Err(field_error("code", "Veuillez saisir le code complet à 5 chiffres"));
        }
        if self.countdown.as_ref().map_or(true, ExpiryCountdown::is_expired) {
            return Err(field_error("code", "Le code a expiré. Veuillez en demander un nouveau."));
        }

        match self.api.verify_code(&email, code).await {
            Ok(token) => {
                info!(event_name = "password_reset.code.verified", "reset code accepted");
                self.reset_token = Some(token);
                self.countdown = None;
                Ok(())
            }
            Err(error) => {
                warn!(
                    event_name = "password_reset.code.rejected",
                    reason = %error,
                    "reset code refused"
                );
                Err(error.into())
            }
        }
    }

    pub async fn confirm(
        &mut self,
        new_password: &SecretString,
        confirm_password: &SecretString,
    ) -> Result<(), ApplicationError> {
        let token = self.reset_token.clone().ok_or_else(|| {
            ApplicationError::from(DomainError::InvariantViolation(
                "password reset confirmed before the code was verified".to_owned(),
            ))
        })?;
        validate_new_password(new_password, confirm_password).map_err(DomainError::Validation)?;

        self.api.confirm_reset(&token, new_password, confirm_password).await?;
        info!(event_name = "password_reset.completed", "password reset");
        self.reset_token = None;
        self.email = None;
        Ok(())
    }
}

fn no_email() -> ApplicationError {
    DomainError::InvariantViolation("no reset has been requested".to_owned()).into()
}
