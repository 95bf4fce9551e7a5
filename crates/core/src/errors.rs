use serde::Serialize;
use thiserror::Error;

use crate::flows::FlowTransitionError;
use crate::forms::FieldErrors;

pub const NETWORK_NOTICE: &str = "Impossible de contacter le serveur. Vérifiez votre connexion.";
pub const GENERIC_NOTICE: &str = "Une erreur inattendue est survenue.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("form validation failed on {}", .0.fields().join(", "))]
    Validation(FieldErrors),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failures reported by the backend collaborators.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("session is not authenticated")]
    Unauthorized,
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("server rejected fields {}", .0.fields().join(", "))]
    Validation(FieldErrors),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("no response from server: {0}")]
    Transport(String),
    #[error("could not decode server response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Validation,
    Authentication,
    Network,
    Error,
}

/// What the user is shown for an error: a transient notification, plus
/// inline messages when the failure is tied to form fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    pub fields: FieldErrors,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), fields: FieldErrors::default() }
    }
}

impl ApplicationError {
    pub fn notice(&self) -> Notice {
        match self {
            Self::Domain(DomainError::Validation(fields))
            | Self::Api(ApiError::Validation(fields)) => Notice {
                kind: NoticeKind::Validation,
                message: "Veuillez corriger les erreurs du formulaire.".to_owned(),
                fields: fields.clone(),
            },
            Self::Domain(DomainError::FlowTransition(_)) => Notice::new(
                NoticeKind::Error,
                "Cette action n'est plus possible pour cette demande.",
            ),
            Self::Domain(DomainError::InvariantViolation(_)) => {
                Notice::new(NoticeKind::Error, GENERIC_NOTICE)
            }
            Self::Api(ApiError::Unauthorized) => Notice::new(
                NoticeKind::Authentication,
                "Votre session a expiré. Veuillez vous reconnecter.",
            ),
            Self::Api(ApiError::InvalidCredentials(message)) => {
                Notice::new(NoticeKind::Authentication, message.clone())
            }
            Self::Api(ApiError::Server { message, .. }) if !message.trim().is_empty() => {
                Notice::new(NoticeKind::Error, message.clone())
            }
            Self::Api(ApiError::Server { status, .. }) => {
                Notice::new(NoticeKind::Error, format!("Erreur {status}"))
            }
            Self::Api(ApiError::Transport(_)) => Notice::new(NoticeKind::Network, NETWORK_NOTICE),
            Self::Api(ApiError::Decode(_)) | Self::Configuration(_) => {
                Notice::new(NoticeKind::Error, GENERIC_NOTICE)
            }
        }
    }

    /// Short stable class name used in structured logs and CLI output.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::Validation(_)) => "validation",
            Self::Domain(_) => "domain",
            Self::Api(ApiError::Unauthorized | ApiError::InvalidCredentials(_)) => "authentication",
            Self::Api(ApiError::Validation(_)) => "server_validation",
            Self::Api(ApiError::Transport(_)) => "network",
            Self::Api(_) => "server",
            Self::Configuration(_) => "configuration",
        }
    }
}
