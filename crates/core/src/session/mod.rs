//! Who is signed in, and how that changes.

pub mod provider;
pub mod state;

pub use provider::AuthProvider;
pub use state::{reduce, AuthAction, AuthPhase, AuthState};
