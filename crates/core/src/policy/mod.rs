//! Role-gated view and action rules.
//!
//! These decide what the client shows and highlights. They are UX hints
//! only: the backend enforces authorization on every call and nothing here
//! should be relied on to keep a request out of reach.

pub mod action;
pub mod navigation;
pub mod visibility;

use serde::{Deserialize, Serialize};

use crate::domain::user::{User, UserId, UserRole};

pub use action::{needs_action, queue_status};
pub use navigation::{guard, navigation_for, NavItem, Route, RouteAccess};
pub use visibility::is_visible;

/// Identity of whoever is looking at a screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    pub id: UserId,
    pub role: UserRole,
}

impl Viewer {
    pub fn new(id: UserId, role: UserRole) -> Self {
        Self { id, role }
    }
}

impl From<&User> for Viewer {
    fn from(user: &User) -> Self {
        Self { id: user.id, role: user.role.clone() }
    }
}
