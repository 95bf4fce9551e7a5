use serde::Serialize;

use crate::domain::user::UserRole;
use crate::session::{AuthPhase, AuthState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Dashboard,
    Requests,
    CreateRequest,
    Validations,
    Statistics,
    Profile,
}

impl Route {
    pub const NAVIGATION: [Route; 5] = [
        Route::Dashboard,
        Route::Requests,
        Route::CreateRequest,
        Route::Validations,
        Route::Statistics,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Self::Dashboard => "/dashboard",
            Self::Requests => "/requests",
            Self::CreateRequest => "/requests/new",
            Self::Validations => "/validations",
            Self::Statistics => "/statistics",
            Self::Profile => "/profile",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Tableau de bord",
            Self::Requests => "Demandes",
            Self::CreateRequest => "Nouvelle demande",
            Self::Validations => "Validations",
            Self::Statistics => "Statistiques",
            Self::Profile => "Mon profil",
        }
    }

    /// Roles allowed on the route. An empty slice means any signed-in user.
    pub fn required_roles(self) -> &'static [UserRole] {
        const CREATORS: &[UserRole] = &[UserRole::Employee, UserRole::Mg];
        const VALIDATORS: &[UserRole] = &[UserRole::Mg, UserRole::Accounting, UserRole::Director];
        const ANALYSTS: &[UserRole] = &[UserRole::Mg, UserRole::Director];

        match self {
            Self::Dashboard | Self::Requests | Self::Profile => &[],
            Self::CreateRequest => CREATORS,
            Self::Validations => VALIDATORS,
            Self::Statistics => ANALYSTS,
        }
    }

    pub fn allows(self, role: &UserRole) -> bool {
        let required = self.required_roles();
        required.is_empty() || required.contains(role)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub route: Route,
    pub label: &'static str,
    pub path: &'static str,
}

/// Menu entries shown to a role, in display order.
pub fn navigation_for(role: &UserRole) -> Vec<NavItem> {
    Route::NAVIGATION
        .into_iter()
        .filter(|route| route.allows(role))
        .map(|route| NavItem { route, label: route.label(), path: route.path() })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RouteAccess {
    Loading,
    RedirectToLogin,
    Forbidden { required: Vec<String> },
    Allowed,
}

/// Decides what a protected screen renders for the current session.
pub fn guard(route: Route, session: &AuthState) -> RouteAccess {
    match session.phase() {
        AuthPhase::Loading => RouteAccess::Loading,
        AuthPhase::Unauthenticated => RouteAccess::RedirectToLogin,
        AuthPhase::Authenticated => match session.current_user() {
            Some(user) if route.allows(&user.role) => RouteAccess::Allowed,
            Some(_) => RouteAccess::Forbidden {
                required: route
                    .required_roles()
                    .iter()
                    .map(|role| role.code().to_owned())
                    .collect(),
            },
            None => RouteAccess::RedirectToLogin,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{guard, navigation_for, Route, RouteAccess};
    use crate::domain::fixtures::user;
    use crate::domain::user::UserRole;
    use crate::session::{reduce, AuthAction, AuthState};

    fn signed_in(role: &str) -> AuthState {
        reduce(&AuthState::default(), AuthAction::LoginSuccess(user(1, role)))
    }

    #[test]
    fn menus_follow_role_table() {
        let routes = |role: UserRole| {
            navigation_for(&role).into_iter().map(|item| item.route).collect::<Vec<_>>()
        };

        assert_eq!(
            routes(UserRole::Employee),
            vec![Route::Dashboard, Route::Requests, Route::CreateRequest]
        );
        assert_eq!(routes(UserRole::Mg), Route::NAVIGATION.to_vec());
        assert_eq!(
            routes(UserRole::Accounting),
            vec![Route::Dashboard, Route::Requests, Route::Validations]
        );
        assert_eq!(
            routes(UserRole::Director),
            vec![Route::Dashboard, Route::Requests, Route::Validations, Route::Statistics]
        );
        assert_eq!(
            routes(UserRole::Unrecognized("auditor".to_owned())),
            vec![Route::Dashboard, Route::Requests]
        );
    }

    #[test]
    fn guard_waits_for_probe_then_redirects() {
        assert_eq!(guard(Route::Dashboard, &AuthState::default()), RouteAccess::Loading);

        let signed_out = reduce(&AuthState::default(), AuthAction::Logout);
        assert_eq!(guard(Route::Dashboard, &signed_out), RouteAccess::RedirectToLogin);
    }

    #[test]
    fn guard_forbids_roles_outside_the_route() {
        assert_eq!(
            guard(Route::Statistics, &signed_in("accounting")),
            RouteAccess::Forbidden { required: vec!["mg".to_owned(), "director".to_owned()] }
        );
        assert_eq!(guard(Route::Statistics, &signed_in("director")), RouteAccess::Allowed);
        assert_eq!(guard(Route::Profile, &signed_in("employee")), RouteAccess::Allowed);
    }
}
