use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role attached to a user account.
///
/// Codes outside the known set are kept verbatim in `Unrecognized` so that a
/// payload with a role this client does not know still loads; every policy
/// treats such a role as having no rights.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UserRole {
    Employee,
    Mg,
    Accounting,
    Director,
    Unrecognized(String),
}

impl UserRole {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "employee" => Self::Employee,
            "mg" => Self::Mg,
            "accounting" => Self::Accounting,
            "director" => Self::Director,
            _ => Self::Unrecognized(code.trim().to_owned()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Employee => "employee",
            Self::Mg => "mg",
            Self::Accounting => "accounting",
            Self::Director => "director",
            Self::Unrecognized(code) => code,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Employee => "Employé",
            Self::Mg => "Moyens Généraux",
            Self::Accounting => "Comptabilité",
            Self::Director => "Direction",
            Self::Unrecognized(code) => code,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for UserRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_code(&raw))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: UserRole,
    #[serde(default)]
    pub department: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_owned()
        }
    }

    /// Merges a profile patch into the in-memory record.
    pub fn apply_patch(&mut self, patch: &UserPatch) {
        if let Some(username) = &patch.username {
            self.username = username.clone();
        }
        if let Some(first_name) = &patch.first_name {
            self.first_name = first_name.clone();
        }
        if let Some(last_name) = &patch.last_name {
            self.last_name = last_name.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(phone) = &patch.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(department) = &patch.department {
            self.department = Some(department.clone());
        }
    }
}

/// Partial profile update. Unset fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{User, UserId, UserPatch, UserRole};

    fn user() -> User {
        User {
            id: UserId(3),
            username: "awa.diallo".to_owned(),
            first_name: "Awa".to_owned(),
            last_name: "Diallo".to_owned(),
            email: "awa@example.org".to_owned(),
            phone: None,
            role: UserRole::Employee,
            department: Some("it".to_owned()),
        }
    }

    #[test]
    fn unknown_role_codes_are_preserved() {
        let role: UserRole = serde_json::from_str("\"auditor\"").expect("role should parse");
        assert_eq!(role, UserRole::Unrecognized("auditor".to_owned()));
        assert_eq!(serde_json::to_string(&role).expect("serialize"), "\"auditor\"");
    }

    #[test]
    fn known_roles_round_trip_through_their_codes() {
        for code in ["employee", "mg", "accounting", "director"] {
            assert_eq!(UserRole::from_code(code).code(), code);
        }
        assert_eq!(UserRole::from_code(" MG ").display_name(), "Moyens Généraux");
    }

    #[test]
    fn patch_only_touches_provided_fields() {
        let mut user = user();
        user.apply_patch(&UserPatch {
            email: Some("awa.diallo@example.org".to_owned()),
            phone: Some("+221 77 000 00 00".to_owned()),
            ..UserPatch::default()
        });

        assert_eq!(user.email, "awa.diallo@example.org");
        assert_eq!(user.phone.as_deref(), Some("+221 77 000 00 00"));
        assert_eq!(user.first_name, "Awa");
        assert_eq!(user.department.as_deref(), Some("it"));
    }

    #[test]
    fn full_name_falls_back_to_username() {
        let mut user = user();
        assert_eq!(user.full_name(), "Awa Diallo");
        user.first_name.clear();
        user.last_name.clear();
        assert_eq!(user.full_name(), "awa.diallo");
    }
}
