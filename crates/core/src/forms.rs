//! Client-side form checks run before anything reaches the network.
//!
//! Each validator returns every failing field at once so the form can show
//! all messages inline in a single pass.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::request::Urgency;
use crate::domain::user::{UserPatch, UserRole};

pub const MIN_DESCRIPTION_CHARS: usize = 10;
pub const MIN_JUSTIFICATION_CHARS: usize = 20;
pub const MIN_IDENTIFIER_CHARS: usize = 3;
pub const MIN_LOGIN_PASSWORD_CHARS: usize = 6;
pub const MIN_NEW_PASSWORD_CHARS: usize = 8;

/// Keys the backend uses for messages that are not tied to one field.
const NON_FIELD_KEYS: [&str; 5] = ["detail", "message", "error", "non_field_errors", "success"];

/// Messages keyed by form field name, one per field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    /// Drops the message for a field once the user edits it.
    pub fn clear(&mut self, field: &str) {
        self.0.remove(field);
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Reads a server error body of the `{"field": ["message", ...]}` shape.
    ///
    /// Returns `None` when the body is not field-keyed, in which case the
    /// caller falls back to a single generic notice.
    pub fn from_server_body(body: &Value) -> Option<Self> {
        let object = body.as_object()?;
        let mut errors = Self::default();
        for (key, value) in object {
            if NON_FIELD_KEYS.contains(&key.as_str()) {
                continue;
            }
            let message = match value {
                Value::String(message) => Some(message.clone()),
                Value::Array(items) => items.iter().find_map(Value::as_str).map(str::to_owned),
                _ => None,
            };
            if let Some(message) = message {
                errors.insert(key.clone(), message);
            }
        }
        if errors.is_empty() {
            None
        } else {
            Some(errors)
        }
    }
}

fn char_count(value: &str) -> usize {
    value.trim().chars().count()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequestForm {
    pub item_description: String,
    pub quantity: Option<i64>,
    pub estimated_cost: Option<Decimal>,
    pub urgency: Urgency,
    pub justification: String,
}

impl CreateRequestForm {
    /// The estimated cost is only asked of MG, who prices requests directly.
    pub fn validate(&self, creator: &UserRole) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        if self.item_description.trim().is_empty() {
            errors.insert("item_description", "La description est requise");
        } else if char_count(&self.item_description) < MIN_DESCRIPTION_CHARS {
            errors.insert(
                "item_description",
                format!("La description doit contenir au moins {MIN_DESCRIPTION_CHARS} caractères"),
            );
        }

        match self.quantity {
            None => errors.insert("quantity", "La quantité est requise"),
            Some(quantity) if quantity <= 0 => {
                errors.insert("quantity", "La quantité doit être supérieure à 0")
            }
            Some(_) => {}
        }

        if *creator == UserRole::Mg {
            match self.estimated_cost {
                None => errors.insert("estimated_cost", "Le coût estimé est requis"),
                Some(cost) if cost <= Decimal::ZERO => {
                    errors.insert("estimated_cost", "Le coût estimé doit être supérieur à 0")
                }
                Some(_) => {}
            }
        }

        if self.justification.trim().is_empty() {
            errors.insert("justification", "La justification est requise");
        } else if char_count(&self.justification) < MIN_JUSTIFICATION_CHARS {
            errors.insert(
                "justification",
                format!(
                    "La justification doit contenir au moins {MIN_JUSTIFICATION_CHARS} caractères"
                ),
            );
        }

        errors.into_result()
    }
}

#[derive(Clone, Debug)]
pub struct Credentials {
    pub identifier: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self { identifier: identifier.into(), password: SecretString::from(password.into()) }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        let identifier = self.identifier.trim();
        if identifier.is_empty() {
            errors.insert("identifier", "L'identifiant est requis");
        } else if identifier.chars().count() < MIN_IDENTIFIER_CHARS {
            errors.insert(
                "identifier",
                format!("L'identifiant doit contenir au moins {MIN_IDENTIFIER_CHARS} caractères"),
            );
        }

        let password = self.password.expose_secret().trim();
        if password.is_empty() {
            errors.insert("password", "Le mot de passe est requis");
        } else if password.chars().count() < MIN_LOGIN_PASSWORD_CHARS {
            errors.insert(
                "password",
                format!(
                    "Le mot de passe doit contenir au moins {MIN_LOGIN_PASSWORD_CHARS} caractères"
                ),
            );
        }
        errors.into_result()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

impl ProfileForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if self.first_name.trim().is_empty() {
            errors.insert("first_name", "Le prénom est requis");
        }
        if self.last_name.trim().is_empty() {
            errors.insert("last_name", "Le nom est requis");
        }
        if self.username.trim().is_empty() {
            errors.insert("username", "Le nom d'utilisateur est requis");
        }
        if self.email.trim().is_empty() {
            errors.insert("email", "L'email est requis");
        } else if !looks_like_email(self.email.trim()) {
            errors.insert("email", "Format d'email invalide");
        }
        errors.into_result()
    }

    pub fn to_patch(&self) -> UserPatch {
        UserPatch {
            username: Some(self.username.trim().to_owned()),
            first_name: Some(self.first_name.trim().to_owned()),
            last_name: Some(self.last_name.trim().to_owned()),
            email: Some(self.email.trim().to_owned()),
            phone: self.phone.clone(),
            department: self.department.clone(),
        }
    }
}

/// `local@domain.tld` with no whitespace; the server does the real check.
pub fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

#[derive(Clone, Debug)]
pub struct PasswordChangeForm {
    pub old_password: SecretString,
    pub new_password: SecretString,
    pub confirm_password: SecretString,
}

impl PasswordChangeForm {
    pub fn new(old: impl Into<String>, new: impl Into<String>, confirm: impl Into<String>) -> Self {
        Self {
            old_password: SecretString::from(old.into()),
            new_password: SecretString::from(new.into()),
            confirm_password: SecretString::from(confirm.into()),
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        let old = self.old_password.expose_secret();
        let new = self.new_password.expose_secret();

        if old.is_empty() {
            errors.insert("old_password", "L'ancien mot de passe est requis");
        }
        if new.is_empty() {
            errors.insert("new_password", "Le nouveau mot de passe est requis");
        } else if new.chars().count() < MIN_NEW_PASSWORD_CHARS {
            errors.insert(
                "new_password",
                format!(
                    "Le mot de passe doit contenir au moins {MIN_NEW_PASSWORD_CHARS} caractères"
                ),
            );
        } else if new == old {
            errors.insert(
                "new_password",
                "Le nouveau mot de passe doit être différent de l'ancien",
            );
        }
        if self.confirm_password.expose_secret() != new {
            errors.insert("confirm_password", "Les mots de passe ne correspondent pas");
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{
        looks_like_email, CreateRequestForm, Credentials, FieldErrors, PasswordChangeForm,
        ProfileForm,
    };
    use crate::domain::request::Urgency;
    use crate::domain::user::UserRole;

    fn form() -> CreateRequestForm {
        CreateRequestForm {
            item_description: "Écran 27 pouces".to_owned(),
            quantity: Some(2),
            estimated_cost: None,
            urgency: Urgency::High,
            justification: "Poste de travail du nouveau comptable".to_owned(),
        }
    }

    #[test]
    fn employee_form_does_not_need_a_cost() {
        assert!(form().validate(&UserRole::Employee).is_ok());
    }

    #[test]
    fn mg_form_requires_positive_cost() {
        let errors = form().validate(&UserRole::Mg).expect_err("cost missing");
        assert_eq!(errors.fields(), vec!["estimated_cost"]);

        let priced = CreateRequestForm { estimated_cost: Some(Decimal::ZERO), ..form() };
        let errors = priced.validate(&UserRole::Mg).expect_err("zero cost");
        assert_eq!(errors.get("estimated_cost"), Some("Le coût estimé doit être supérieur à 0"));

        let priced = CreateRequestForm { estimated_cost: Some(Decimal::new(250_000, 0)), ..form() };
        assert!(priced.validate(&UserRole::Mg).is_ok());
    }

    #[test]
    fn short_fields_are_all_reported_together() {
        let errors = CreateRequestForm {
            item_description: "Stylos".to_owned(),
            quantity: Some(0),
            justification: "Urgent".to_owned(),
            ..CreateRequestForm::default()
        }
        .validate(&UserRole::Employee)
        .expect_err("three failures");

        assert_eq!(errors.fields(), vec!["item_description", "justification", "quantity"]);
    }

    #[test]
    fn login_trims_before_measuring() {
        assert!(Credentials::new("awa", "secret").validate().is_ok());
        let errors = Credentials::new(" ab ", "     12345 ").validate().expect_err("too short");
        assert_eq!(errors.fields(), vec!["identifier", "password"]);
    }

    #[test]
    fn profile_requires_well_formed_email() {
        let profile = ProfileForm {
            username: "awa".to_owned(),
            first_name: "Awa".to_owned(),
            last_name: "Diallo".to_owned(),
            email: "awa@exemple".to_owned(),
            ..ProfileForm::default()
        };
        let errors = profile.validate().expect_err("bad email");
        assert_eq!(errors.get("email"), Some("Format d'email invalide"));

        assert!(looks_like_email("awa@exemple.sn"));
        assert!(!looks_like_email("awa @exemple.sn"));
        assert!(!looks_like_email("@exemple.sn"));
    }

    #[test]
    fn password_change_rules() {
        let form = PasswordChangeForm::new("ancien123", "nouveau123", "nouveau123");
        assert!(form.validate().is_ok());

        let errors = PasswordChangeForm::new("ancien123", "ancien123", "ancien123")
            .validate()
            .expect_err("same password");
        assert_eq!(errors.fields(), vec!["new_password"]);

        let errors = PasswordChangeForm::new("ancien123", "court", "autre")
            .validate()
            .expect_err("short and mismatched");
        assert_eq!(errors.fields(), vec!["confirm_password", "new_password"]);
    }

    #[test]
    fn server_bodies_map_onto_fields_when_keyed() {
        let body = json!({
            "quantity": ["Assurez-vous que cette valeur est supérieure à 0."],
            "justification": "Trop courte",
            "detail": "ignored"
        });
        let errors = FieldErrors::from_server_body(&body).expect("field keyed");
        assert_eq!(errors.fields(), vec!["justification", "quantity"]);

        assert!(FieldErrors::from_server_body(&json!({"detail": "Erreur serveur"})).is_none());
        assert!(FieldErrors::from_server_body(&json!("boom")).is_none());
    }

    #[test]
    fn editing_a_field_clears_its_error() {
        let mut errors = Credentials::new("", "").validate().expect_err("empty");
        errors.clear("identifier");
        assert_eq!(errors.fields(), vec!["password"]);
    }
}
