//! Department naming for requests.
//!
//! The backend does not always send a department, so names are resolved
//! through a fallback chain. The statistics screen and the export name
//! employees differently and only the former falls back to the requester.

use serde::Serialize;

use crate::domain::request::Request;
use crate::domain::user::UserRole;

pub const OTHER_DEPARTMENTS: &str = "Autres services";

fn mapped(code: &str) -> Option<&'static str> {
    let name = match code.trim() {
        "accounting" => "Comptabilité",
        "mg" => "Moyens Généraux",
        "director" => "Direction",
        "hr" => "Ressources Humaines",
        "it" => "Informatique",
        "finance" => "Finance",
        "operations" => "Opérations",
        "marketing" => "Marketing",
        "sales" => "Ventes",
        _ => return None,
    };
    Some(name)
}

fn mapped_or_raw(code: &str) -> String {
    mapped(code).map(str::to_owned).unwrap_or_else(|| code.to_owned())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Naming {
    Statistics,
    Export,
}

/// Owner department, then owner role, then request department, then (for
/// statistics only) the requester's name.
pub fn department_name(request: &Request, naming: Naming) -> String {
    let owner = request.user.as_ref();

    if let Some(department) = owner.and_then(|owner| owner.department.as_deref()) {
        if !department.trim().is_empty() {
            return mapped_or_raw(department);
        }
    }
    // A blank role counts as no role at all.
    let role = owner.and_then(|owner| owner.role.as_ref());
    if let Some(role) = role.filter(|role| !role.code().trim().is_empty()) {
        let name = match (role, naming) {
            (UserRole::Employee, Naming::Statistics) => "Employés",
            (UserRole::Employee, Naming::Export) => "Personnel",
            (role, _) => mapped(role.code()).unwrap_or(OTHER_DEPARTMENTS),
        };
        return name.to_owned();
    }
    if let Some(department) = request.department.as_deref() {
        if !department.trim().is_empty() {
            return mapped_or_raw(department);
        }
    }
    if naming == Naming::Statistics && !request.user_name.trim().is_empty() {
        return format!("Service de {}", request.user_name);
    }
    OTHER_DEPARTMENTS.to_owned()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DepartmentCount {
    pub name: String,
    pub requests: u64,
}

/// Request counts per department, largest first, ties in order of first
/// appearance, truncated to `limit`.
pub fn department_breakdown(requests: &[Request], limit: usize) -> Vec<DepartmentCount> {
    let mut counts: Vec<DepartmentCount> = Vec::new();
    for request in requests {
        let name = department_name(request, Naming::Statistics);
        match counts.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.requests += 1,
            None => counts.push(DepartmentCount { name, requests: 1 }),
        }
    }
    counts.sort_by(|a, b| b.requests.cmp(&a.requests));
    counts.truncate(limit);
    counts
}
