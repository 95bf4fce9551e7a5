use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::request::{Request, RequestId, RequestStatus, Step, Urgency};
use crate::domain::user::{User, UserId, UserRole};

pub(crate) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0).unwrap()
}

pub(crate) fn request(id: u64, status: &str) -> Request {
    Request {
        id: RequestId(id),
        status: RequestStatus::from_code(status),
        urgency: Urgency::Medium,
        item_description: "Ramettes de papier A4".to_owned(),
        justification: "Stock du service épuisé depuis la semaine dernière".to_owned(),
        quantity: 20,
        estimated_cost: Some(Decimal::new(50_000, 0)),
        final_cost: None,
        user_id: UserId(10),
        user_name: "Ibrahima Sow".to_owned(),
        created_by: None,
        user: None,
        department: None,
        created_at: at(2024, 10, 1),
        updated_at: None,
        rejected_by: None,
        rejected_by_role: None,
        accounting_validated_by: None,
        approved_by: None,
        steps: Vec::new(),
        budget_available: None,
    }
}

pub(crate) fn step(label: &str, name: &str, created_at: DateTime<Utc>) -> Step {
    Step {
        user_role: label.to_owned(),
        user_name: name.to_owned(),
        created_at: Some(created_at),
        comment: None,
        stage: None,
    }
}

pub(crate) fn user(id: i64, role: &str) -> User {
    User {
        id: UserId(id),
        username: format!("user{id}"),
        first_name: "Mariama".to_owned(),
        last_name: "Ba".to_owned(),
        email: format!("user{id}@example.org"),
        phone: None,
        role: UserRole::from_code(role),
        department: None,
    }
}
