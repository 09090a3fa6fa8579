//! People, roles and registration status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::text_enum;

/// Global role. Depositor rights are per-collection grants, not a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    User,
}

text_enum!(Role {
    Admin => "ADMIN",
    User => "USER",
});

/// Registration workflow state
///
/// New registrations start `Pending` and cannot log in until an admin
/// approves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Declined,
}

text_enum!(RegistrationStatus {
    Pending => "PENDING",
    Approved => "APPROVED",
    Declined => "DECLINED",
});

/// A registered person (never carries credentials)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub email: String,
    pub first_names: String,
    pub last_names: String,
    pub phone_number: Option<String>,
    pub roles: Vec<Role>,
    pub registration_status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
}

impl Person {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    pub fn is_approved(&self) -> bool {
        self.registration_status == RegistrationStatus::Approved
    }

    pub fn summary(&self) -> PersonSummary {
        PersonSummary {
            id: self.id,
            email: self.email.clone(),
            first_names: self.first_names.clone(),
            last_names: self.last_names.clone(),
        }
    }
}

/// Public view of a person, used in packages and depositor lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonSummary {
    pub id: Uuid,
    pub email: String,
    pub first_names: String,
    pub last_names: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(roles: Vec<Role>, status: RegistrationStatus) -> Person {
        Person {
            id: Uuid::new_v4(),
            email: "a@b.org".to_string(),
            first_names: "Ada".to_string(),
            last_names: "Lovelace".to_string(),
            phone_number: None,
            roles,
            registration_status: status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_text_encoding() {
        assert_eq!(Role::Admin.as_str(), "ADMIN");
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
        assert!("DEPOSITOR".parse::<Role>().is_err());
    }

    #[test]
    fn test_status_serde_matches_text() {
        let json = serde_json::to_string(&RegistrationStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
        assert_eq!(
            "DECLINED".parse::<RegistrationStatus>().unwrap(),
            RegistrationStatus::Declined
        );
    }

    #[test]
    fn test_admin_and_approval_checks() {
        let admin = person(vec![Role::User, Role::Admin], RegistrationStatus::Approved);
        assert!(admin.is_admin());
        assert!(admin.is_approved());

        let pending = person(vec![Role::User], RegistrationStatus::Pending);
        assert!(!pending.is_admin());
        assert!(!pending.is_approved());
    }
}
