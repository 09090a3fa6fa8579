//! Research projects

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A funded research project owning collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Principal investigators; they administer the project
    pub pi_ids: Vec<Uuid>,
    pub funding_entity: Option<String>,
    pub award_numbers: Vec<String>,
    /// Storage quota in bytes (0 = unlimited)
    pub storage_allocated: i64,
    pub storage_used: i64,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn is_pi(&self, person_id: Uuid) -> bool {
        self.pi_ids.contains(&person_id)
    }

    /// Whether `additional` more bytes fit in the quota
    pub fn has_capacity_for(&self, additional: i64) -> bool {
        self.storage_allocated == 0 || self.storage_used + additional <= self.storage_allocated
    }
}

/// Create/update payload for a project
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub pi_ids: Vec<Uuid>,
    pub funding_entity: Option<String>,
    #[serde(default)]
    pub award_numbers: Vec<String>,
    #[serde(default)]
    pub storage_allocated: i64,
}

impl ProjectDraft {
    /// Field-level checks that need no database access
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("Project name is required".to_string()));
        }
        if self.pi_ids.is_empty() {
            return Err(Error::InvalidInput(
                "A project needs at least one principal investigator".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(Error::InvalidInput(format!(
                    "End date {} is before start date {}",
                    end, start
                )));
            }
        }
        if self.storage_allocated < 0 {
            return Err(Error::InvalidInput(
                "storage_allocated cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProjectDraft {
        ProjectDraft {
            name: "Seafloor Survey".to_string(),
            description: String::new(),
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 31),
            pi_ids: vec![Uuid::new_v4()],
            funding_entity: Some("NSF".to_string()),
            award_numbers: vec!["OCE-1234".to_string()],
            storage_allocated: 0,
        }
    }

    #[test]
    fn test_valid_draft() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut d = draft();
        d.name = "   ".to_string();
        assert!(matches!(d.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let mut d = draft();
        d.end_date = NaiveDate::from_ymd_opt(2022, 6, 1);
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_missing_pi_rejected() {
        let mut d = draft();
        d.pi_ids.clear();
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_quota() {
        let mut p = Project {
            id: Uuid::new_v4(),
            name: "p".to_string(),
            description: String::new(),
            start_date: None,
            end_date: None,
            pi_ids: vec![],
            funding_entity: None,
            award_numbers: vec![],
            storage_allocated: 0,
            storage_used: 500,
            created_at: Utc::now(),
        };
        assert!(p.has_capacity_for(i64::MAX / 2));

        p.storage_allocated = 1000;
        assert!(p.has_capacity_for(500));
        assert!(!p.has_capacity_for(501));
    }
}
