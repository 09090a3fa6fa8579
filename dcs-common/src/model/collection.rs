//! Collections and their descriptive metadata

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A creator credited on a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub given_names: String,
    pub family_names: String,
    #[serde(default)]
    pub middle_names: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
}

/// Point of contact for a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    pub project_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub summary: String,
    pub citable_locator: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub creators: Vec<PersonName>,
    pub contact_info: Vec<ContactInfo>,
    pub alternate_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Create/update payload for a collection
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionDraft {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub citable_locator: Option<String>,
    #[serde(default)]
    pub publication_date: Option<NaiveDate>,
    #[serde(default)]
    pub creators: Vec<PersonName>,
    #[serde(default)]
    pub contact_info: Vec<ContactInfo>,
    #[serde(default)]
    pub alternate_ids: Vec<String>,
}

impl CollectionDraft {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("Collection title is required".to_string()));
        }
        if self.summary.trim().is_empty() {
            return Err(Error::InvalidInput("Collection summary is required".to_string()));
        }
        for creator in &self.creators {
            if creator.given_names.trim().is_empty() && creator.family_names.trim().is_empty() {
                return Err(Error::InvalidInput("Creator name cannot be empty".to_string()));
            }
        }
        if self.alternate_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(Error::InvalidInput("Alternate ids cannot be blank".to_string()));
        }
        Ok(())
    }
}
