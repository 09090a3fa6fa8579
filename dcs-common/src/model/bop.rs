//! Business Object Package: a serialized bundle of domain objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Collection, DataItem, MetadataFile, PersonSummary, Project};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessObjectPackage {
    pub created_at: DateTime<Utc>,
    pub projects: Vec<Project>,
    pub collections: Vec<Collection>,
    pub data_items: Vec<DataItem>,
    pub metadata_files: Vec<MetadataFile>,
    /// People referenced by the packaged objects, without credentials
    pub people: Vec<PersonSummary>,
}

impl BusinessObjectPackage {
    pub fn new() -> Self {
        Self {
            created_at: Utc::now(),
            projects: Vec::new(),
            collections: Vec::new(),
            data_items: Vec::new(),
            metadata_files: Vec::new(),
            people: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty() && self.collections.is_empty() && self.data_items.is_empty()
    }
}

impl Default for BusinessObjectPackage {
    fn default() -> Self {
        Self::new()
    }
}
