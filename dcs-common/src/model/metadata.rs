//! Metadata format registry entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::text_enum;
use crate::{Error, Result};

/// Which business object a format describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormatTarget {
    Collection,
    DataItem,
}

text_enum!(FormatTarget {
    Collection => "COLLECTION",
    DataItem => "DATA_ITEM",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataFormat {
    pub id: Uuid,
    pub name: String,
    pub version: String,
    pub schema_url: Option<String>,
    /// Expected local name of the document element
    pub root_element: String,
    /// Expected namespace URI of the document element (None = no namespace)
    pub namespace: Option<String>,
    pub applies_to: FormatTarget,
    /// When false, any well-formed document is accepted
    pub validates: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataFormatDraft {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub schema_url: Option<String>,
    pub root_element: String,
    #[serde(default)]
    pub namespace: Option<String>,
    pub applies_to: FormatTarget,
    #[serde(default = "default_validates")]
    pub validates: bool,
}

fn default_validates() -> bool {
    true
}

impl MetadataFormatDraft {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.version.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Metadata format name and version are required".to_string(),
            ));
        }
        let root = self.root_element.trim();
        if root.is_empty() || root.contains(|c: char| c.is_whitespace() || c == '<' || c == '>') {
            return Err(Error::InvalidInput(format!(
                "Invalid root element name: {:?}",
                self.root_element
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validates_defaults_to_true() {
        let draft: MetadataFormatDraft = serde_json::from_str(
            r#"{"name": "FGDC", "version": "1998", "root_element": "metadata",
                "applies_to": "COLLECTION"}"#,
        )
        .unwrap();
        assert!(draft.validates);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_bad_root_element_rejected() {
        let draft: MetadataFormatDraft = serde_json::from_str(
            r#"{"name": "x", "version": "1", "root_element": "<meta data>",
                "applies_to": "DATA_ITEM"}"#,
        )
        .unwrap();
        assert!(draft.validate().is_err());
    }
}
