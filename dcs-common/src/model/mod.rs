//! Domain model shared between the database layer and the HTTP API
//!
//! Relationships:
//! - Project 1:N Collection
//! - Collection 1:N DataItem
//! - Collection self-referential parent/child (forest within a project)
//! - Collection N:N authorized depositor Person

/// Declares `as_str` and `FromStr` for a unit-only enum stored as TEXT
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = crate::Error;

            fn from_str(s: &str) -> crate::Result<Self> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(crate::Error::Internal(format!(
                        concat!("Unknown ", stringify!($ty), ": {}"),
                        other
                    ))),
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use text_enum;

pub mod archive;
pub mod bop;
pub mod collection;
pub mod item;
pub mod metadata;
pub mod person;
pub mod project;

pub use archive::{IngestRecord, IngestStatus, ObjectType};
pub use bop::BusinessObjectPackage;
pub use collection::{Collection, CollectionDraft, ContactInfo, PersonName};
pub use item::{DataFile, DataItem, MetadataFile};
pub use metadata::{FormatTarget, MetadataFormat, MetadataFormatDraft};
pub use person::{PersonSummary, Person, RegistrationStatus, Role};
pub use project::{Project, ProjectDraft};
