//! Metadata document checks
//!
//! A document passes when it is well-formed XML with exactly one document
//! element, and (for formats with validation enabled) that element's local
//! name and namespace match the registered format. Schema-level validation
//! is not performed.

use dcs_common::model::MetadataFormat;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Document is not well-formed XML at byte {position}: {reason}")]
    Malformed { position: usize, reason: String },

    #[error("Document has no root element")]
    Empty,

    #[error("Expected root element <{expected}>, found <{found}>")]
    WrongRoot { expected: String, found: String },

    #[error("Expected namespace {expected:?}, found {found:?}")]
    WrongNamespace {
        expected: Option<String>,
        found: Option<String>,
    },
}

/// The document element of a well-formed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootElement {
    pub local_name: String,
    pub namespace: Option<String>,
}

fn malformed(position: usize, reason: impl Into<String>) -> ValidationError {
    ValidationError::Malformed {
        position,
        reason: reason.into(),
    }
}

fn root_of(
    position: usize,
    ns: ResolveResult<'_>,
    start: &BytesStart<'_>,
) -> Result<RootElement, ValidationError> {
    let namespace = match ns {
        ResolveResult::Bound(ns) => Some(
            std::str::from_utf8(ns.as_ref())
                .map_err(|e| malformed(position, e.to_string()))?
                .to_string(),
        ),
        ResolveResult::Unbound => None,
        ResolveResult::Unknown(prefix) => {
            return Err(malformed(
                position,
                format!("undeclared namespace prefix {:?}", String::from_utf8_lossy(&prefix)),
            ))
        }
    };
    let local_name = std::str::from_utf8(start.local_name().as_ref())
        .map_err(|e| malformed(position, e.to_string()))?
        .to_string();

    Ok(RootElement {
        local_name,
        namespace,
    })
}

/// Parse the whole document and return its root element
pub fn check_well_formed(document: &[u8]) -> Result<RootElement, ValidationError> {
    let mut reader = NsReader::from_reader(document);
    reader.trim_text(true);

    let mut depth: usize = 0;
    let mut root: Option<RootElement> = None;

    loop {
        let position = reader.buffer_position();
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| malformed(position, e.to_string()))?;

        match event {
            Event::Start(ref start) | Event::Empty(ref start) => {
                if depth == 0 {
                    if root.is_some() {
                        return Err(malformed(position, "more than one root element"));
                    }
                    root = Some(root_of(position, ns, start)?);
                }
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            }
            Event::End(_) => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| malformed(position, "unexpected closing tag"))?;
            }
            Event::Text(ref text) if depth == 0 => {
                if !text.iter().all(u8::is_ascii_whitespace) {
                    return Err(malformed(position, "text outside the root element"));
                }
            }
            Event::CData(_) if depth == 0 => {
                return Err(malformed(position, "CDATA outside the root element"));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(malformed(reader.buffer_position(), "unclosed element at end of document"));
    }

    root.ok_or(ValidationError::Empty)
}

/// Check a document against a registered format
pub fn validate(format: &MetadataFormat, document: &[u8]) -> Result<RootElement, ValidationError> {
    let root = check_well_formed(document)?;

    if !format.validates {
        return Ok(root);
    }

    if root.local_name != format.root_element.trim() {
        return Err(ValidationError::WrongRoot {
            expected: format.root_element.trim().to_string(),
            found: root.local_name,
        });
    }

    let expected_ns = format
        .namespace
        .as_deref()
        .map(str::trim)
        .filter(|ns| !ns.is_empty());
    if root.namespace.as_deref() != expected_ns {
        return Err(ValidationError::WrongNamespace {
            expected: expected_ns.map(str::to_string),
            found: root.namespace,
        });
    }

    Ok(root)
}
