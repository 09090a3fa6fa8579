//! # DCS Common Library
//!
//! Shared code for the Data Conservancy deposit service:
//! - Error type and result alias
//! - Configuration loading and root folder resolution
//! - Database schema initialization and migrations
//! - Password and session token primitives
//! - Domain model (people, projects, collections, data items, archive records)

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod model;
pub mod time;

pub use error::{Error, Result};
