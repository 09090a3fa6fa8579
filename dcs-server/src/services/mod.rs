//! Business services sitting between the HTTP handlers and the database

pub mod accounts;
pub mod archive;
pub mod authorization;
pub mod bop;
pub mod catalog;
pub mod deposit;
pub mod hierarchy;
pub mod metadata_validator;
