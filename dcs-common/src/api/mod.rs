//! Shared primitives for the HTTP API
//!
//! This module contains ONLY pure functions and shared types, no HTTP
//! framework dependencies. The server wraps these with axum middleware.

pub mod auth;

pub use auth::{
    generate_salt, generate_session_token, hash_password, hash_session_token, verify_password,
    MIN_PASSWORD_LEN,
};
