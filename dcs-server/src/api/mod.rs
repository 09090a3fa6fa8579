//! HTTP API handlers for dcs-server
//!
//! JSON in, JSON out. Authentication is a bearer session token resolved by
//! [`session::session_middleware`]; errors use the [`crate::ApiError`] body.

pub mod auth;
pub mod collections;
pub mod deposits;
pub mod extract;
pub mod health;
pub mod items;
pub mod metadata_formats;
pub mod people;
pub mod projects;
pub mod session;

pub use auth::auth_routes;
pub use collections::collection_routes;
pub use deposits::deposit_routes;
pub use health::health_routes;
pub use items::item_routes;
pub use metadata_formats::metadata_format_routes;
pub use people::people_routes;
pub use projects::project_routes;
pub use session::{session_middleware, Session};
