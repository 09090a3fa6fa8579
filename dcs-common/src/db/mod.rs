//! Database initialization, migrations and shared helpers

pub mod init;
pub mod migrations;
pub mod retry;
pub mod settings;

pub use init::init_database;
pub use migrations::{run_migrations, CURRENT_SCHEMA_VERSION};
pub use retry::retry_on_lock;
pub use settings::{get_setting, set_setting};
