/// Database connection and schema creation
pub mod database;

/// Application settings from `stockkeeper.toml` and the environment
pub mod settings;

pub use settings::{Settings, load_settings};
