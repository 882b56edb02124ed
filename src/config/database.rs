//! Database configuration module for `stockkeeper`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the unique constraint on item names and the
//! foreign keys from ledger entries to items and principals come straight from the
//! Rust structs.

use crate::entities::{Item, LedgerEntry, Principal};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/stockkeeper.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Opens a connection to the given database URL.
///
/// For file-backed `SQLite` URLs the parent directory is created first so a fresh
/// checkout can start without manual setup.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(parent) = sqlite_file_parent(database_url) {
        std::fs::create_dir_all(parent)?;
    }
    debug!("Connecting to {}", database_url);
    Database::connect(database_url).await.map_err(Into::into)
}

fn sqlite_file_parent(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
}

/// Creates all tables (and the ledger timestamp index) if they do not exist yet.
///
/// Items and principals are created before ledger entries so the foreign keys
/// resolve.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut item_table = schema.create_table_from_entity(Item);
    let mut principal_table = schema.create_table_from_entity(Principal);
    let mut ledger_table = schema.create_table_from_entity(LedgerEntry);

    for table in [&mut item_table, &mut principal_table, &mut ledger_table] {
        table.if_not_exists();
        db.execute(builder.build(&*table)).await?;
    }

    for mut index in schema.create_index_from_entity(LedgerEntry) {
        index.if_not_exists();
        db.execute(builder.build(&index)).await?;
    }

    info!("Database tables ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ItemModel, LedgerEntryModel, PrincipalModel};
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<ItemModel> = Item::find().limit(1).all(&db).await?;
        let _: Vec<PrincipalModel> = Principal::find().limit(1).all(&db).await?;
        let _: Vec<LedgerEntryModel> = LedgerEntry::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[test]
    fn test_sqlite_file_parent() {
        assert_eq!(
            sqlite_file_parent("sqlite://data/stock.sqlite?mode=rwc"),
            Some(Path::new("data"))
        );
        assert_eq!(sqlite_file_parent("sqlite::memory:"), None);
        assert_eq!(sqlite_file_parent("sqlite://stock.sqlite"), None);
        assert_eq!(sqlite_file_parent("postgres://localhost/stock"), None);
    }
}
