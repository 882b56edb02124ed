//! Shared test utilities for `stockkeeper`.
//!
//! This module provides helpers for setting up an in-memory store, creating
//! principals and stocked items with sensible defaults, and notifier doubles.

use crate::{
    core::{catalog, principal, stock},
    entities,
    errors::{Error, Result},
    notifier::Notifier,
};
use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Mutex;

/// Creates an in-memory `SQLite` database with all tables initialized.
///
/// The pool is capped at one connection: every `sqlite::memory:` connection is
/// a separate database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Registers a principal with the given e-mail.
pub async fn create_test_principal(
    db: &DatabaseConnection,
    email: &str,
) -> Result<entities::principal::Model> {
    principal::register_principal(db, email).await
}

/// Creates an item with zero stock.
///
/// # Defaults
/// * price: 1.5
pub async fn create_test_item(db: &DatabaseConnection, name: &str) -> Result<entities::item::Model> {
    catalog::create_item(db, name, 1.5).await
}

/// Sets up a store holding one item restocked to `quantity`.
/// Returns (db, principal, item); the principal is `clerk@example.com`.
pub async fn setup_with_stock(
    name: &str,
    quantity: i64,
) -> Result<(
    DatabaseConnection,
    entities::principal::Model,
    entities::item::Model,
)> {
    let db = setup_test_db().await?;
    let principal = create_test_principal(&db, "clerk@example.com").await?;
    let item = stock::apply_restock(&db, name, quantity, 1.5, principal.id).await?;
    Ok((db, principal, item))
}

/// Notifier that remembers every alert it was asked to send.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<(String, i64, String)>>,
}

impl RecordingNotifier {
    /// Alerts received so far as (item name, quantity, recipient).
    pub fn calls(&self) -> Vec<(String, i64, String)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_low_stock(
        &self,
        item_name: &str,
        quantity: i64,
        recipient: &str,
    ) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((item_name.to_string(), quantity, recipient.to_string()));
        }
        Ok(())
    }
}

/// Notifier whose transport is always down.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify_low_stock(&self, _item_name: &str, _quantity: i64, _recipient: &str) -> Result<()> {
        Err(Error::NotifierFailure {
            message: "transport unavailable".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_setup_with_stock() -> Result<()> {
        let (db, principal, item) = setup_with_stock("Cola", 4).await?;
        assert_eq!(principal.email, "clerk@example.com");
        assert_eq!(item.quantity, 4);
        assert_eq!(catalog::get_item_by_id(&db, item.id).await?.quantity, 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_test_item_is_empty() -> Result<()> {
        let db = setup_test_db().await?;
        let item = create_test_item(&db, "Agua").await?;
        assert_eq!(item.quantity, 0);
        Ok(())
    }
}
