//! Stock adjustment service - the only writer of `items.quantity`.
//!
//! Each adjustment runs in one database transaction: it validates, moves the
//! quantity with a guarded `UPDATE`, appends the matching ledger entry and
//! commits. If any step fails the transaction is rolled back, so the catalog
//! and the ledger never disagree.
//!
//! The quantity update is a compare-and-set on the row
//! (`UPDATE items SET quantity = quantity - n WHERE id = ? AND quantity >= n`).
//! Two concurrent sales of the last unit cannot both succeed: the second one
//! matches no row and is rejected as out of stock.

use crate::{
    core::{alert::LowStockAlert, catalog, ledger, ledger::NewLedgerEntry, principal},
    entities::{Item, MovementKind, item, ledger_entry},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, instrument, warn};

/// Result of a committed sale.
#[derive(Debug, Clone)]
pub struct SaleOutcome {
    /// The item as committed by the sale
    pub item: item::Model,
    /// The ledger entry recorded for the sale
    pub entry: ledger_entry::Model,
}

impl SaleOutcome {
    /// On-hand quantity after the sale.
    #[must_use]
    pub const fn new_quantity(&self) -> i64 {
        self.item.quantity
    }
}

/// Sells one unit of an item.
///
/// # Errors
/// - `Error::NotFound` if the item or principal does not exist
/// - `Error::OutOfStock` if the item has no stock left
/// - `Error::StoreUnavailable` if the transaction cannot be committed
///
/// Nothing is written when an error is returned.
pub async fn apply_sale(
    db: &DatabaseConnection,
    item_id: i64,
    principal_id: i64,
) -> Result<SaleOutcome> {
    apply_sale_units(db, item_id, principal_id, 1).await
}

/// Sells `units` of an item in one movement.
///
/// # Errors
/// Same as [`apply_sale`], plus `Error::InvalidInput` when `units` is not positive.
/// Selling more than is on hand is `Error::OutOfStock`.
#[instrument(skip(db))]
pub async fn apply_sale_units(
    db: &DatabaseConnection,
    item_id: i64,
    principal_id: i64,
    units: i64,
) -> Result<SaleOutcome> {
    if units <= 0 {
        return Err(Error::invalid(format!(
            "Sale quantity must be positive, got {units}"
        )));
    }

    let txn = db.begin().await?;

    let item = catalog::get_item_by_id(&txn, item_id).await?;
    principal::get_principal_by_id(&txn, principal_id).await?;

    if item.quantity < units {
        warn!(
            "Rejected sale of {} x '{}': only {} on hand",
            units, item.name, item.quantity
        );
        txn.rollback().await?;
        return Err(Error::OutOfStock {
            item: item.name,
            available: item.quantity,
            requested: units,
        });
    }

    let now = Utc::now();
    if !shift_quantity(&txn, item_id, -units, now).await? {
        // Another sale took the stock between our read and the guarded update.
        let available = catalog::get_item_by_id(&txn, item_id).await?.quantity;
        warn!(
            "Rejected sale of {} x '{}': stock changed concurrently, {} on hand",
            units, item.name, available
        );
        txn.rollback().await?;
        return Err(Error::OutOfStock {
            item: item.name,
            available,
            requested: units,
        });
    }

    let entry = ledger::append_entry(
        &txn,
        NewLedgerEntry::new(item_id, principal_id, -units, MovementKind::Sale).at(now),
    )
    .await?;
    let item = catalog::get_item_by_id(&txn, item_id).await?;

    txn.commit().await?;

    info!(
        "Sold {} x '{}' (entry {}), {} left",
        units, item.name, entry.id, item.quantity
    );
    Ok(SaleOutcome { item, entry })
}

/// Sells `units` of an item and then runs the low-stock alert.
///
/// The alert only runs after the sale has committed, and its outcome never
/// affects the returned result.
pub async fn sell_and_alert(
    db: &DatabaseConnection,
    alert: &LowStockAlert,
    item_id: i64,
    principal_id: i64,
    units: i64,
) -> Result<SaleOutcome> {
    let sale = apply_sale_units(db, item_id, principal_id, units).await?;
    alert.after_sale(&sale).await;
    Ok(sale)
}

/// Adds stock to the item called `item_name`, creating the item if needed.
///
/// A new item starts with zero stock and `unit_price` as its price; an existing
/// item keeps its price. Creation, the quantity increment and the ledger entry
/// share one transaction, so a failure leaves no item and no partial increment.
///
/// # Errors
/// - `Error::InvalidInput` if the name is blank, the quantity is not positive or
///   the price is not positive and finite
/// - `Error::NotFound` if the principal does not exist
/// - `Error::StoreUnavailable` if the transaction cannot be committed
#[instrument(skip(db))]
pub async fn apply_restock(
    db: &DatabaseConnection,
    item_name: &str,
    quantity_to_add: i64,
    unit_price: f64,
    principal_id: i64,
) -> Result<item::Model> {
    let item_name = catalog::validate_name(item_name)?;
    if quantity_to_add <= 0 {
        return Err(Error::invalid(format!(
            "Restock quantity must be positive, got {quantity_to_add}"
        )));
    }
    catalog::validate_price(unit_price)?;

    let txn = db.begin().await?;

    principal::get_principal_by_id(&txn, principal_id).await?;
    let (item, created) = catalog::find_or_create_item(&txn, item_name, unit_price).await?;

    if item.quantity.checked_add(quantity_to_add).is_none() {
        return Err(restock_overflow(&item, quantity_to_add));
    }

    let now = Utc::now();
    if !shift_quantity(&txn, item.id, quantity_to_add, now).await? {
        // Items are never deleted, so a miss means a concurrent restock filled it up.
        let item = catalog::get_item_by_id(&txn, item.id).await?;
        return Err(restock_overflow(&item, quantity_to_add));
    }

    let entry = ledger::append_entry(
        &txn,
        NewLedgerEntry::new(item.id, principal_id, quantity_to_add, MovementKind::Restock)
            .at(now),
    )
    .await?;
    let item = catalog::get_item_by_id(&txn, item.id).await?;

    txn.commit().await?;

    info!(
        "Restocked '{}' with {} (entry {}{}), now {}",
        item.name,
        quantity_to_add,
        entry.id,
        if created { ", new item" } else { "" },
        item.quantity
    );
    Ok(item)
}

fn restock_overflow(item: &item::Model, quantity_to_add: i64) -> Error {
    Error::invalid(format!(
        "Restocking {quantity_to_add} would overflow the quantity of '{}' ({} on hand)",
        item.name, item.quantity
    ))
}

/// Applies `delta` to the item's quantity unless the result would be negative or
/// overflow.
///
/// Returns false when no row matched, i.e. the item is gone, the stock is too low
/// or the stock is too high.
async fn shift_quantity(
    txn: &DatabaseTransaction,
    item_id: i64,
    delta: i64,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = Item::update_many()
        .col_expr(
            item::Column::Quantity,
            Expr::col(item::Column::Quantity).add(delta),
        )
        .col_expr(item::Column::UpdatedAt, Expr::value(now))
        .filter(item::Column::Id.eq(item_id))
        .filter(item::Column::Quantity.gte(-delta.min(0)))
        .filter(item::Column::Quantity.lte(i64::MAX - delta.max(0)))
        .exec(txn)
        .await?;
    Ok(result.rows_affected == 1)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::alert::{AlertOutcome, LOW_STOCK_THRESHOLD};
    use crate::core::ledger::{LedgerFilter, derived_quantity, entries_for_item, query_entries};
    use crate::notifier::Notifier;
    use crate::test_utils::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_restock_creates_item() -> Result<()> {
        let db = setup_test_db().await?;
        let principal = create_test_principal(&db, "clerk@example.com").await?;

        let item = apply_restock(&db, "Cola", 10, 1.50, principal.id).await?;

        assert_eq!(item.name, "Cola");
        assert_eq!(item.quantity, 10);
        assert_eq!(item.price, 1.50);

        let entries = entries_for_item(&db, item.id).await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].quantity_change, 10);
        assert_eq!(entries[0].kind, MovementKind::Restock);
        assert_eq!(entries[0].principal_id, principal.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_restocks_accumulate() -> Result<()> {
        let db = setup_test_db().await?;
        let principal = create_test_principal(&db, "clerk@example.com").await?;

        let first = apply_restock(&db, "Cola", 10, 1.50, principal.id).await?;
        let second = apply_restock(&db, "Cola", 6, 2.00, principal.id).await?;

        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 16);
        // price only changes through catalog::update_price
        assert_eq!(second.price, 1.50);
        assert_eq!(catalog::list_all_items(&db).await?.len(), 1);
        assert_eq!(derived_quantity(&db, second.id).await?, 16);
        Ok(())
    }

    #[tokio::test]
    async fn test_restock_rejects_invalid_input_without_writes() -> Result<()> {
        let db = setup_test_db().await?;
        let principal = create_test_principal(&db, "clerk@example.com").await?;

        for (name, quantity, price) in [
            ("Cola", 0, 1.5),
            ("Cola", -3, 1.5),
            ("Cola", 3, 0.0),
            ("Cola", 3, -1.0),
            ("Cola", 3, f64::NAN),
            ("  ", 3, 1.5),
        ] {
            let result = apply_restock(&db, name, quantity, price, principal.id).await;
            assert!(matches!(result, Err(Error::InvalidInput { .. })));
        }

        assert!(catalog::list_all_items(&db).await?.is_empty());
        assert!(query_entries(&db, &LedgerFilter::default()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_restock_unknown_principal_rolls_back() -> Result<()> {
        let db = setup_test_db().await?;

        let result = apply_restock(&db, "Cola", 10, 1.5, 404).await;

        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: "principal",
                ..
            })
        ));
        assert!(catalog::get_item_by_name(&db, "Cola").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_restock_ledger_failure_rolls_back_item_and_quantity() -> Result<()> {
        let db = setup_test_db().await?;
        let principal = create_test_principal(&db, "clerk@example.com").await?;
        let agua = apply_restock(&db, "Agua", 4, 1.0, principal.id).await?;
        db.execute_unprepared(
            "CREATE TRIGGER fail_ledger BEFORE INSERT ON ledger_entries \
             BEGIN SELECT RAISE(ABORT, 'ledger unavailable'); END",
        )
        .await?;

        // The item row is inserted before the ledger write fails.
        let result = apply_restock(&db, "Cola", 10, 1.5, principal.id).await;
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
        assert!(catalog::get_item_by_name(&db, "Cola").await?.is_none());

        let result = apply_restock(&db, "Agua", 6, 1.0, principal.id).await;
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
        assert_eq!(catalog::get_item_by_id(&db, agua.id).await?.quantity, 4);

        let entries = query_entries(&db, &LedgerFilter::default()).await?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].item_id, agua.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_restock_overflow_is_invalid_input() -> Result<()> {
        let db = setup_test_db().await?;
        let principal = create_test_principal(&db, "clerk@example.com").await?;
        let item = apply_restock(&db, "Cola", i64::MAX, 1.5, principal.id).await?;
        assert_eq!(item.quantity, i64::MAX);

        let result = apply_restock(&db, "Cola", 1, 1.5, principal.id).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));

        assert_eq!(catalog::get_item_by_id(&db, item.id).await?.quantity, i64::MAX);
        assert_eq!(entries_for_item(&db, item.id).await?.len(), 1);
        assert_eq!(catalog::list_all_items(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_sale_decrements_and_records() -> Result<()> {
        let (db, principal, item) = setup_with_stock("Cola", 10).await?;

        let sale = apply_sale(&db, item.id, principal.id).await?;

        assert_eq!(sale.new_quantity(), 9);
        assert_eq!(sale.entry.quantity_change, -1);
        assert_eq!(sale.entry.kind, MovementKind::Sale);
        assert_eq!(sale.entry.item_id, item.id);
        assert_eq!(sale.entry.principal_id, principal.id);
        assert_eq!(catalog::get_item_by_id(&db, item.id).await?.quantity, 9);
        assert!(sale.item.updated_at >= item.updated_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_sale_at_zero_is_out_of_stock() -> Result<()> {
        let (db, principal, item) = setup_with_stock("Cola", 1).await?;
        apply_sale(&db, item.id, principal.id).await?;

        let result = apply_sale(&db, item.id, principal.id).await;

        assert!(matches!(
            result,
            Err(Error::OutOfStock {
                available: 0,
                requested: 1,
                ..
            })
        ));
        assert_eq!(catalog::get_item_by_id(&db, item.id).await?.quantity, 0);
        assert_eq!(entries_for_item(&db, item.id).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_sale_unknown_item_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let principal = create_test_principal(&db, "clerk@example.com").await?;

        let result = apply_sale(&db, 77, principal.id).await;

        assert!(matches!(result, Err(Error::NotFound { entity: "item", .. })));
        assert!(query_entries(&db, &LedgerFilter::default()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_sale_unknown_principal_is_not_found() -> Result<()> {
        let (db, _principal, item) = setup_with_stock("Cola", 3).await?;

        let result = apply_sale(&db, item.id, 404).await;

        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: "principal",
                ..
            })
        ));
        assert_eq!(catalog::get_item_by_id(&db, item.id).await?.quantity, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_multi_unit_sale_bounds() -> Result<()> {
        let (db, principal, item) = setup_with_stock("Cola", 3).await?;

        let result = apply_sale_units(&db, item.id, principal.id, 0).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));

        let result = apply_sale_units(&db, item.id, principal.id, 4).await;
        assert!(matches!(
            result,
            Err(Error::OutOfStock {
                available: 3,
                requested: 4,
                ..
            })
        ));

        let sale = apply_sale_units(&db, item.id, principal.id, 3).await?;
        assert_eq!(sale.new_quantity(), 0);
        assert_eq!(sale.entry.quantity_change, -3);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() -> Result<()> {
        let (db, principal, item) = setup_with_stock("Cola", 7).await?;
        let db = Arc::new(db);
        let (item_id, principal_id) = (item.id, principal.id);
        let attempts = 20;

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..attempts {
            let db = Arc::clone(&db);
            tasks.spawn(async move { apply_sale(&db, item_id, principal_id).await });
        }

        let mut sold = 0;
        let mut out_of_stock = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap() {
                Ok(_) => sold += 1,
                Err(Error::OutOfStock { .. }) => out_of_stock += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(sold, 7);
        assert_eq!(out_of_stock, attempts - 7);
        assert_eq!(catalog::get_item_by_id(&*db, item.id).await?.quantity, 0);
        assert_eq!(derived_quantity(&*db, item.id).await?, 0);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_restocks_share_one_item() -> Result<()> {
        let db = setup_test_db().await?;
        let principal = create_test_principal(&db, "clerk@example.com").await?;
        let db = Arc::new(db);

        let principal_id = principal.id;
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let db = Arc::clone(&db);
            tasks.spawn(async move { apply_restock(&db, "Tonic", 2, 1.0, principal_id).await });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap()?;
        }

        let items = catalog::list_all_items(&*db).await?;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 16);
        Ok(())
    }

    #[tokio::test]
    async fn test_sell_and_alert_crosses_threshold() -> Result<()> {
        let (db, principal, item) = setup_with_stock("X", 6).await?;
        let notifier = Arc::new(RecordingNotifier::default());
        let alert = LowStockAlert::new(
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            "owner@example.com",
            LOW_STOCK_THRESHOLD,
        );

        // 6 -> 5: not below the threshold yet
        let sale = sell_and_alert(&db, &alert, item.id, principal.id, 1).await?;
        assert_eq!(sale.new_quantity(), 5);
        assert!(notifier.calls().is_empty());

        // 5 -> 4: alert
        let sale = sell_and_alert(&db, &alert, item.id, principal.id, 1).await?;
        assert_eq!(sale.new_quantity(), 4);
        assert_eq!(
            notifier.calls(),
            vec![("X".to_string(), 4, "owner@example.com".to_string())]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_notifier_failure_keeps_sale() -> Result<()> {
        let (db, principal, item) = setup_with_stock("X", 2).await?;
        let alert = LowStockAlert::new(Arc::new(FailingNotifier), "owner@example.com", 5);

        let sale = sell_and_alert(&db, &alert, item.id, principal.id, 1).await?;
        assert_eq!(alert.after_sale(&sale).await, AlertOutcome::Failed);
        assert_eq!(catalog::get_item_by_id(&db, item.id).await?.quantity, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_quantity_never_negative_over_mixed_sequence() -> Result<()> {
        let (db, principal, item) = setup_with_stock("Cola", 2).await?;

        for step in 0..12 {
            if step % 5 == 4 {
                apply_restock(&db, "Cola", 1, 1.5, principal.id).await?;
            } else {
                let _ = apply_sale(&db, item.id, principal.id).await;
            }
            let current = catalog::get_item_by_id(&db, item.id).await?;
            assert!(current.quantity >= 0);
            assert_eq!(derived_quantity(&db, item.id).await?, current.quantity);
        }
        Ok(())
    }
}
