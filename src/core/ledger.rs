//! Ledger - the append-only record of stock movements.
//!
//! Entries are inserted and read, never updated or deleted. Business rules such as
//! "quantity must not go negative" are enforced by the stock adjustment service
//! before it appends; the ledger itself only stores what it is given.

use crate::{
    core::period::{DEFAULT_WINDOW_DAYS, DateRange, RangeEnd},
    entities::{Item, LedgerEntry, MovementKind, ledger_entry},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Condition, QueryOrder, QuerySelect, Select, Set, prelude::*};
use std::collections::HashMap;
use tracing::debug;

/// A movement about to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    /// Item whose stock moves
    pub item_id: i64,
    /// Principal the movement is attributed to
    pub principal_id: i64,
    /// Signed change, negative for sales
    pub quantity_change: i64,
    /// Sale or restock
    pub kind: MovementKind,
    /// Recording time
    pub timestamp: DateTime<Utc>,
}

impl NewLedgerEntry {
    /// A movement recorded now.
    #[must_use]
    pub fn new(item_id: i64, principal_id: i64, quantity_change: i64, kind: MovementKind) -> Self {
        Self {
            item_id,
            principal_id,
            quantity_change,
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Overrides the recording time.
    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Appends one entry and returns it with its assigned id.
///
/// # Errors
/// Returns `Error::InvalidInput` for a zero change, or a store error if the item
/// or principal reference is dangling.
pub async fn append_entry<C>(db: &C, entry: NewLedgerEntry) -> Result<ledger_entry::Model>
where
    C: ConnectionTrait,
{
    if entry.quantity_change == 0 {
        return Err(Error::invalid("Ledger entries must change the quantity"));
    }

    let model = ledger_entry::ActiveModel {
        item_id: Set(entry.item_id),
        principal_id: Set(entry.principal_id),
        quantity_change: Set(entry.quantity_change),
        kind: Set(entry.kind),
        timestamp: Set(entry.timestamp),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Criteria for reading the ledger. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerFilter {
    /// Only entries for this item
    pub item_id: Option<i64>,
    /// Only entries by this principal
    pub principal_id: Option<i64>,
    /// Only entries of this kind
    pub kind: Option<MovementKind>,
    /// Time window; the trailing 30 days when absent
    pub range: Option<DateRange>,
}

impl LedgerFilter {
    /// Restricts to one item.
    #[must_use]
    pub const fn for_item(mut self, item_id: i64) -> Self {
        self.item_id = Some(item_id);
        self
    }

    /// Restricts to one principal.
    #[must_use]
    pub const fn by_principal(mut self, principal_id: i64) -> Self {
        self.principal_id = Some(principal_id);
        self
    }

    /// Restricts to one movement kind.
    #[must_use]
    pub const fn of_kind(mut self, kind: MovementKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restricts to a time window.
    #[must_use]
    pub const fn within(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    /// The window this filter reads, resolving the default against `now`.
    #[must_use]
    pub fn range_or_default(&self, now: DateTime<Utc>) -> DateRange {
        self.range
            .unwrap_or_else(|| DateRange::trailing_days(DEFAULT_WINDOW_DAYS, now))
    }

    fn select(&self, now: DateTime<Utc>) -> Select<LedgerEntry> {
        let range = self.range_or_default(now);
        let mut select = LedgerEntry::find().filter(ledger_entry::Column::Timestamp.gte(range.start));
        select = match range.end {
            RangeEnd::Inclusive(end) => select.filter(ledger_entry::Column::Timestamp.lte(end)),
            RangeEnd::Exclusive(end) => select.filter(ledger_entry::Column::Timestamp.lt(end)),
        };
        if let Some(item_id) = self.item_id {
            select = select.filter(ledger_entry::Column::ItemId.eq(item_id));
        }
        if let Some(principal_id) = self.principal_id {
            select = select.filter(ledger_entry::Column::PrincipalId.eq(principal_id));
        }
        if let Some(kind) = self.kind {
            select = select.filter(ledger_entry::Column::Kind.eq(kind));
        }
        newest_first(select)
    }
}

/// Reads all entries matching `filter`, newest first.
pub async fn query_entries<C>(db: &C, filter: &LedgerFilter) -> Result<Vec<ledger_entry::Model>>
where
    C: ConnectionTrait,
{
    let entries = filter.select(Utc::now()).all(db).await?;
    debug!("Ledger query {:?} returned {} entries", filter, entries.len());
    Ok(entries)
}

/// Lazily reads entries matching `filter`, newest first, `page_size` at a time.
///
/// The window is resolved when this is called, so later pages use the same bounds.
pub fn query_entries_paged<'db, C>(
    db: &'db C,
    filter: &LedgerFilter,
    page_size: u64,
) -> LedgerPages<'db, C>
where
    C: ConnectionTrait,
{
    let range = filter.range_or_default(Utc::now());
    LedgerPages {
        db,
        filter: filter.clone().within(range),
        page_size: page_size.max(1),
        cursor: None,
        exhausted: false,
    }
}

/// Page-by-page walk over the ledger, newest first.
///
/// Each page continues after the `(timestamp, id)` of the last entry returned, so
/// entries appended during the walk never shift rows between pages.
#[derive(Debug)]
pub struct LedgerPages<'db, C> {
    db: &'db C,
    filter: LedgerFilter,
    page_size: u64,
    cursor: Option<(DateTime<Utc>, i64)>,
    exhausted: bool,
}

impl<C> LedgerPages<'_, C>
where
    C: ConnectionTrait,
{
    /// Fetches the next page, or `None` once every matching entry has been returned.
    pub async fn next_page(&mut self) -> Result<Option<Vec<ledger_entry::Model>>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut select = self.filter.select(Utc::now());
        if let Some((timestamp, id)) = self.cursor {
            select = select.filter(
                Condition::any()
                    .add(ledger_entry::Column::Timestamp.lt(timestamp))
                    .add(
                        Condition::all()
                            .add(ledger_entry::Column::Timestamp.eq(timestamp))
                            .add(ledger_entry::Column::Id.lt(id)),
                    ),
            );
        }
        let page = select.limit(self.page_size).all(self.db).await?;

        if u64::try_from(page.len()).unwrap_or(u64::MAX) < self.page_size {
            self.exhausted = true;
        }
        let Some(last) = page.last() else {
            return Ok(None);
        };
        self.cursor = Some((last.timestamp, last.id));
        Ok(Some(page))
    }
}

/// Every entry ever recorded for an item, newest first.
pub async fn entries_for_item<C>(db: &C, item_id: i64) -> Result<Vec<ledger_entry::Model>>
where
    C: ConnectionTrait,
{
    newest_first(LedgerEntry::find().filter(ledger_entry::Column::ItemId.eq(item_id)))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Replays the item's entries from the beginning and returns the resulting quantity.
pub async fn derived_quantity<C>(db: &C, item_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    let entries = LedgerEntry::find()
        .filter(ledger_entry::Column::ItemId.eq(item_id))
        .order_by_asc(ledger_entry::Column::Timestamp)
        .order_by_asc(ledger_entry::Column::Id)
        .all(db)
        .await?;
    Ok(entries.iter().map(|entry| entry.quantity_change).sum())
}

/// An item whose stored quantity disagrees with its ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantityMismatch {
    /// Item id
    pub item_id: i64,
    /// Item name
    pub item_name: String,
    /// Quantity stored on the item
    pub stored: i64,
    /// Sum of the item's ledger entries
    pub derived: i64,
}

/// Compares every item's quantity with the sum of its ledger entries.
///
/// Returns the mismatches; an empty list means the catalog and ledger agree.
pub async fn reconcile<C>(db: &C) -> Result<Vec<QuantityMismatch>>
where
    C: ConnectionTrait,
{
    let mut derived: HashMap<i64, i64> = HashMap::new();
    for entry in LedgerEntry::find().all(db).await? {
        *derived.entry(entry.item_id).or_default() += entry.quantity_change;
    }

    let mismatches: Vec<QuantityMismatch> = Item::find()
        .all(db)
        .await?
        .into_iter()
        .filter_map(|item| {
            let sum = derived.get(&item.id).copied().unwrap_or_default();
            (sum != item.quantity).then(|| QuantityMismatch {
                item_id: item.id,
                item_name: item.name,
                stored: item.quantity,
                derived: sum,
            })
        })
        .collect();
    Ok(mismatches)
}

fn newest_first(select: Select<LedgerEntry>) -> Select<LedgerEntry> {
    select
        .order_by_desc(ledger_entry::Column::Timestamp)
        .order_by_desc(ledger_entry::Column::Id)
}
