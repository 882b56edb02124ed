//! Sales aggregation over a date range.
//!
//! This module groups sale entries from the ledger into per-item, per-principal
//! totals and per-item statistics. All functions are framework-agnostic and
//! return structured data that the front end formats.

use crate::{
    core::{
        catalog,
        ledger::{self, LedgerFilter},
        period::DateRange,
    },
    entities::{Item, MovementKind, Principal, item, ledger_entry, principal},
    errors::Result,
};
use sea_orm::{ConnectionTrait, prelude::*};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Units one principal sold of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesLine {
    /// Item id
    pub item_id: i64,
    /// Item name
    pub item_name: String,
    /// E-mail of the principal who sold the units
    pub principal_email: String,
    /// Units sold, always positive
    pub total_units: i64,
}

/// Aggregated sales for a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesSummary {
    /// Range the summary covers
    pub range: DateRange,
    /// One line per (item, principal) pair, largest first
    pub per_item: Vec<SalesLine>,
    /// Sum of all lines
    pub total_units: i64,
    /// Item of the largest line; ties go to the alphabetically first item name
    pub top_item_by_units: Option<String>,
}

/// Units sold of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSales {
    /// Item id
    pub item_id: i64,
    /// Item name
    pub item_name: String,
    /// Units sold in the range
    pub units: i64,
}

/// Item and principal records referenced by a batch of ledger entries.
///
/// Relationships are resolved with explicit `IN (...)` queries, and ids already
/// loaded are not fetched again.
#[derive(Debug, Default)]
pub(crate) struct NameDirectory {
    items: HashMap<i64, item::Model>,
    principals: HashMap<i64, principal::Model>,
}

impl NameDirectory {
    /// Loads any items and principals referenced by `entries` that are not known yet.
    pub(crate) async fn extend_for<C>(&mut self, db: &C, entries: &[ledger_entry::Model]) -> Result<()>
    where
        C: ConnectionTrait,
    {
        let missing_items: HashSet<i64> = entries
            .iter()
            .map(|entry| entry.item_id)
            .filter(|id| !self.items.contains_key(id))
            .collect();
        if !missing_items.is_empty() {
            let items = Item::find()
                .filter(item::Column::Id.is_in(missing_items))
                .all(db)
                .await?;
            self.items.extend(items.into_iter().map(|item| (item.id, item)));
        }

        let missing_principals: HashSet<i64> = entries
            .iter()
            .map(|entry| entry.principal_id)
            .filter(|id| !self.principals.contains_key(id))
            .collect();
        if !missing_principals.is_empty() {
            let principals = Principal::find()
                .filter(principal::Column::Id.is_in(missing_principals))
                .all(db)
                .await?;
            self.principals
                .extend(principals.into_iter().map(|p| (p.id, p)));
        }
        Ok(())
    }

    pub(crate) fn item(&self, item_id: i64) -> Option<&item::Model> {
        self.items.get(&item_id)
    }

    pub(crate) fn item_name(&self, item_id: i64) -> String {
        self.items
            .get(&item_id)
            .map_or_else(|| format!("#{item_id}"), |item| item.name.clone())
    }

    pub(crate) fn principal_email(&self, principal_id: i64) -> String {
        self.principals
            .get(&principal_id)
            .map_or_else(|| format!("#{principal_id}"), |p| p.email.clone())
    }
}

/// Computes the sales summary for `range`.
///
/// # Errors
/// Returns a store error if the ledger or catalog cannot be read.
pub async fn sales_summary<C>(db: &C, range: DateRange) -> Result<SalesSummary>
where
    C: ConnectionTrait,
{
    let entries = ledger::query_entries(
        db,
        &LedgerFilter::default()
            .of_kind(MovementKind::Sale)
            .within(range),
    )
    .await?;

    let mut names = NameDirectory::default();
    names.extend_for(db, &entries).await?;
    Ok(summarize_sales(range, &entries, &names))
}

/// Groups sale entries by (item, principal) and sums absolute units.
pub(crate) fn summarize_sales(
    range: DateRange,
    entries: &[ledger_entry::Model],
    names: &NameDirectory,
) -> SalesSummary {
    let mut groups: BTreeMap<(i64, i64), i64> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.kind == MovementKind::Sale) {
        *groups.entry((entry.item_id, entry.principal_id)).or_default() +=
            entry.quantity_change.abs();
    }

    let mut per_item: Vec<SalesLine> = groups
        .into_iter()
        .map(|((item_id, principal_id), total_units)| SalesLine {
            item_id,
            item_name: names.item_name(item_id),
            principal_email: names.principal_email(principal_id),
            total_units,
        })
        .collect();
    per_item.sort_by(|a, b| {
        b.total_units
            .cmp(&a.total_units)
            .then_with(|| a.item_name.cmp(&b.item_name))
            .then_with(|| a.principal_email.cmp(&b.principal_email))
    });

    let total_units = per_item.iter().map(|line| line.total_units).sum();
    let top_item_by_units = per_item.first().map(|line| line.item_name.clone());

    SalesSummary {
        range,
        per_item,
        total_units,
        top_item_by_units,
    }
}

/// Units sold per active item in `range`, including items with no sales.
///
/// Ordered by units (largest first), then by name.
pub async fn item_sales_totals<C>(db: &C, range: DateRange) -> Result<Vec<ItemSales>>
where
    C: ConnectionTrait,
{
    let entries = ledger::query_entries(
        db,
        &LedgerFilter::default()
            .of_kind(MovementKind::Sale)
            .within(range),
    )
    .await?;

    let mut sold: HashMap<i64, i64> = HashMap::new();
    for entry in &entries {
        *sold.entry(entry.item_id).or_default() += entry.quantity_change.abs();
    }

    let mut totals: Vec<ItemSales> = catalog::list_active_items(db)
        .await?
        .into_iter()
        .map(|item| ItemSales {
            units: sold.get(&item.id).copied().unwrap_or_default(),
            item_id: item.id,
            item_name: item.name,
        })
        .collect();
    totals.sort_by(|a, b| {
        b.units
            .cmp(&a.units)
            .then_with(|| a.item_name.cmp(&b.item_name))
    });
    Ok(totals)
}

/// Formats a money amount with the currency symbol and two decimals.
///
/// Returns strings like "$1.50" or "-$0.25".
#[must_use]
pub fn format_money(currency_symbol: &str, amount: f64) -> String {
    if amount < 0.0 {
        format!("-{currency_symbol}{:.2}", amount.abs())
    } else {
        format!("{currency_symbol}{amount:.2}")
    }
}
