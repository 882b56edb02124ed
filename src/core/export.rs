//! CSV export of sales and stock movements.
//!
//! Exports stream ledger pages through a [`NameDirectory`] so that item and
//! principal records are fetched once per batch rather than once per row. The
//! header row is always written, so an empty range still yields a valid file.

use crate::{
    core::{
        ledger::{self, LedgerFilter},
        period::DateRange,
        report::{NameDirectory, format_money},
    },
    entities::{MovementKind, ledger_entry},
    errors::{Error, Result},
};
use csv::{Writer, WriterBuilder};
use sea_orm::ConnectionTrait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Timestamp layout used in every export column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const PAGE_SIZE: u64 = 200;

const SALES_HEADER: [&str; 6] = [
    "Item",
    "Quantity",
    "Principal",
    "Timestamp",
    "Unit Price",
    "Total",
];

const MOVEMENTS_HEADER: [&str; 5] = ["Item", "Kind", "Quantity", "Principal", "Timestamp"];

/// A rendered export document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    /// Suggested file name, e.g. `sales_20240101-20240131.csv`
    pub filename: String,
    /// CSV text including the header row
    pub content: String,
    /// Number of data rows (header excluded)
    pub rows: usize,
}

/// Builds `<prefix>_<first day>-<last day>.csv` for a range.
#[must_use]
pub fn export_filename(prefix: &str, range: &DateRange) -> String {
    format!(
        "{prefix}_{}-{}.csv",
        range.first_day().format("%Y%m%d"),
        range.last_day().format("%Y%m%d")
    )
}

/// Exports sale entries in `range`, newest first.
///
/// Unit price is the item's current price at export time; the total is
/// `quantity * price`.
///
/// # Errors
/// Returns a store error if the ledger cannot be read, or `Error::Export` if the
/// CSV cannot be produced.
pub async fn export_sales<C>(db: &C, range: DateRange, currency_symbol: &str) -> Result<CsvExport>
where
    C: ConnectionTrait,
{
    let filter = LedgerFilter::default()
        .of_kind(MovementKind::Sale)
        .within(range);
    let mut writer = csv_writer(&SALES_HEADER)?;
    let mut names = NameDirectory::default();
    let mut rows = 0;

    let mut pages = ledger::query_entries_paged(db, &filter, PAGE_SIZE);
    while let Some(page) = pages.next_page().await? {
        names.extend_for(db, &page).await?;
        for entry in &page {
            let quantity = entry.quantity_change.abs();
            let price = names.item(entry.item_id).map_or(0.0, |item| item.price);
            #[allow(clippy::cast_precision_loss)]
            let total = quantity as f64 * price;
            writer.write_record([
                names.item_name(entry.item_id),
                quantity.to_string(),
                names.principal_email(entry.principal_id),
                format_timestamp(entry),
                format_money(currency_symbol, price),
                format_money(currency_symbol, total),
            ])?;
            rows += 1;
        }
    }

    finish("sales", &range, writer, rows)
}

/// Exports sale and restock entries in `range`, newest first, without prices.
///
/// # Errors
/// Returns a store error if the ledger cannot be read, or `Error::Export` if the
/// CSV cannot be produced.
pub async fn export_movements<C>(db: &C, range: DateRange) -> Result<CsvExport>
where
    C: ConnectionTrait,
{
    let filter = LedgerFilter::default().within(range);
    let mut writer = csv_writer(&MOVEMENTS_HEADER)?;
    let mut names = NameDirectory::default();
    let mut rows = 0;

    let mut pages = ledger::query_entries_paged(db, &filter, PAGE_SIZE);
    while let Some(page) = pages.next_page().await? {
        names.extend_for(db, &page).await?;
        for entry in &page {
            writer.write_record([
                names.item_name(entry.item_id),
                entry.kind.label().to_string(),
                entry.quantity_change.abs().to_string(),
                names.principal_email(entry.principal_id),
                format_timestamp(entry),
            ])?;
            rows += 1;
        }
    }

    finish("movements", &range, writer, rows)
}

/// Writes an export into `dir`, creating the directory if needed.
///
/// # Errors
/// Returns `Error::Io` if the directory or file cannot be written.
pub fn write_export(dir: &Path, export: &CsvExport) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&export.filename);
    std::fs::write(&path, &export.content)?;
    info!("Wrote {} rows to {}", export.rows, path.display());
    Ok(path)
}

fn format_timestamp(entry: &ledger_entry::Model) -> String {
    entry.timestamp.format(TIMESTAMP_FORMAT).to_string()
}

fn csv_writer(header: &[&str]) -> Result<Writer<Vec<u8>>> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(header)?;
    Ok(writer)
}

fn finish(prefix: &str, range: &DateRange, writer: Writer<Vec<u8>>, rows: usize) -> Result<CsvExport> {
    let bytes = writer.into_inner().map_err(|e| Error::Export {
        message: format!("CSV writer error: {e}"),
    })?;
    let content = String::from_utf8(bytes).map_err(|e| Error::Export {
        message: format!("UTF-8 conversion error: {e}"),
    })?;
    debug!("Rendered {prefix} export with {rows} rows");
    Ok(CsvExport {
        filename: export_filename(prefix, range),
        content,
        rows,
    })
}
