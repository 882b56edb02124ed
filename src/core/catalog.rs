//! Item catalog - identity, price, visibility and image of each sellable item.
//!
//! The catalog never changes `quantity`; that column belongs to the stock
//! adjustment service. Every read goes to the store, so the quantity returned is
//! the one committed by the last adjustment.

use crate::{
    entities::{Item, item},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, SqlErr, prelude::*, sea_query::OnConflict};

/// Fetches an item by id.
///
/// # Errors
/// Returns `Error::NotFound` if no item has this id.
pub async fn get_item_by_id<C>(db: &C, item_id: i64) -> Result<item::Model>
where
    C: ConnectionTrait,
{
    Item::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "item",
            key: item_id.to_string(),
        })
}

/// Looks an item up by its exact (case-sensitive) name, including disabled items.
pub async fn get_item_by_name<C>(db: &C, name: &str) -> Result<Option<item::Model>>
where
    C: ConnectionTrait,
{
    Item::find()
        .filter(item::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates an item with zero stock.
///
/// The name is trimmed; it must be non-empty and not already taken.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only, or the price is not positive and finite
/// - An item with this name already exists (`Error::Conflict`)
/// - The database insert fails
pub async fn create_item<C>(db: &C, name: &str, price: f64) -> Result<item::Model>
where
    C: ConnectionTrait,
{
    let name = validate_name(name)?;
    validate_price(price)?;

    if get_item_by_name(db, name).await?.is_some() {
        return Err(Error::Conflict {
            name: name.to_string(),
        });
    }

    new_item(name, price)
        .insert(db)
        .await
        .map_err(|e| conflict_or_store(e, name))
}

/// Returns the item called `name`, creating it with zero stock if it is missing.
///
/// Uses an insert that ignores a name conflict and then re-reads, so two callers
/// racing on a brand-new name end up with the same row. The boolean is true when
/// this call created the item.
pub(crate) async fn find_or_create_item<C>(
    db: &C,
    name: &str,
    price: f64,
) -> Result<(item::Model, bool)>
where
    C: ConnectionTrait,
{
    if let Some(existing) = get_item_by_name(db, name).await? {
        return Ok((existing, false));
    }

    let inserted = Item::insert(new_item(name, price))
        .on_conflict(
            OnConflict::column(item::Column::Name)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    let item = get_item_by_name(db, name)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "item",
            key: name.to_string(),
        })?;
    Ok((item, inserted > 0))
}

/// Lists items that are not disabled, ordered by name.
pub async fn list_active_items<C>(db: &C) -> Result<Vec<item::Model>>
where
    C: ConnectionTrait,
{
    Item::find()
        .filter(item::Column::IsActive.eq(true))
        .order_by_asc(item::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists every item, disabled ones included, ordered by name.
pub async fn list_all_items<C>(db: &C) -> Result<Vec<item::Model>>
where
    C: ConnectionTrait,
{
    Item::find()
        .order_by_asc(item::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Replaces the item's image reference (`None` clears it).
///
/// The reference is stored as-is; validating the asset is the uploader's job.
pub async fn set_image_reference<C>(
    db: &C,
    item_id: i64,
    image_reference: Option<String>,
) -> Result<item::Model>
where
    C: ConnectionTrait,
{
    let mut item: item::ActiveModel = get_item_by_id(db, item_id).await?.into();
    item.image_reference = Set(image_reference);
    item.updated_at = Set(Utc::now());
    item.update(db).await.map_err(Into::into)
}

/// Shows or hides an item in default listings. Items are never hard-deleted.
pub async fn set_active<C>(db: &C, item_id: i64, is_active: bool) -> Result<item::Model>
where
    C: ConnectionTrait,
{
    let mut item: item::ActiveModel = get_item_by_id(db, item_id).await?.into();
    item.is_active = Set(is_active);
    item.updated_at = Set(Utc::now());
    item.update(db).await.map_err(Into::into)
}

/// Changes the unit price.
///
/// # Errors
/// Returns `Error::InvalidInput` for a non-positive or non-finite price and
/// `Error::NotFound` for an unknown item.
pub async fn update_price<C>(db: &C, item_id: i64, price: f64) -> Result<item::Model>
where
    C: ConnectionTrait,
{
    validate_price(price)?;
    let mut item: item::ActiveModel = get_item_by_id(db, item_id).await?.into();
    item.price = Set(price);
    item.updated_at = Set(Utc::now());
    item.update(db).await.map_err(Into::into)
}

/// The item's image reference, or `default_reference` when it has none.
#[must_use]
pub fn image_reference_or_default<'a>(item: &'a item::Model, default_reference: &'a str) -> &'a str {
    item.image_reference
        .as_deref()
        .filter(|reference| !reference.trim().is_empty())
        .unwrap_or(default_reference)
}

pub(crate) fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid("Item name cannot be empty"));
    }
    Ok(trimmed)
}

pub(crate) fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::invalid(format!(
            "Price must be a positive number, got {price}"
        )));
    }
    Ok(())
}

fn new_item(name: &str, price: f64) -> item::ActiveModel {
    let now = Utc::now();
    item::ActiveModel {
        name: Set(name.to_string()),
        price: Set(price),
        quantity: Set(0),
        is_active: Set(true),
        image_reference: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
}

fn conflict_or_store(err: DbErr, name: &str) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::Conflict {
            name: name.to_string(),
        },
        _ => err.into(),
    }
}
