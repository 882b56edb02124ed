//! Item entity - A sellable beverage in the catalog.
//!
//! `quantity` is the denormalized on-hand count. It is only ever changed by the
//! stock adjustment service, together with a matching ledger entry.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique, case-sensitive display name (e.g., "Cola")
    #[sea_orm(unique)]
    pub name: String,
    /// Current unit price
    pub price: f64,
    /// On-hand quantity, never negative
    pub quantity: i64,
    /// Disabled items stay in the database but are hidden from default listings
    pub is_active: bool,
    /// Opaque pointer to an externally managed image asset
    pub image_reference: Option<String>,
    /// When the item was created
    pub created_at: DateTimeUtc,
    /// When any field of the item last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Item and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One item has many ledger entries
    #[sea_orm(has_many = "super::ledger_entry::Entity")]
    LedgerEntries,
}

impl Related<super::ledger_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
