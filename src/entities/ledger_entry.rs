//! Ledger entry entity - One immutable stock movement.
//!
//! Each entry has an `item_id`, the `principal_id` who caused it, a signed
//! `quantity_change` (negative for a sale, positive for a restock), its `kind`
//! and the `timestamp` used for sorting and filtering in every report.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of a stock movement
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MovementKind {
    /// Units leaving stock
    #[sea_orm(string_value = "sale")]
    Sale,
    /// Units entering stock
    #[sea_orm(string_value = "restock")]
    Restock,
}

impl MovementKind {
    /// Human-readable label used in exports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sale => "Sale",
            Self::Restock => "Restock",
        }
    }
}

/// Ledger entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    /// Creation-ordered identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Item whose stock moved
    #[sea_orm(indexed)]
    pub item_id: i64,
    /// Principal who caused the movement
    pub principal_id: i64,
    /// Signed, non-zero change applied to the item's quantity
    pub quantity_change: i64,
    /// `sale` or `restock`
    pub kind: MovementKind,
    /// When the movement was recorded
    #[sea_orm(indexed)]
    pub timestamp: DateTimeUtc,
}

/// Defines relationships between LedgerEntry and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one item
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
    /// Each entry is attributed to one principal
    #[sea_orm(
        belongs_to = "super::principal::Entity",
        from = "Column::PrincipalId",
        to = "super::principal::Column::Id"
    )]
    Principal,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl Related<super::principal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Principal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
