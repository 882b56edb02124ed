//! Principal entity - The actor a stock movement is attributed to.
//!
//! Authentication happens outside this crate; the ledger only needs a stable id
//! and the e-mail shown in reports.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Principal database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "principals")]
pub struct Model {
    /// Unique identifier for the principal
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique e-mail address, used as the principal identifier in reports
    #[sea_orm(unique)]
    pub email: String,
    /// When the principal was registered
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Principal and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One principal has many ledger entries
    #[sea_orm(has_many = "super::ledger_entry::Entity")]
    LedgerEntries,
}

impl Related<super::ledger_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
