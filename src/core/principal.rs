//! Principal registry.
//!
//! Stock movements are attributed to a principal. Authentication is the calling
//! layer's job; this module only stores the id and e-mail the ledger refers to.

use crate::{
    entities::{Principal, principal},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, SqlErr, prelude::*};
use tracing::info;

/// Registers a principal by e-mail.
///
/// # Errors
/// Returns `Error::InvalidInput` for an empty or malformed address and
/// `Error::Conflict` if the address is already registered.
pub async fn register_principal<C>(db: &C, email: &str) -> Result<principal::Model>
where
    C: ConnectionTrait,
{
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::invalid(format!(
            "'{email}' is not a valid e-mail address"
        )));
    }

    if get_principal_by_email(db, email).await?.is_some() {
        return Err(Error::Conflict {
            name: email.to_string(),
        });
    }

    let principal = principal::ActiveModel {
        email: Set(email.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let principal = principal.insert(db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::Conflict {
            name: email.to_string(),
        },
        _ => e.into(),
    })?;
    info!("Registered principal {} ({})", principal.id, principal.email);
    Ok(principal)
}

/// Fetches a principal by id.
///
/// # Errors
/// Returns `Error::NotFound` if no principal has this id.
pub async fn get_principal_by_id<C>(db: &C, principal_id: i64) -> Result<principal::Model>
where
    C: ConnectionTrait,
{
    Principal::find_by_id(principal_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "principal",
            key: principal_id.to_string(),
        })
}

/// Looks a principal up by e-mail.
pub async fn get_principal_by_email<C>(db: &C, email: &str) -> Result<Option<principal::Model>>
where
    C: ConnectionTrait,
{
    Principal::find()
        .filter(principal::Column::Email.eq(email.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}
