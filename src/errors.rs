//! Unified error types and result handling.
//!
//! Every core operation returns [`Result`], and each failure carries one of the
//! kinds a caller needs to tell apart when rendering a message to the user.

use sea_orm::DbErr;
use thiserror::Error;

/// Coarse failure category, stable across message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced item or principal does not exist
    NotFound,
    /// A unique name or e-mail is already taken
    Conflict,
    /// A sale was attempted without enough stock
    OutOfStock,
    /// Non-positive quantity/price, bad name, malformed date range
    InvalidInput,
    /// The backing store failed to execute or commit
    StoreUnavailable,
    /// The low-stock notifier failed (never surfaced by a sale)
    NotifierFailure,
    /// Configuration, export or I/O problems outside the ledger
    Internal,
}

/// Errors produced by the inventory ledger and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced entity is missing
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Entity type, e.g. `"item"` or `"principal"`
        entity: &'static str,
        /// Identifier or name that was looked up
        key: String,
    },

    /// Duplicate unique value on create
    #[error("'{name}' already exists")]
    Conflict {
        /// The conflicting name or e-mail
        name: String,
    },

    /// Sale rejected before any write
    #[error("'{item}' is out of stock: {available} available, {requested} requested")]
    OutOfStock {
        /// Item name
        item: String,
        /// On-hand quantity observed by the rejected sale
        available: i64,
        /// Units the sale asked for
        requested: i64,
    },

    /// Caller supplied values that fail validation
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input
        message: String,
    },

    /// Transaction or commit failure in the backing store
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] DbErr),

    /// Low-stock notification could not be delivered
    #[error("Notifier failure: {message}")]
    NotifierFailure {
        /// Transport-specific explanation
        message: String,
    },

    /// Settings file could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },

    /// CSV serialization failed
    #[error("Export error: {message}")]
    Export {
        /// Description of the export problem
        message: String,
    },

    /// File system failure while writing exports
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for [`Error::InvalidInput`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Returns the failure category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::OutOfStock { .. } => ErrorKind::OutOfStock,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            Self::NotifierFailure { .. } => ErrorKind::NotifierFailure,
            Self::Config { .. } | Self::Export { .. } | Self::Io(_) => ErrorKind::Internal,
        }
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Self::Export {
            message: value.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
