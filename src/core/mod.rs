//! Core business logic - framework-agnostic inventory ledger operations.
//!
//! Every function takes an explicit database handle; nothing here depends on
//! the command-line front end.

/// Low-stock alert trigger
pub mod alert;

/// Item catalog
pub mod catalog;

/// CSV export of sales and movements
pub mod export;

/// Append-only stock movement ledger
pub mod ledger;

/// Reporting date ranges
pub mod period;

/// Principal registry
pub mod principal;

/// Sales aggregation
pub mod report;

/// Stock adjustment service
pub mod stock;
