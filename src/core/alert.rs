//! Low-stock alert trigger.
//!
//! Runs after a sale has committed. The decision itself is the pure
//! [`should_alert`]; [`LowStockAlert`] wires it to a [`Notifier`] and makes sure a
//! delivery failure is logged and dropped instead of reaching the seller.

use crate::{config::Settings, core::stock::SaleOutcome, notifier::Notifier};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Quantity below which a sale raises an alert.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// Returns true when `new_quantity` is strictly below `threshold`.
#[must_use]
pub const fn should_alert(new_quantity: i64, threshold: i64) -> bool {
    new_quantity < threshold
}

/// What the trigger did after a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    /// Quantity is still at or above the threshold
    NotNeeded,
    /// The notifier accepted the alert
    Sent,
    /// The notifier failed; the failure was logged and swallowed
    Failed,
}

/// Alert trigger bound to a notifier, a recipient and a threshold.
#[derive(Clone)]
pub struct LowStockAlert {
    notifier: Arc<dyn Notifier>,
    recipient: String,
    threshold: i64,
}

impl LowStockAlert {
    /// Creates a trigger with an explicit threshold.
    pub fn new(notifier: Arc<dyn Notifier>, recipient: impl Into<String>, threshold: i64) -> Self {
        Self {
            notifier,
            recipient: recipient.into(),
            threshold,
        }
    }

    /// Creates a trigger from the configured recipient and threshold.
    #[must_use]
    pub fn from_settings(notifier: Arc<dyn Notifier>, settings: &Settings) -> Self {
        Self::new(
            notifier,
            settings.alert_recipient.clone(),
            settings.low_stock_threshold,
        )
    }

    /// The configured threshold.
    #[must_use]
    pub const fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Runs the trigger for a committed sale.
    pub async fn after_sale(&self, sale: &SaleOutcome) -> AlertOutcome {
        self.check(&sale.item.name, sale.new_quantity()).await
    }

    /// Notifies the recipient if `new_quantity` is below the threshold.
    pub async fn check(&self, item_name: &str, new_quantity: i64) -> AlertOutcome {
        if !should_alert(new_quantity, self.threshold) {
            debug!(
                "'{}' at {} units, threshold {}: no alert",
                item_name, new_quantity, self.threshold
            );
            return AlertOutcome::NotNeeded;
        }

        match self
            .notifier
            .notify_low_stock(item_name, new_quantity, &self.recipient)
            .await
        {
            Ok(()) => {
                info!(
                    "Low stock alert for '{}' ({} units) sent to {}",
                    item_name, new_quantity, self.recipient
                );
                AlertOutcome::Sent
            }
            Err(e) => {
                error!("Low stock alert for '{}' failed: {}", item_name, e);
                AlertOutcome::Failed
            }
        }
    }
}

impl std::fmt::Debug for LowStockAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LowStockAlert")
            .field("recipient", &self.recipient)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}
