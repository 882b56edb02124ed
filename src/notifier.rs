//! Low-stock notification seam.
//!
//! The delivery transport (mail, chat, ...) lives outside this crate and plugs in
//! through [`Notifier`]. [`LogNotifier`] is the built-in implementation: it only
//! writes the alert to the log.

use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

/// Delivers low-stock alerts to a recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one alert. Called at most once per qualifying sale and never retried.
    ///
    /// # Errors
    /// Returns `Error::NotifierFailure` if the alert could not be delivered.
    async fn notify_low_stock(&self, item_name: &str, quantity: i64, recipient: &str)
    -> Result<()>;
}

/// Subject and body of a low-stock alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    /// Short subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

/// Renders the alert text for `item_name` at `quantity` units.
#[must_use]
pub fn low_stock_message(item_name: &str, quantity: i64, at: DateTime<Utc>) -> AlertMessage {
    AlertMessage {
        subject: format!("Low stock alert - {item_name}"),
        body: format!(
            "Low inventory alert!\n\n\
             Item: {item_name}\n\
             Current quantity: {quantity}\n\
             Date: {}\n\n\
             Please restock this item soon.\n",
            at.format("%Y-%m-%d %H:%M:%S")
        ),
    }
}

/// Notifier that records alerts in the log instead of sending them anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_low_stock(
        &self,
        item_name: &str,
        quantity: i64,
        recipient: &str,
    ) -> Result<()> {
        let message = low_stock_message(item_name, quantity, Utc::now());
        warn!(
            recipient,
            subject = %message.subject,
            "Low stock alert for '{}': {} left", item_name, quantity
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_low_stock_message() {
        let at = Utc.with_ymd_and_hms(2024, 5, 2, 9, 15, 0).unwrap();
        let message = low_stock_message("Cola", 4, at);
        assert_eq!(message.subject, "Low stock alert - Cola");
        assert!(message.body.contains("Item: Cola"));
        assert!(message.body.contains("Current quantity: 4"));
        assert!(message.body.contains("Date: 2024-05-02 09:15:00"));
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        assert!(
            LogNotifier
                .notify_low_stock("Cola", 1, "owner@example.com")
                .await
                .is_ok()
        );
    }
}
