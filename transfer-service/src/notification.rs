//! Notification port informed of completed debits and credits

use async_trait::async_trait;
use common::model::account::Account;
use tracing::info;

/// Notification service invoked after a successful transfer.
///
/// Delivery is fire-and-forget: the transfer service dispatches these calls
/// on a spawned task, consumes no return value, and commits balances no
/// matter what happens here.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Notify the owner of `account` about a debit or credit
    async fn notify_about_transfer(&self, account: &Account, description: &str);
}

/// Notification service that logs the message that would be emailed.
///
/// Actual delivery belongs to an external collaborator; this implementation
/// only records what it would send.
pub struct EmailNotificationService;

#[async_trait]
impl NotificationService for EmailNotificationService {
    async fn notify_about_transfer(&self, account: &Account, description: &str) {
        info!(
            "Sending notification to owner of {}: {}",
            account.id, description
        );
    }
}
