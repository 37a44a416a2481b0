//! Transfer service implementation

use std::sync::Arc;
use std::time::Instant;

use common::decimal::Amount;
use common::error::{Error, ErrorExt, Result};
use common::model::account::{Account, ProcessContext, TransferRequest};
use tracing::{debug, error, info, warn};

use crate::config::TransferServiceConfig;
use crate::notification::{EmailNotificationService, NotificationService};
use crate::repository::{AccountRepository, InMemoryAccountRepository};

/// Transfer service coordinating funds movement between two accounts.
///
/// Concurrent transfers over disjoint account pairs proceed in parallel;
/// transfers sharing an account serialize on the per-account exclusivity
/// marker, acquired in id order so that opposite-direction transfers over
/// the same pair cannot deadlock.
pub struct TransferService {
    /// Repository for account data
    repo: Arc<dyn AccountRepository>,
    /// Port informed of completed debits and credits
    notifier: Arc<dyn NotificationService>,
    /// Acquisition timeout and backoff
    config: TransferServiceConfig,
}

impl TransferService {
    /// Create a transfer service with an in-memory store, the email
    /// notifier, and configuration from the environment
    pub fn new() -> Self {
        Self::with_parts(
            Arc::new(InMemoryAccountRepository::new()),
            Arc::new(EmailNotificationService),
            TransferServiceConfig::from_env(),
        )
    }

    /// Create a transfer service from explicit collaborators
    pub fn with_parts(
        repo: Arc<dyn AccountRepository>,
        notifier: Arc<dyn NotificationService>,
        config: TransferServiceConfig,
    ) -> Self {
        Self {
            repo,
            notifier,
            config,
        }
    }

    /// The underlying account repository
    pub fn repository(&self) -> Arc<dyn AccountRepository> {
        Arc::clone(&self.repo)
    }

    /// Create a new account
    pub async fn create_account(&self, account: Account) -> Result<()> {
        info!("Creating account {}", account.id);
        self.repo.create_account(account).await
    }

    /// Get an account by id
    pub async fn get_account(&self, id: &str) -> Result<Option<Account>> {
        self.repo.get_account(id).await
    }

    /// Move `request.amount` from the sender to the receiver account.
    ///
    /// Fails with `InvalidTransfer` for a self-transfer or non-positive
    /// amount, `AccountNotFound` naming the missing side, `TransferTimeout`
    /// when both exclusivity markers cannot be held within the configured
    /// budget, and `InsufficientBalance` when the sender cannot cover the
    /// amount. On every failure path both balances are untouched and no
    /// exclusivity is left held.
    pub async fn transfer(&self, request: &TransferRequest, ctx: &ProcessContext) -> Result<()> {
        let deadline = Instant::now() + self.config.acquire_timeout;

        if request.from_id == request.to_id {
            error!(
                correlation_id = %ctx.correlation_id,
                "Sender account id {} must differ from receiver account id {}",
                request.from_id, request.to_id
            );
            return Err(Error::InvalidTransfer(format!(
                "Sender Account id {} should not be equal to receiver account id {}!",
                request.from_id, request.to_id
            )));
        }

        // The boundary validates this too; enforced again so a caller that
        // bypasses validation can never mint or destroy funds.
        if request.amount <= Amount::ZERO {
            error!(
                correlation_id = %ctx.correlation_id,
                "Transfer amount {} is not positive", request.amount
            );
            return Err(Error::InvalidTransfer(format!(
                "Transfer amount {} should be positive!",
                request.amount
            )));
        }

        if self.repo.get_account(&request.from_id).await?.is_none() {
            error!(
                correlation_id = %ctx.correlation_id,
                "Sender account id {} does not exist", request.from_id
            );
            return Err(Error::AccountNotFound(format!(
                "Sender Account id {} does not exist!",
                request.from_id
            )));
        }
        if self.repo.get_account(&request.to_id).await?.is_none() {
            error!(
                correlation_id = %ctx.correlation_id,
                "Receiver account id {} does not exist", request.to_id
            );
            return Err(Error::AccountNotFound(format!(
                "Receiver Account id {} does not exist!",
                request.to_id
            )));
        }

        // Fixed global acquisition order: lower id first. Two transfers
        // moving funds in opposite directions between the same pair then
        // contend on the same first marker instead of deadlocking.
        let (first, second) = if request.from_id < request.to_id {
            (request.from_id.as_str(), request.to_id.as_str())
        } else {
            (request.to_id.as_str(), request.from_id.as_str())
        };

        self.acquire(first, deadline, ctx).await?;
        if let Err(e) = self.acquire(second, deadline, ctx).await {
            self.release(first, ctx).await;
            return Err(e);
        }

        let moved = self.apply_transfer(request, ctx).await;

        // Unconditional release, success or not, before the result is
        // propagated to the caller.
        self.release(second, ctx).await;
        self.release(first, ctx).await;

        let (debited, credited) = moved?;

        info!(
            correlation_id = %ctx.correlation_id,
            "Transferred {} from account {} to account {}",
            request.amount, request.from_id, request.to_id
        );

        self.dispatch_notifications(debited, credited, request.amount);
        Ok(())
    }

    /// Acquire one account's exclusivity marker, backing off until the
    /// deadline
    async fn acquire(&self, id: &str, deadline: Instant, ctx: &ProcessContext) -> Result<()> {
        loop {
            if self.repo.set_exclusive(id, true).await? {
                debug!(
                    correlation_id = %ctx.correlation_id,
                    "Acquired exclusive access to account {}", id
                );
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!(
                    correlation_id = %ctx.correlation_id,
                    "Timeout waiting for exclusive access to account {}", id
                );
                return Err(Error::TransferTimeout(format!(
                    "Timeout : previous transaction on account {} did not complete!",
                    id
                )));
            }
            tokio::time::sleep(self.config.retry_backoff).await;
        }
    }

    /// Release one account's exclusivity marker.
    ///
    /// Accounts are never deleted, so release cannot fail in practice; a
    /// failure is logged rather than allowed to mask the transfer outcome.
    async fn release(&self, id: &str, ctx: &ProcessContext) {
        if let Err(e) = self.repo.set_exclusive(id, false).await {
            error!(
                correlation_id = %ctx.correlation_id,
                "Failed to release exclusive access to account {}: {}", id, e
            );
        }
    }

    /// Funds check and balance mutation, entered with both markers held.
    ///
    /// Returns post-transfer snapshots of the debited and credited accounts.
    async fn apply_transfer(
        &self,
        request: &TransferRequest,
        ctx: &ProcessContext,
    ) -> Result<(Account, Account)> {
        // Re-read under exclusivity: a transfer that committed between
        // resolution and acquisition may have changed the balance.
        let from = self
            .repo
            .get_account(&request.from_id)
            .await?
            .ok_or_else(|| {
                Error::AccountNotFound(format!(
                    "Sender Account id {} does not exist!",
                    request.from_id
                ))
            })?;

        if request.amount > from.balance {
            error!(
                correlation_id = %ctx.correlation_id,
                "Account id {} does not have enough balance for this transfer", request.from_id
            );
            return Err(Error::InsufficientBalance(format!(
                "Account id {} does not have enough balance to do this transaction!",
                request.from_id
            )));
        }

        let to = self
            .repo
            .get_account(&request.to_id)
            .await?
            .ok_or_else(|| {
                Error::AccountNotFound(format!(
                    "Receiver Account id {} does not exist!",
                    request.to_id
                ))
            })?;

        let debited_balance = from.balance - request.amount;
        let credited_balance = to.balance + request.amount;

        self.repo
            .update_balance(&request.from_id, debited_balance)
            .await
            .with_context(|| format!("Failed to debit account {}", request.from_id))?;
        self.repo
            .update_balance(&request.to_id, credited_balance)
            .await
            .with_context(|| format!("Failed to credit account {}", request.to_id))?;

        let debited = Account {
            balance: debited_balance,
            ..from
        };
        let credited = Account {
            balance: credited_balance,
            ..to
        };
        Ok((debited, credited))
    }

    /// Fire-and-forget notification dispatch, after release.
    ///
    /// Runs on a spawned task; neither failure nor delay reaches the
    /// transfer caller, and the balances are already committed.
    fn dispatch_notifications(&self, debited: Account, credited: Account, amount: Amount) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            notifier
                .notify_about_transfer(
                    &debited,
                    &format!("Account has been debited by {}", amount),
                )
                .await;
            notifier
                .notify_about_transfer(
                    &credited,
                    &format!("Account has been credited by {}", amount),
                )
                .await;
        });
    }
}

impl Default for TransferService {
    fn default() -> Self {
        Self::new()
    }
}
