//! Account models and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Amount;
use crate::error::{Error, Result};

/// Account model
///
/// The exclusivity marker guarding concurrent mutation is repository
/// state, not part of this value; an `Account` is always a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account id, assigned at creation and never reassigned
    pub id: String,
    /// Current balance
    pub balance: Amount,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with a zero balance
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_balance(id, Amount::ZERO)
    }

    /// Create a new account with an opening balance
    pub fn with_balance(id: impl Into<String>, balance: Amount) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            balance,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A request to move funds between two accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Id of the account to debit
    pub from_id: String,
    /// Id of the account to credit
    pub to_id: String,
    /// Amount to move; must be positive
    pub amount: Amount,
}

impl TransferRequest {
    /// Create a new transfer request
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>, amount: Amount) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            amount,
        }
    }

    /// Boundary validation: non-empty ids and a positive amount.
    ///
    /// The transfer core re-checks amount positivity and id distinctness
    /// itself; this is the request-shaping layer's first line of defense.
    pub fn validate(&self) -> Result<()> {
        if self.from_id.is_empty() {
            return Err(Error::ValidationError("sender account id must not be empty".to_string()));
        }
        if self.to_id.is_empty() {
            return Err(Error::ValidationError("receiver account id must not be empty".to_string()));
        }
        if self.amount <= Amount::ZERO {
            return Err(Error::ValidationError(format!(
                "transfer amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}

/// Per-attempt diagnostic context
///
/// Carries no business meaning; the correlation id ties together the log
/// lines of a single transfer attempt.
#[derive(Debug, Clone)]
pub struct ProcessContext {
    /// Correlation id, generated once per transfer attempt
    pub correlation_id: Uuid,
}

impl ProcessContext {
    /// Create a context with a fresh correlation id
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
        }
    }
}

impl Default for ProcessContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::dec;

    #[test]
    fn validate_accepts_well_formed_request() {
        let request = TransferRequest::new("Id-1", "Id-2", dec!(50));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_ids() {
        let request = TransferRequest::new("", "Id-2", dec!(50));
        assert!(matches!(request.validate(), Err(Error::ValidationError(_))));

        let request = TransferRequest::new("Id-1", "", dec!(50));
        assert!(matches!(request.validate(), Err(Error::ValidationError(_))));
    }

    #[test]
    fn validate_rejects_non_positive_amounts() {
        let request = TransferRequest::new("Id-1", "Id-2", Amount::ZERO);
        assert!(matches!(request.validate(), Err(Error::ValidationError(_))));

        let request = TransferRequest::new("Id-1", "Id-2", dec!(-1));
        assert!(matches!(request.validate(), Err(Error::ValidationError(_))));
    }

    #[test]
    fn process_contexts_get_distinct_correlation_ids() {
        let a = ProcessContext::new();
        let b = ProcessContext::new();
        assert_ne!(a.correlation_id, b.correlation_id);
    }
}
