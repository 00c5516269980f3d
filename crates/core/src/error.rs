//! Error types surfaced by the core.

use thiserror::Error;

use crate::Amount;

/// Input rejected at the boundary before it reaches the ledger.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Name was blank after trimming.
    #[error("player name must not be empty")]
    EmptyName,

    /// Text that does not parse as a number.
    #[error("'{0}' is not a valid amount")]
    InvalidAmount(String),

    /// Buy-ins must be positive.
    #[error("amount must be greater than zero (got {0})")]
    NonPositiveAmount(Amount),

    /// Cash-outs may be zero but not negative.
    #[error("amount must not be negative (got {0})")]
    NegativeAmount(Amount),

    /// Template saved without a name.
    #[error("template name must not be empty")]
    EmptyTemplateName,

    /// Ledger operation with no active session.
    #[error("no session is in progress")]
    NoActiveSession,
}

/// A store write that failed after the in-memory state was already updated.
#[derive(Debug, Error)]
#[error("failed to persist {key}: {source}")]
pub struct PersistError {
    /// Store key that could not be written.
    pub key: &'static str,
    /// Underlying failure.
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl PersistError {
    pub(crate) fn new(key: &'static str, source: anyhow::Error) -> Self {
        Self {
            key,
            source: source.into(),
        }
    }
}
