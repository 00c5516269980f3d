#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::PersistError, ledger::Ledger, templates::SessionTemplate, Amount};

/// Settings chosen on the setup screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default)]
    pub name: String,
    /// `-` when left blank.
    #[serde(default)]
    pub location: String,
    /// Amount used for new players and quick top-ups.
    pub default_buy_in: Amount,
    #[serde(default)]
    pub denominations: Vec<String>,
    /// Settle against the cumulative nets of every archived session.
    #[serde(default)]
    pub running_balance: bool,
    /// Stamped when the session starts unless already set.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionConfig {
    pub fn new(name: impl Into<String>, default_buy_in: Amount) -> Self {
        Self {
            name: name.into(),
            location: String::new(),
            default_buy_in,
            denominations: Vec::new(),
            running_balance: false,
            started_at: None,
        }
    }

    /// Setup pre-filled from a stored template.
    pub fn from_template(template: &SessionTemplate) -> Self {
        Self {
            name: String::new(),
            location: template.location.clone(),
            default_buy_in: template.buy_in,
            denominations: template.denominations.clone(),
            running_balance: template.running_balance,
            started_at: None,
        }
    }

    /// Template capturing this setup, minus the session name.
    pub fn to_template(&self) -> SessionTemplate {
        SessionTemplate {
            location: self.location.clone(),
            buy_in: self.default_buy_in,
            denominations: self.denominations.clone(),
            running_balance: self.running_balance,
        }
    }
}

/// Snapshot of the session in progress, persisted after every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub config: SessionConfig,
    #[serde(default)]
    pub ledger: Ledger,
}

/// Result of a mutation plus any store writes that failed afterwards.
///
/// The in-memory state has already changed when failures are reported.
#[derive(Debug)]
#[must_use]
pub struct Persisted<T> {
    pub value: T,
    pub failures: Vec<PersistError>,
}

impl<T> Persisted<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value,
            failures: Vec::new(),
        }
    }

    pub(crate) fn with(mut self, failure: Option<PersistError>) -> Self {
        self.failures.extend(failure);
        self
    }

    /// True when every write reached the store.
    pub fn is_saved(&self) -> bool {
        self.failures.is_empty()
    }

    /// Drop the failure list. Failures are already logged.
    pub fn into_value(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Persisted<U> {
        Persisted {
            value: f(self.value),
            failures: self.failures,
        }
    }
}
