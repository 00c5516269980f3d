#![allow(missing_docs)]

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    archive::{SessionArchive, SessionRecord},
    clock::{Clock, SystemClock},
    error::{PersistError, ValidationError},
    ledger::Ledger,
    names::PlayerName,
    registry::Registry,
    settlement::{greedy_settlement, imbalance, running_tally, settlement_entries},
    stats::calculate_session_stats,
    store::{keys, load_json, load_or_default, save_json, KeyValueStore},
    summary::SessionSummary,
    templates::{SessionTemplate, TemplateBook},
    validate, Amount,
};

use super::models::{ActiveSession, Persisted, SessionConfig};

const DEFAULT_CURRENCY: &str = "₹";

/// Owns every piece of persisted state and applies user actions to it.
///
/// Each mutation updates memory first and then writes the affected keys.
/// Write failures are logged and reported through [`Persisted`]; the
/// in-memory change is kept.
pub struct SessionController<S, C = SystemClock> {
    store: S,
    clock: C,
    currency: String,
    active: Option<ActiveSession>,
    archive: SessionArchive,
    registry: Registry,
    templates: TemplateBook,
}

impl<S: KeyValueStore, C: Clock> SessionController<S, C> {
    /// Restore state from `store`. Unreadable keys start out empty.
    pub fn load(store: S, clock: C) -> Self {
        let active = match load_json::<ActiveSession>(&store, keys::ACTIVE_SESSION) {
            Ok(active) => active,
            Err(err) => {
                warn!("Discarding unreadable active session: {err:#}");
                None
            }
        };
        let archive: SessionArchive = load_or_default(&store, keys::HISTORY);
        let registry: Registry = load_or_default(&store, keys::PLAYER_REGISTRY);
        let templates: TemplateBook = load_or_default(&store, keys::TEMPLATES);
        info!(
            resumed = active.is_some(),
            sessions = archive.len(),
            players = registry.len(),
            templates = templates.len(),
            "state loaded"
        );

        Self {
            store,
            clock,
            currency: DEFAULT_CURRENCY.to_string(),
            active,
            archive,
            registry,
            templates,
        }
    }

    /// Currency prefix used in rendered settlement lines.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    pub fn ledger(&self) -> Option<&Ledger> {
        self.active.as_ref().map(|active| &active.ledger)
    }

    pub fn archive(&self) -> &SessionArchive {
        &self.archive
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn templates(&self) -> &TemplateBook {
        &self.templates
    }

    /// Begin a new session, replacing any session in progress.
    pub fn start_session(
        &mut self,
        mut config: SessionConfig,
    ) -> Result<Persisted<()>, ValidationError> {
        config.default_buy_in = validate::buy_in_amount(config.default_buy_in)?;
        config.name = config.name.trim().to_string();
        let location = config.location.trim();
        config.location = if location.is_empty() {
            "-".to_string()
        } else {
            location.to_string()
        };
        config.denominations.retain(|d| !d.trim().is_empty());
        if config.started_at.is_none() {
            config.started_at = Some(self.clock.now());
        }

        info!(
            name = %config.name,
            buy_in = config.default_buy_in,
            running_balance = config.running_balance,
            "session started"
        );
        self.active = Some(ActiveSession {
            config,
            ledger: Ledger::new(),
        });
        Ok(Persisted::new(()).with(self.persist_active()))
    }

    /// Record a buy-in. `None` tops up by the session default.
    pub fn add_buy_in(
        &mut self,
        raw_name: &str,
        amount: Option<Amount>,
    ) -> Result<Persisted<PlayerName>, ValidationError> {
        let name = validate::player_name(raw_name)?;
        let active = self.active.as_mut().ok_or(ValidationError::NoActiveSession)?;
        let amount = validate::buy_in_amount(amount.unwrap_or(active.config.default_buy_in))?;
        active.ledger.add_buy_in(name.clone(), amount);
        Ok(Persisted::new(name).with(self.persist_active()))
    }

    /// Overwrite a participant's cash-out. Unknown names change nothing.
    pub fn set_cash_out(
        &mut self,
        raw_name: &str,
        amount: Amount,
    ) -> Result<Persisted<()>, ValidationError> {
        let name = validate::player_name(raw_name)?;
        let amount = validate::cash_out_amount(amount)?;
        let active = self.active.as_mut().ok_or(ValidationError::NoActiveSession)?;
        active.ledger.set_cash_out(name, amount);
        Ok(Persisted::new(()).with(self.persist_active()))
    }

    /// Cash a participant out and take them off the roster.
    pub fn mark_left(
        &mut self,
        raw_name: &str,
        cash_out: Amount,
    ) -> Result<Persisted<()>, ValidationError> {
        let name = validate::player_name(raw_name)?;
        let cash_out = validate::cash_out_amount(cash_out)?;
        let active = self.active.as_mut().ok_or(ValidationError::NoActiveSession)?;
        active.ledger.mark_left(name, cash_out);
        Ok(Persisted::new(()).with(self.persist_active()))
    }

    /// Close the session: settle, archive, fold into the registry.
    pub fn end_session(&mut self) -> Result<Persisted<SessionSummary>, ValidationError> {
        let active = self.active.take().ok_or(ValidationError::NoActiveSession)?;
        let now = self.clock.now();

        let stats = calculate_session_stats(
            active.ledger.participants(),
            active.config.started_at,
            now,
        );
        let entries = settlement_entries(
            &stats.results,
            active.config.running_balance,
            self.archive.records(),
        );
        let settlement = greedy_settlement(&entries);
        let summary =
            SessionSummary::from_stats(stats, &settlement, imbalance(&entries), &self.currency);
        if summary.is_unbalanced() {
            warn!(
                imbalance = summary.imbalance,
                "settled nets do not sum to zero; a cash-out is probably missing"
            );
        }

        self.archive.push(SessionRecord {
            date: now,
            name: active.config.name,
            location: active.config.location,
            total_pot: active.ledger.total_buy_in(),
            shark: summary.shark.as_ref().map(|shark| shark.name.clone()),
            results: summary.results.clone(),
            settlements: summary.settlements.clone(),
            is_running_balance: active.config.running_balance,
            insights: summary.insights.clone(),
        });
        self.registry.update(&summary.results, now);
        info!(
            players = summary.results.len(),
            pot = active.ledger.total_buy_in(),
            archived = self.archive.len(),
            "session ended"
        );

        let history = self.write(keys::HISTORY, &self.archive);
        let registry = self.write(keys::PLAYER_REGISTRY, &self.registry);
        Ok(Persisted::new(summary)
            .with(history)
            .with(registry)
            .with(self.persist_active()))
    }

    /// Summary of the archived session at `index`, newest first.
    pub fn view_history(&self, index: usize) -> Option<SessionSummary> {
        let record = self.archive.get(index)?;
        let mut summary = SessionSummary::from_record(record);
        if record.is_running_balance {
            let older = &self.archive.records()[index + 1..];
            summary.imbalance = imbalance(&running_tally(older, &record.results));
        }
        Some(summary)
    }

    /// Drop every archived session. The registry is kept.
    pub fn clear_history(&mut self) -> Persisted<()> {
        let dropped = self.archive.len();
        self.archive.clear();
        info!(dropped, "history cleared");
        let result = self.store.remove(keys::HISTORY);
        Persisted::new(()).with(self.check(keys::HISTORY, result))
    }

    /// Store `template` under `name`, overwriting any existing one.
    pub fn save_template(
        &mut self,
        name: &str,
        template: SessionTemplate,
    ) -> Result<Persisted<()>, ValidationError> {
        self.templates.save(name, template)?;
        debug!(name = name.trim(), "template saved");
        Ok(Persisted::new(()).with(self.write(keys::TEMPLATES, &self.templates)))
    }

    /// Remove a template; returns whether it existed.
    pub fn delete_template(&mut self, name: &str) -> Persisted<bool> {
        if self.templates.delete(name).is_none() {
            return Persisted::new(false);
        }
        debug!(name = name.trim(), "template deleted");
        Persisted::new(true).with(self.write(keys::TEMPLATES, &self.templates))
    }

    /// Setup pre-filled from the named template.
    pub fn apply_template(&self, name: &str) -> Option<SessionConfig> {
        self.templates.get(name).map(SessionConfig::from_template)
    }

    /// Abandon the session in progress without archiving it.
    pub fn reset(&mut self) -> Persisted<()> {
        if self.active.take().is_some() {
            info!("active session discarded");
        }
        Persisted::new(()).with(self.persist_active())
    }

    fn persist_active(&self) -> Option<PersistError> {
        let result = match &self.active {
            Some(active) => save_json(&self.store, keys::ACTIVE_SESSION, active),
            None => self.store.remove(keys::ACTIVE_SESSION),
        };
        self.check(keys::ACTIVE_SESSION, result)
    }

    fn write<T: Serialize + ?Sized>(&self, key: &'static str, value: &T) -> Option<PersistError> {
        self.check(key, save_json(&self.store, key, value))
    }

    fn check(&self, key: &'static str, result: anyhow::Result<()>) -> Option<PersistError> {
        match result {
            Ok(()) => None,
            Err(err) => {
                warn!(key, "failed to persist: {err:#}");
                Some(PersistError::new(key, err))
            }
        }
    }
}
