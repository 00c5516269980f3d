//! Lifetime per-player statistics folded from every completed session.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{names::PlayerName, stats::PlayerResult, Amount};

/// Aggregated history for a single player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryEntry {
    /// Sessions played.
    pub sessions: u32,
    /// Sum of every session net.
    pub total_profit: Amount,
    /// Sum of every session buy-in.
    pub total_buy_ins: Amount,
    /// Buy-ins beyond the first, across all sessions.
    pub total_rebuys: u32,
    /// Best single-session net; never below zero.
    pub biggest_win: Amount,
    /// Worst single-session net; never above zero.
    pub biggest_loss: Amount,
    /// Close date of the most recent session played.
    pub last_played: Option<DateTime<Utc>>,
}

impl RegistryEntry {
    /// Combine two entries stored under spellings of the same name.
    fn absorb(&mut self, other: RegistryEntry) {
        self.sessions += other.sessions;
        self.total_profit += other.total_profit;
        self.total_buy_ins += other.total_buy_ins;
        self.total_rebuys += other.total_rebuys;
        self.biggest_win = self.biggest_win.max(other.biggest_win);
        self.biggest_loss = self.biggest_loss.min(other.biggest_loss);
        self.last_played = self.last_played.max(other.last_played);
    }

    fn record(&mut self, result: &PlayerResult, date: DateTime<Utc>) {
        self.sessions += 1;
        self.total_profit += result.net;
        self.total_buy_ins += result.buy_in;
        self.total_rebuys += result.buy_in_count.saturating_sub(1);
        self.biggest_win = self.biggest_win.max(result.net);
        self.biggest_loss = self.biggest_loss.min(result.net);
        self.last_played = Some(date);
    }
}

/// Player registry keyed by canonical name. Entries are only ever added to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, RegistryEntry>",
    into = "BTreeMap<PlayerName, RegistryEntry>"
)]
pub struct Registry {
    players: BTreeMap<PlayerName, RegistryEntry>,
}

impl From<BTreeMap<String, RegistryEntry>> for Registry {
    fn from(stored: BTreeMap<String, RegistryEntry>) -> Self {
        let mut players: BTreeMap<PlayerName, RegistryEntry> = BTreeMap::new();
        for (raw, entry) in stored {
            let name = PlayerName::new(&raw);
            match players.get_mut(&name) {
                Some(existing) => {
                    warn!(player = %name, stored_as = %raw, "merging duplicate registry entry");
                    existing.absorb(entry);
                }
                None => {
                    players.insert(name, entry);
                }
            }
        }
        Self { players }
    }
}

impl From<Registry> for BTreeMap<PlayerName, RegistryEntry> {
    fn from(registry: Registry) -> Self {
        registry.players
    }
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finished session into the lifetime stats.
    pub fn update(&mut self, results: &[PlayerResult], date: DateTime<Utc>) {
        for result in results {
            self.players
                .entry(PlayerName::new(&result.name))
                .or_default()
                .record(result, date);
        }
    }

    /// Lifetime stats for any spelling of `name`.
    pub fn get(&self, name: impl Into<PlayerName>) -> Option<&RegistryEntry> {
        let name: PlayerName = name.into();
        self.players.get(&name)
    }

    /// Entries ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&PlayerName, &RegistryEntry)> {
        self.players.iter()
    }

    /// Entries ordered by lifetime profit, biggest winner first.
    pub fn leaderboard(&self) -> Vec<(&PlayerName, &RegistryEntry)> {
        let mut entries: Vec<_> = self.players.iter().collect();
        entries.sort_by(|a, b| b.1.total_profit.total_cmp(&a.1.total_profit));
        entries
    }

    /// Number of players ever seen.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True until the first session is folded in.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, 22, 30, 0)
            .single()
            .expect("valid date")
    }

    fn result(name: &str, net: Amount, buy_in: Amount, buy_in_count: u32) -> PlayerResult {
        PlayerResult {
            name: PlayerName::new(name),
            net,
            buy_in,
            cash_out: buy_in + net,
            buy_in_count,
        }
    }

    #[test]
    fn first_session_creates_entry() {
        let mut registry = Registry::new();
        registry.update(&[result("Bob", 200.0, 500.0, 3)], date(1));

        assert_eq!(
            registry.get("Bob"),
            Some(&RegistryEntry {
                sessions: 1,
                total_profit: 200.0,
                total_buy_ins: 500.0,
                total_rebuys: 2,
                biggest_win: 200.0,
                biggest_loss: 0.0,
                last_played: Some(date(1)),
            })
        );
    }

    #[test]
    fn sessions_accumulate_across_case_variants() {
        let mut registry = Registry::new();
        registry.update(&[result("bob", 200.0, 500.0, 1)], date(1));
        registry.update(&[result("BOB", -700.0, 1000.0, 2)], date(8));
        registry.update(&[result("Bob", 100.0, 500.0, 0)], date(15));

        assert_eq!(registry.len(), 1);
        let bob = registry.get("bOb").expect("bob tracked");
        assert_eq!(bob.sessions, 3);
        assert_eq!(bob.total_profit, -400.0);
        assert_eq!(bob.total_buy_ins, 2000.0);
        assert_eq!(bob.total_rebuys, 1);
        assert_eq!(bob.biggest_win, 200.0);
        assert_eq!(bob.biggest_loss, -700.0);
        assert_eq!(bob.last_played, Some(date(15)));
    }

    #[test]
    fn leaderboard_orders_by_profit() {
        let mut registry = Registry::new();
        registry.update(
            &[
                result("Amit", -300.0, 500.0, 1),
                result("Priya", 450.0, 500.0, 1),
                result("Arjun", -150.0, 500.0, 1),
            ],
            date(2),
        );
        let names: Vec<&str> = registry
            .leaderboard()
            .into_iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(names, vec!["Priya", "Arjun", "Amit"]);
    }

    #[test]
    fn loading_merges_keys_that_differ_only_in_case() -> anyhow::Result<()> {
        let json = serde_json::json!({
            "bob": { "sessions": 1, "totalProfit": 200.0, "totalBuyIns": 500.0,
                     "biggestWin": 200.0, "lastPlayed": date(1) },
            "Bob": { "sessions": 2, "totalProfit": -300.0, "totalBuyIns": 1000.0,
                     "totalRebuys": 1, "biggestLoss": -400.0, "lastPlayed": date(8) }
        });
        let registry: Registry = serde_json::from_value(json)?;

        assert_eq!(registry.len(), 1);
        let bob = registry.get("BOB").expect("bob merged");
        assert_eq!(bob.sessions, 3);
        assert_eq!(bob.total_profit, -100.0);
        assert_eq!(bob.total_buy_ins, 1500.0);
        assert_eq!(bob.total_rebuys, 1);
        assert_eq!(bob.biggest_win, 200.0);
        assert_eq!(bob.biggest_loss, -400.0);
        assert_eq!(bob.last_played, Some(date(8)));
        Ok(())
    }

    #[test]
    fn round_trips_as_name_keyed_map() -> anyhow::Result<()> {
        let mut registry = Registry::new();
        registry.update(&[result("sneha", 50.0, 500.0, 1)], date(3));
        let json = serde_json::to_value(&registry)?;
        assert_eq!(json["Sneha"]["totalProfit"], serde_json::json!(50.0));
        let restored: Registry = serde_json::from_value(json)?;
        assert_eq!(restored, registry);
        Ok(())
    }
}
