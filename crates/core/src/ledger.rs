//! Per-participant buy-in and cash-out totals for the active session.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{names::PlayerName, Amount};

/// Running totals for a single participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Canonical player name.
    pub name: PlayerName,
    /// Sum of every buy-in, including top-ups.
    pub buy_in: Amount,
    /// Last cash-out value entered; zero until set.
    pub cash_out: Amount,
    /// Number of buy-in operations (initial plus rebuys).
    pub buy_in_count: u32,
    /// Left the table; still counted for settlement.
    #[serde(default)]
    pub is_left: bool,
}

impl Participant {
    fn new(name: PlayerName) -> Self {
        Self {
            name,
            buy_in: 0.0,
            cash_out: 0.0,
            buy_in_count: 0,
            is_left: false,
        }
    }

    /// `cash_out - buy_in`.
    pub fn net(&self) -> Amount {
        self.cash_out - self.buy_in
    }
}

/// Participants of the active session in insertion order.
///
/// Amounts are assumed to be validated by the caller; see [`crate::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredLedger")]
pub struct Ledger {
    participants: Vec<Participant>,
    total_buy_in: Amount,
}

/// On-disk shape of a [`Ledger`], before duplicate names are merged.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLedger {
    #[serde(default)]
    participants: Vec<Participant>,
}

impl From<StoredLedger> for Ledger {
    fn from(stored: StoredLedger) -> Self {
        let mut ledger = Ledger::new();
        for participant in stored.participants {
            ledger.total_buy_in += participant.buy_in;
            match ledger.position(&participant.name) {
                Some(index) => {
                    warn!(player = %participant.name, "merging duplicate ledger entry");
                    let existing = &mut ledger.participants[index];
                    existing.buy_in += participant.buy_in;
                    existing.cash_out += participant.cash_out;
                    existing.buy_in_count += participant.buy_in_count;
                    existing.is_left &= participant.is_left;
                }
                None => ledger.participants.push(participant),
            }
        }
        ledger
    }
}

impl Ledger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a buy-in (initial or top-up). Re-entry clears the left flag.
    pub fn add_buy_in(&mut self, name: impl Into<PlayerName>, amount: Amount) {
        let name = name.into();
        let index = match self.position(&name) {
            Some(index) => index,
            None => {
                self.participants.push(Participant::new(name));
                self.participants.len() - 1
            }
        };
        let participant = &mut self.participants[index];
        participant.is_left = false;
        participant.buy_in += amount;
        participant.buy_in_count += 1;
        self.total_buy_in += amount;
        debug!(
            player = %participant.name,
            amount,
            count = participant.buy_in_count,
            "buy-in recorded"
        );
    }

    /// Overwrite the cash-out for a known participant; unknown names are ignored.
    pub fn set_cash_out(&mut self, name: impl Into<PlayerName>, amount: Amount) {
        if let Some(participant) = self.get_mut(&name.into()) {
            participant.cash_out = amount;
        }
    }

    /// Cash a participant out and remove them from the active roster.
    pub fn mark_left(&mut self, name: impl Into<PlayerName>, cash_out: Amount) {
        if let Some(participant) = self.get_mut(&name.into()) {
            participant.cash_out = cash_out;
            participant.is_left = true;
            debug!(player = %participant.name, cash_out, "participant left");
        }
    }

    /// Participants still at the table, largest buy-in first.
    pub fn active_roster(&self) -> Vec<&Participant> {
        let mut roster: Vec<&Participant> =
            self.participants.iter().filter(|p| !p.is_left).collect();
        // Stable sort keeps insertion order for equal buy-ins.
        roster.sort_by(|a, b| b.buy_in.total_cmp(&a.buy_in));
        roster
    }

    /// Look up a participant by any spelling of their name.
    pub fn get(&self, name: impl Into<PlayerName>) -> Option<&Participant> {
        let name = name.into();
        self.participants.iter().find(|p| p.name == name)
    }

    /// Every participant, including those who left, in insertion order.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Sum of all buy-ins in the session.
    pub fn total_buy_in(&self) -> Amount {
        self.total_buy_in
    }

    /// Number of participants still at the table.
    pub fn active_count(&self) -> usize {
        self.participants.iter().filter(|p| !p.is_left).count()
    }

    /// Number of participants, including those who left.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// True before the first buy-in.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    fn position(&self, name: &PlayerName) -> Option<usize> {
        self.participants.iter().position(|p| &p.name == name)
    }

    fn get_mut(&mut self, name: &PlayerName) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| &p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_ins_merge_case_variants() {
        let mut ledger = Ledger::new();
        ledger.add_buy_in("rahul", 500.0);
        ledger.add_buy_in("RAHUL", 500.0);
        ledger.add_buy_in("Amit", 1000.0);

        assert_eq!(ledger.len(), 2);
        let rahul = ledger.get("Rahul").expect("rahul present");
        assert_eq!(rahul.buy_in, 1000.0);
        assert_eq!(rahul.buy_in_count, 2);
        assert_eq!(rahul.cash_out, 0.0);
        assert_eq!(ledger.total_buy_in(), 2000.0);
    }

    #[test]
    fn cash_out_overwrites_and_ignores_unknown() {
        let mut ledger = Ledger::new();
        ledger.add_buy_in("Sneha", 500.0);
        ledger.set_cash_out("sneha", 300.0);
        ledger.set_cash_out("sneha", 800.0);
        ledger.set_cash_out("ghost", 100.0);

        assert_eq!(ledger.get("Sneha").map(|p| p.cash_out), Some(800.0));
        assert_eq!(ledger.get("Sneha").map(Participant::net), Some(300.0));
        assert!(ledger.get("Ghost").is_none());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn left_participants_leave_roster_but_stay_in_ledger() {
        let mut ledger = Ledger::new();
        ledger.add_buy_in("Priya", 500.0);
        ledger.add_buy_in("Arjun", 500.0);
        ledger.mark_left("priya", 750.0);
        ledger.mark_left("nobody", 10.0);

        let roster: Vec<&str> = ledger.active_roster().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(roster, vec!["Arjun"]);
        assert_eq!(ledger.active_count(), 1);
        let priya = ledger.get("Priya").expect("priya retained");
        assert!(priya.is_left);
        assert_eq!(priya.cash_out, 750.0);
    }

    #[test]
    fn rebuy_clears_left_status() {
        let mut ledger = Ledger::new();
        ledger.add_buy_in("Vikram", 500.0);
        ledger.mark_left("Vikram", 0.0);
        ledger.add_buy_in("vikram", 500.0);

        let vikram = ledger.get("Vikram").expect("vikram present");
        assert!(!vikram.is_left);
        assert_eq!(vikram.buy_in_count, 2);
        assert_eq!(ledger.active_count(), 1);
    }

    #[test]
    fn loading_merges_names_that_differ_only_in_case() -> anyhow::Result<()> {
        let json = serde_json::json!({
            "participants": [
                { "name": "bob", "buyIn": 500.0, "cashOut": 200.0, "buyInCount": 1 },
                { "name": "Amit", "buyIn": 500.0, "cashOut": 900.0, "buyInCount": 1 },
                { "name": "BOB", "buyIn": 500.0, "cashOut": 400.0, "buyInCount": 1, "isLeft": true }
            ],
            "totalBuyIn": 1500.0
        });
        let ledger: Ledger = serde_json::from_value(json)?;

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.participants()[0].name.as_str(), "Bob");
        let bob = ledger.get("bob").expect("bob merged");
        assert_eq!(bob.buy_in, 1000.0);
        assert_eq!(bob.cash_out, 600.0);
        assert_eq!(bob.buy_in_count, 2);
        assert!(!bob.is_left);
        assert_eq!(ledger.total_buy_in(), 1500.0);

        let restored: Ledger = serde_json::from_value(serde_json::to_value(&ledger)?)?;
        assert_eq!(restored, ledger);
        Ok(())
    }

    #[test]
    fn roster_orders_by_buy_in_then_insertion() {
        let mut ledger = Ledger::new();
        ledger.add_buy_in("A", 500.0);
        ledger.add_buy_in("B", 1000.0);
        ledger.add_buy_in("C", 500.0);
        ledger.add_buy_in("D", 1000.0);

        let roster: Vec<&str> = ledger.active_roster().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(roster, vec!["B", "D", "A", "C"]);
    }
}
