//! Greedy debt settlement, optionally over the running balance of every
//! archived session.
//!
//! Debtors (most negative first) are paired against creditors (largest first)
//! with two cursors. Each step settles as much as both sides allow, so at most
//! `debtors + creditors - 1` transfers are produced. The engine trusts that the
//! nets sum to roughly zero; [`imbalance`] lets callers check that first.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{archive::SessionRecord, names::PlayerName, stats::PlayerResult, Amount};

/// Residue below this is treated as settled.
pub const EPSILON: Amount = 0.01;

/// Text shown instead of an empty transfer list.
pub const ALL_SETTLED: &str = "All settled!";

/// One participant's outstanding balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetEntry {
    /// Canonical player name.
    pub name: PlayerName,
    /// Positive when owed money, negative when owing.
    pub net: Amount,
}

impl NetEntry {
    /// Entry for `name`, canonicalising the name.
    pub fn new(name: impl Into<PlayerName>, net: Amount) -> Self {
        Self {
            name: name.into(),
            net,
        }
    }
}

impl From<&PlayerResult> for NetEntry {
    fn from(result: &PlayerResult) -> Self {
        Self {
            name: result.name.clone(),
            net: result.net,
        }
    }
}

/// A suggested payment from a debtor to a creditor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    /// Debtor paying.
    pub from: PlayerName,
    /// Creditor receiving.
    pub to: PlayerName,
    /// Rounded to the nearest whole unit.
    pub amount: Amount,
}

impl Transfer {
    /// `"A → B ₹300"`.
    pub fn line(&self, currency: &str) -> String {
        format!("{} → {} {}{}", self.from, self.to, currency, self.amount)
    }
}

/// Outcome of settling a set of balances.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// Every balance was already within [`EPSILON`] of zero.
    AllSettled,
    /// Payments in the order they were paired.
    Transfers(Vec<Transfer>),
}

impl Settlement {
    /// Payments to make; empty when settled.
    pub fn transfers(&self) -> &[Transfer] {
        match self {
            Settlement::AllSettled => &[],
            Settlement::Transfers(transfers) => transfers,
        }
    }

    /// True when no payment is needed.
    pub fn is_settled(&self) -> bool {
        matches!(self, Settlement::AllSettled)
    }

    /// Display lines; a settled result yields the single [`ALL_SETTLED`] line.
    pub fn lines(&self, currency: &str) -> Vec<String> {
        match self {
            Settlement::AllSettled => vec![ALL_SETTLED.to_string()],
            Settlement::Transfers(transfers) => {
                transfers.iter().map(|t| t.line(currency)).collect()
            }
        }
    }
}

impl fmt::Display for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines("").join("\n"))
    }
}

/// Settle the current session, folding in the archive when `running_balance` is set.
pub fn calculate_settlements(
    results: &[PlayerResult],
    running_balance: bool,
    history: &[SessionRecord],
) -> Settlement {
    greedy_settlement(&settlement_entries(results, running_balance, history))
}

/// Balances that [`calculate_settlements`] settles: the session's own nets, or
/// the running tally when `running_balance` is set.
///
/// Check these with [`imbalance`], not the session results alone.
pub fn settlement_entries(
    results: &[PlayerResult],
    running_balance: bool,
    history: &[SessionRecord],
) -> Vec<NetEntry> {
    if running_balance {
        running_tally(history, results)
    } else {
        results.iter().map(NetEntry::from).collect()
    }
}

/// Cumulative net per player over every archived session plus the current one.
///
/// Names are merged on their canonical form; order is first appearance.
pub fn running_tally(history: &[SessionRecord], current: &[PlayerResult]) -> Vec<NetEntry> {
    let mut tally: Vec<NetEntry> = Vec::new();
    let all_results = history
        .iter()
        .flat_map(|record| record.results.iter())
        .chain(current.iter());

    for result in all_results {
        match tally.iter_mut().find(|entry| entry.name == result.name) {
            Some(entry) => entry.net += result.net,
            None => tally.push(NetEntry::from(result)),
        }
    }
    tally
}

/// Sum of all nets; anything beyond [`EPSILON`] means the session is unbalanced.
pub fn imbalance(entries: &[NetEntry]) -> Amount {
    entries.iter().map(|entry| entry.net).sum()
}

/// Pair the largest debts with the largest credits until one side runs out.
///
/// Entries must already be merged per participant.
pub fn greedy_settlement(entries: &[NetEntry]) -> Settlement {
    let mut debtors: Vec<NetEntry> = entries.iter().filter(|e| e.net < 0.0).cloned().collect();
    let mut creditors: Vec<NetEntry> = entries.iter().filter(|e| e.net > 0.0).cloned().collect();
    debtors.sort_by(|a, b| a.net.total_cmp(&b.net));
    creditors.sort_by(|a, b| b.net.total_cmp(&a.net));

    let mut transfers = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < debtors.len() && j < creditors.len() {
        let amount = debtors[i].net.abs().min(creditors[j].net);
        if amount > EPSILON {
            transfers.push(Transfer {
                from: debtors[i].name.clone(),
                to: creditors[j].name.clone(),
                amount: amount.round(),
            });
        }

        debtors[i].net += amount;
        creditors[j].net -= amount;

        if debtors[i].net.abs() < EPSILON {
            i += 1;
        }
        if creditors[j].net.abs() < EPSILON {
            j += 1;
        }
    }

    if transfers.is_empty() {
        Settlement::AllSettled
    } else {
        Settlement::Transfers(transfers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn entries(raw: &[(&str, Amount)]) -> Vec<NetEntry> {
        raw.iter().map(|(name, net)| NetEntry::new(*name, *net)).collect()
    }

    fn result(name: &str, net: Amount) -> PlayerResult {
        PlayerResult {
            name: PlayerName::new(name),
            net,
            buy_in: 500.0,
            cash_out: 500.0 + net,
            buy_in_count: 1,
        }
    }

    fn record(results: Vec<PlayerResult>) -> SessionRecord {
        SessionRecord {
            date: Utc::now(),
            name: "Friday".to_string(),
            location: "-".to_string(),
            total_pot: 0.0,
            shark: None,
            results,
            settlements: Vec::new(),
            is_running_balance: true,
            insights: None,
        }
    }

    /// Apply every transfer and return what is left per participant.
    fn residue(input: &[NetEntry], settlement: &Settlement) -> Vec<NetEntry> {
        let mut balances = input.to_vec();
        for transfer in settlement.transfers() {
            for entry in balances.iter_mut() {
                if entry.name == transfer.from {
                    entry.net += transfer.amount;
                }
                if entry.name == transfer.to {
                    entry.net -= transfer.amount;
                }
            }
        }
        balances
    }

    #[test]
    fn largest_debtor_pays_first() {
        let settlement = greedy_settlement(&entries(&[("A", -300.0), ("B", -200.0), ("C", 500.0)]));
        assert_eq!(settlement.lines("₹"), vec!["A → C ₹300", "B → C ₹200"]);
    }

    #[test]
    fn two_party_settlement_is_single_transfer() {
        let settlement = greedy_settlement(&entries(&[("A", -100.0), ("B", 100.0)]));
        assert_eq!(
            settlement,
            Settlement::Transfers(vec![Transfer {
                from: PlayerName::new("A"),
                to: PlayerName::new("B"),
                amount: 100.0,
            }])
        );
    }

    #[test]
    fn zero_nets_are_all_settled() {
        let settlement = greedy_settlement(&entries(&[("A", 0.0), ("B", 0.0)]));
        assert!(settlement.is_settled());
        assert_eq!(settlement.lines("₹"), vec![ALL_SETTLED]);
        assert!(greedy_settlement(&[]).is_settled());
        assert!(greedy_settlement(&entries(&[("A", -0.004), ("B", 0.004)])).is_settled());
    }

    proptest! {
        #[test]
        fn balanced_whole_nets_settle_exactly(
            nets in prop::collection::vec(-5_000i32..=5_000, 1..12)
        ) {
            // The last player absorbs the remainder so the nets sum to zero.
            let mut raw: Vec<Amount> = nets.iter().map(|net| Amount::from(*net)).collect();
            let total: Amount = raw.iter().sum();
            raw.push(-total);
            let input: Vec<NetEntry> = raw
                .iter()
                .enumerate()
                .map(|(index, net)| NetEntry::new(format!("P{index}"), *net))
                .collect();
            prop_assert_eq!(imbalance(&input), 0.0);

            let settlement = greedy_settlement(&input);
            let debtors = input.iter().filter(|e| e.net < 0.0).count();
            let creditors = input.iter().filter(|e| e.net > 0.0).count();
            if debtors + creditors == 0 {
                prop_assert!(settlement.is_settled());
            } else {
                prop_assert!(settlement.transfers().len() <= debtors + creditors - 1);
            }
            for entry in residue(&input, &settlement) {
                prop_assert!(entry.net.abs() < EPSILON, "{} left with {}", entry.name, entry.net);
            }
        }
    }

    #[test]
    fn transfer_amounts_are_rounded() {
        let settlement = greedy_settlement(&entries(&[("A", -100.4), ("B", 100.4)]));
        assert_eq!(settlement.transfers()[0].amount, 100.0);
    }

    #[test]
    fn running_tally_merges_history_and_current() {
        let history = vec![record(vec![result("A", -50.0), result("B", 50.0)])];
        let tally = running_tally(&history, &[result("a", -50.0), result("C", 50.0)]);
        assert_eq!(
            tally,
            vec![
                NetEntry::new("A", -100.0),
                NetEntry::new("B", 50.0),
                NetEntry::new("C", 50.0),
            ]
        );
    }

    #[test]
    fn running_balance_mode_settles_cumulative_nets() {
        let history = vec![record(vec![result("A", 200.0), result("B", -200.0)])];
        let current = vec![result("A", -200.0), result("B", 200.0)];

        let per_session = calculate_settlements(&current, false, &history);
        assert_eq!(per_session.lines("₹"), vec!["A → B ₹200"]);

        let cumulative = calculate_settlements(&current, true, &history);
        assert!(cumulative.is_settled());
    }

    #[test]
    fn running_tally_carries_earlier_imbalance() {
        // The first session was short by 200; the second balances on its own.
        let history = vec![record(vec![result("A", 300.0), result("B", -500.0)])];
        let current = vec![result("A", -100.0), result("B", 100.0)];

        assert_eq!(imbalance(&settlement_entries(&current, false, &history)), 0.0);
        let entries = settlement_entries(&current, true, &history);
        assert_eq!(imbalance(&entries), -200.0);
        assert_eq!(greedy_settlement(&entries).lines("₹"), vec!["B → A ₹200"]);
    }

    #[test]
    fn unbalanced_input_is_not_rejected() {
        // B never entered a cash-out, so the pot looks short.
        let input = entries(&[("A", 300.0), ("B", -500.0)]);
        assert_eq!(imbalance(&input), -200.0);
        let settlement = greedy_settlement(&input);
        assert_eq!(settlement.lines("$"), vec!["B → A $300"]);
    }
}
