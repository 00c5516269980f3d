//! Net results and session insights derived from a ledger snapshot.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ledger::Participant, names::PlayerName, Amount};

/// Rebuy count dominates the tightness score; net deviation only breaks ties.
const TIGHTNESS_REBUY_WEIGHT: Amount = 10_000.0;

/// Final figures for one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResult {
    /// Canonical player name.
    pub name: PlayerName,
    /// `cash_out - buy_in`.
    pub net: Amount,
    /// Total bought in.
    pub buy_in: Amount,
    /// Chips cashed out.
    #[serde(default)]
    pub cash_out: Amount,
    /// Buy-ins including the first.
    #[serde(default)]
    pub buy_in_count: u32,
}

impl From<&Participant> for PlayerResult {
    fn from(participant: &Participant) -> Self {
        Self {
            name: participant.name.clone(),
            net: participant.net(),
            buy_in: participant.buy_in,
            cash_out: participant.cash_out,
            buy_in_count: participant.buy_in_count,
        }
    }
}

/// A named amount, used for the shark and the ATM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    /// Who.
    pub name: PlayerName,
    /// Their net.
    pub amount: Amount,
}

/// Participant with the most buy-ins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuyLeader {
    /// Who.
    pub name: PlayerName,
    /// Buy-ins including the first.
    pub count: u32,
}

/// Wall-clock length of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDuration {
    /// Whole hours.
    pub hours: i64,
    /// Minutes past the hour.
    pub minutes: i64,
}

impl SessionDuration {
    /// Elapsed time between `start` and `now`, clamped at zero.
    pub fn between(start: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let elapsed = (now - start).max(chrono::Duration::zero());
        Self {
            hours: elapsed.num_hours(),
            minutes: elapsed.num_minutes() % 60,
        }
    }
}

impl fmt::Display for SessionDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h {}m", self.hours, self.minutes)
    }
}

/// Session-level trivia shown next to the results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    /// Largest absolute net.
    pub biggest_swing: Amount,
    /// Only set when someone bought in more than once.
    pub most_rebuys: Option<RebuyLeader>,
    /// Fewest buy-ins, then smallest swing.
    pub tightest: Option<PlayerName>,
    /// Unknown when the start time was not recorded.
    pub duration: Option<SessionDuration>,
    /// Average total buy-in per participant, rounded.
    pub avg_buy_in: Amount,
}

impl Insights {
    /// `"Amit (3)"`, or `-`.
    pub fn most_rebuys_label(&self) -> String {
        self.most_rebuys
            .as_ref()
            .map(|leader| format!("{} ({})", leader.name, leader.count))
            .unwrap_or_else(|| "-".to_string())
    }

    /// Tightest player's name, or `-`.
    pub fn tightest_label(&self) -> String {
        self.tightest
            .as_ref()
            .map(PlayerName::to_string)
            .unwrap_or_else(|| "-".to_string())
    }

    /// `"2h 30m"`, or `-`.
    pub fn duration_label(&self) -> String {
        self.duration
            .map(|duration| duration.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// Everything the summary screen needs about a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// Sorted by net, biggest winner first.
    pub results: Vec<PlayerResult>,
    /// Biggest winner.
    pub shark: Option<Standing>,
    /// Biggest loser.
    pub atm: Option<Standing>,
    /// Largest absolute net; scales the bar chart.
    pub max_abs_val: Amount,
    /// Trivia for the summary screen.
    pub insights: Insights,
}

/// Best and worst net plus the largest swing over a set of results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extremes {
    /// Highest net seen.
    pub shark: Option<Standing>,
    /// Lowest net seen.
    pub atm: Option<Standing>,
    /// Largest absolute net seen.
    pub max_abs_val: Amount,
}

impl Extremes {
    /// Fold a single result in; ties keep the first one seen.
    pub fn observe(&mut self, name: &PlayerName, net: Amount) {
        if self.shark.as_ref().map_or(true, |best| net > best.amount) {
            self.shark = Some(Standing {
                name: name.clone(),
                amount: net,
            });
        }
        if self.atm.as_ref().map_or(true, |worst| net < worst.amount) {
            self.atm = Some(Standing {
                name: name.clone(),
                amount: net,
            });
        }
        self.max_abs_val = self.max_abs_val.max(net.abs());
    }

    /// Extremes of stored results, e.g. when reopening an archived session.
    pub fn from_results(results: &[PlayerResult]) -> Self {
        let mut extremes = Self::default();
        for result in results {
            extremes.observe(&result.name, result.net);
        }
        extremes
    }
}

/// Compute results and insights in a single pass over the ledger.
///
/// `participants` must be in insertion order so ties resolve deterministically.
pub fn calculate_session_stats(
    participants: &[Participant],
    started_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> SessionStats {
    let mut results = Vec::with_capacity(participants.len());
    let mut extremes = Extremes::default();
    let mut most_rebuys: Option<RebuyLeader> = None;
    let mut tightest: Option<(PlayerName, Amount)> = None;
    let mut total_buy_in = 0.0;

    for participant in participants {
        let result = PlayerResult::from(participant);
        extremes.observe(&result.name, result.net);
        total_buy_in += result.buy_in;

        if most_rebuys
            .as_ref()
            .map_or(true, |leader| result.buy_in_count > leader.count)
        {
            most_rebuys = Some(RebuyLeader {
                name: result.name.clone(),
                count: result.buy_in_count,
            });
        }

        let score = Amount::from(result.buy_in_count) * TIGHTNESS_REBUY_WEIGHT + result.net.abs();
        if tightest.as_ref().map_or(true, |(_, best)| score < *best) {
            tightest = Some((result.name.clone(), score));
        }

        results.push(result);
    }

    results.sort_by(|a, b| b.net.total_cmp(&a.net));

    let avg_buy_in = if participants.is_empty() {
        0.0
    } else {
        (total_buy_in / participants.len() as Amount).round()
    };

    let insights = Insights {
        biggest_swing: extremes.max_abs_val,
        most_rebuys: most_rebuys.filter(|leader| leader.count > 1),
        tightest: tightest.map(|(name, _)| name),
        duration: started_at.map(|start| SessionDuration::between(start, now)),
        avg_buy_in,
    };

    SessionStats {
        results,
        shark: extremes.shark,
        atm: extremes.atm,
        max_abs_val: extremes.max_abs_val,
        insights,
    }
}
