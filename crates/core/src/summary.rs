//! End-of-session summary: chart data and the plain-text share format.

use crate::{
    archive::SessionRecord,
    settlement::{Settlement, EPSILON},
    stats::{Extremes, Insights, PlayerResult, SessionStats, Standing},
    Amount,
};

/// What the summary screen shows, for a fresh or an archived session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    /// Biggest winner first.
    pub results: Vec<PlayerResult>,
    /// Biggest winner, if anyone played.
    pub shark: Option<Standing>,
    /// Biggest loser, if anyone played.
    pub atm: Option<Standing>,
    /// Largest absolute net.
    pub max_abs_val: Amount,
    /// Rendered settlement lines, or the single "All settled!" line.
    pub settlements: Vec<String>,
    /// Archived sessions from older versions may lack insights.
    pub insights: Option<Insights>,
    /// Sum of the settled nets; non-zero when cash-outs were missed.
    pub imbalance: Amount,
}

/// A bar in the winners/losers chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRow {
    /// Display name.
    pub name: String,
    /// Session net.
    pub net: Amount,
    /// `|net|` relative to the largest swing, in `0.0..=1.0`.
    pub width: f64,
}

/// Winners (including break-even) and losers, each ordered by magnitude.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartRows {
    /// Largest gain first.
    pub winners: Vec<ChartRow>,
    /// Largest loss first.
    pub losers: Vec<ChartRow>,
}

impl SessionSummary {
    /// Summary of a session that just ended.
    ///
    /// `imbalance` is the sum of the balances that were settled, which in
    /// running-balance mode spans the archive as well.
    pub fn from_stats(
        stats: SessionStats,
        settlement: &Settlement,
        imbalance: Amount,
        currency: &str,
    ) -> Self {
        Self {
            results: stats.results,
            shark: stats.shark,
            atm: stats.atm,
            max_abs_val: stats.max_abs_val,
            settlements: settlement.lines(currency),
            insights: Some(stats.insights),
            imbalance,
        }
    }

    /// Summary rebuilt from an archived record.
    pub fn from_record(record: &SessionRecord) -> Self {
        let extremes = Extremes::from_results(&record.results);
        Self {
            results: record.results.clone(),
            shark: extremes.shark,
            atm: extremes.atm,
            max_abs_val: extremes.max_abs_val,
            settlements: record.settlements.clone(),
            insights: record.insights.clone(),
            imbalance: record.results.iter().map(|r| r.net).sum(),
        }
    }

    /// True when the nets do not add up to zero.
    pub fn is_unbalanced(&self) -> bool {
        self.imbalance.abs() > EPSILON
    }

    /// Bar chart data normalised against the largest swing.
    pub fn chart_rows(&self) -> ChartRows {
        let scale = if self.max_abs_val > 0.0 {
            self.max_abs_val
        } else {
            1.0
        };
        let row = |result: &PlayerResult| ChartRow {
            name: result.name.to_string(),
            net: result.net,
            width: (result.net.abs() / scale).min(1.0),
        };

        let mut winners: Vec<&PlayerResult> = self.results.iter().filter(|r| r.net >= 0.0).collect();
        let mut losers: Vec<&PlayerResult> = self.results.iter().filter(|r| r.net < 0.0).collect();
        winners.sort_by(|a, b| b.net.total_cmp(&a.net));
        losers.sort_by(|a, b| a.net.total_cmp(&b.net));

        ChartRows {
            winners: winners.into_iter().map(row).collect(),
            losers: losers.into_iter().map(row).collect(),
        }
    }

    /// `"Rahul"` / `"+₹1500"`, or `"-"` / `"₹0"` when nobody played.
    pub fn shark_label(&self, currency: &str) -> (String, String) {
        match &self.shark {
            Some(shark) => (shark.name.to_string(), format_signed(shark.amount, currency)),
            None => ("-".to_string(), format_amount(0.0, currency)),
        }
    }

    /// `"Amit"` / `"₹-2000"`, or `"-"` / `"₹0"` when nobody played.
    pub fn atm_label(&self, currency: &str) -> (String, String) {
        match &self.atm {
            Some(atm) => (atm.name.to_string(), format_amount(atm.amount, currency)),
            None => ("-".to_string(), format_amount(0.0, currency)),
        }
    }

    /// Plain-text rendering for pasting into a chat.
    pub fn share_text(&self, currency: &str) -> String {
        let (shark_name, shark_amount) = self.shark_label(currency);
        let (atm_name, atm_amount) = self.atm_label(currency);

        let mut text = String::from("🎰 ChipCheck Results 🎰\n\n");
        text.push_str(&format!("🏆 SHARK: {shark_name} ({shark_amount})\n"));
        text.push_str(&format!("💀 DONATED: {atm_name} ({atm_amount})\n\n"));

        text.push_str("--- Settlements ---\n");
        for line in &self.settlements {
            text.push_str(line);
            text.push('\n');
        }

        text.push_str("\n--- Full Tally ---\n");
        for result in &self.results {
            text.push_str(&format!(
                "{}: {}\n",
                result.name,
                format_signed(result.net, currency)
            ));
        }
        text
    }
}

/// Whole-unit amount with the currency prefix, e.g. `₹-200`.
pub fn format_amount(value: Amount, currency: &str) -> String {
    format!("{currency}{}", whole(value))
}

/// Like [`format_amount`] with an explicit `+` for gains, e.g. `+₹200`.
pub fn format_signed(value: Amount, currency: &str) -> String {
    if whole(value) >= 0 {
        format!("+{}", format_amount(value, currency))
    } else {
        format_amount(value, currency)
    }
}

fn whole(value: Amount) -> i64 {
    value.round() as i64
}
