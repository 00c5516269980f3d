//! Append-only record of completed sessions, newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    names::PlayerName,
    stats::{Insights, PlayerResult},
    Amount,
};

/// Snapshot of a finished session as stored in the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// When the session was closed.
    pub date: DateTime<Utc>,
    /// Session title; may be empty.
    #[serde(default)]
    pub name: String,
    /// Venue label, `-` when none was given.
    #[serde(default)]
    pub location: String,
    /// Sum of every buy-in.
    pub total_pot: Amount,
    /// Top winner at close, if anyone played.
    #[serde(default)]
    pub shark: Option<PlayerName>,
    /// Per-player results, biggest winner first.
    #[serde(default)]
    pub results: Vec<PlayerResult>,
    /// Rendered settlement lines as shown when the session ended.
    #[serde(default)]
    pub settlements: Vec<String>,
    /// Whether settlements were computed over the running balance.
    #[serde(default)]
    pub is_running_balance: bool,
    /// Older records may not carry insights.
    #[serde(default)]
    pub insights: Option<Insights>,
}

impl SessionRecord {
    /// Title for list views: the session name, or its date when unnamed.
    pub fn title(&self) -> String {
        if self.name.trim().is_empty() {
            format!("Session {}", self.date.format("%Y-%m-%d %H:%M"))
        } else {
            self.name.clone()
        }
    }
}

/// Completed sessions, most recent first.
///
/// Records are never edited; the only removal is [`SessionArchive::clear`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionArchive {
    records: Vec<SessionRecord>,
}

impl SessionArchive {
    /// Empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a finished session.
    pub fn push(&mut self, record: SessionRecord) {
        self.records.insert(0, record);
    }

    /// Drop every record. Irreversible once persisted.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Record at `index`, where 0 is the most recent.
    pub fn get(&self, index: usize) -> Option<&SessionRecord> {
        self.records.get(index)
    }

    /// Every record, newest first.
    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    /// Records newest first.
    pub fn iter(&self) -> impl Iterator<Item = &SessionRecord> {
        self.records.iter()
    }

    /// Number of archived sessions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing is archived.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(name: &str, day: u32) -> SessionRecord {
        SessionRecord {
            date: Utc
                .with_ymd_and_hms(2024, 5, day, 23, 0, 0)
                .single()
                .expect("valid date"),
            name: name.to_string(),
            location: "-".to_string(),
            total_pot: 2000.0,
            shark: Some(PlayerName::new("rahul")),
            results: Vec::new(),
            settlements: vec!["All settled!".to_string()],
            is_running_balance: false,
            insights: None,
        }
    }

    #[test]
    fn newest_record_comes_first() {
        let mut archive = SessionArchive::new();
        archive.push(record("First", 1));
        archive.push(record("Second", 8));

        assert_eq!(archive.len(), 2);
        assert_eq!(archive.get(0).map(|r| r.name.as_str()), Some("Second"));
        assert_eq!(archive.get(1).map(|r| r.name.as_str()), Some("First"));
        assert!(archive.get(2).is_none());
    }

    #[test]
    fn clear_empties_archive() {
        let mut archive = SessionArchive::new();
        archive.push(record("Only", 1));
        archive.clear();
        assert!(archive.is_empty());
    }

    #[test]
    fn serializes_as_plain_array() -> anyhow::Result<()> {
        let mut archive = SessionArchive::new();
        archive.push(record("", 3));
        let json = serde_json::to_value(&archive)?;
        assert!(json.is_array());
        assert_eq!(json[0]["isRunningBalance"], serde_json::json!(false));

        let restored: SessionArchive = serde_json::from_value(json)?;
        assert_eq!(restored, archive);
        assert_eq!(restored.records()[0].title(), "Session 2024-05-03 23:00");
        Ok(())
    }
}
