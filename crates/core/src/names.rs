//! Player name canonicalisation.
//!
//! Every lookup keyed by a player name goes through [`PlayerName`], so
//! `bob`, `BOB` and ` Bob ` all land on the same ledger and registry entry.

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Normalise a raw name to "first letter uppercase, remainder lowercase".
pub fn canonicalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => {
            let mut result = String::with_capacity(trimmed.len());
            // Multi-char expansions (`ß` -> `SS`) would not survive a second pass.
            let mut upper = first.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(single), None) => result.push(single),
                _ => result.push(first),
            }
            result.push_str(&chars.as_str().to_lowercase());
            result
        }
        None => String::new(),
    }
}

/// Canonicalised player name used as the key for all per-player records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerName(String);

impl PlayerName {
    /// Build a name from raw user input, canonicalising it.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(canonicalize(raw.as_ref()))
    }

    /// Borrow the canonical form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the canonical form is empty (blank input).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PlayerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PlayerName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Serialize for PlayerName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PlayerName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_case_variants() {
        assert_eq!(canonicalize("bOB"), "Bob");
        assert_eq!(canonicalize("Bob"), "Bob");
        assert_eq!(canonicalize("  alice "), "Alice");
        assert_eq!(canonicalize(""), "");
        assert_eq!(canonicalize("élodie"), "Élodie");
    }

    #[test]
    fn canonicalize_is_idempotent() {
        for input in ["bOB", "mary ann", "ÅSA", "x", "   ", "o'NEIL", "ß"] {
            let once = canonicalize(input);
            assert_eq!(canonicalize(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn deserialize_canonicalizes() {
        let name: PlayerName = serde_json::from_str("\"rAHUL\"").expect("valid json");
        assert_eq!(name.as_str(), "Rahul");
        assert_eq!(serde_json::to_string(&name).expect("serialize"), "\"Rahul\"");
    }
}
