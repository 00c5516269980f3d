//! Named presets for starting a session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{error::ValidationError, Amount};

/// Settings a template fills in on the setup screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTemplate {
    /// Venue label.
    #[serde(default)]
    pub location: String,
    /// Default buy-in applied to new players and quick top-ups.
    pub buy_in: Amount,
    /// Chip denominations, kept as entered.
    #[serde(default, alias = "denoms")]
    pub denominations: Vec<String>,
    /// Whether sessions started from this template settle the running balance.
    #[serde(default, alias = "running")]
    pub running_balance: bool,
}

/// Templates keyed by their free-form name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateBook {
    templates: BTreeMap<String, SessionTemplate>,
}

impl TemplateBook {
    /// Store or overwrite a template.
    pub fn save(&mut self, name: &str, template: SessionTemplate) -> Result<(), ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyTemplateName);
        }
        self.templates.insert(name.to_string(), template);
        Ok(())
    }

    /// Remove a template, returning it if it existed.
    pub fn delete(&mut self, name: &str) -> Option<SessionTemplate> {
        self.templates.remove(name.trim())
    }

    /// Look up a template by name.
    pub fn get(&self, name: &str) -> Option<&SessionTemplate> {
        self.templates.get(name.trim())
    }

    /// Template names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    /// Number of stored templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True when no template is stored.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
