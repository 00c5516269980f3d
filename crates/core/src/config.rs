//! Application configuration.
//!
//! Settings are read from `~/.config/chipcheck/config.toml` and can be
//! overridden with `CHIPCHECK_*` environment variables, e.g.
//! `CHIPCHECK_DEFAULT_BUY_IN=1000` or `CHIPCHECK_CHIP_DENOMINATIONS=5,25,100`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::{store::FileStore, Amount};

/// Directory under the user's config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "chipcheck";
/// Configuration file name.
pub const CONFIG_FILE: &str = "config.toml";

/// User-tunable settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where sessions, history, registry and templates are stored.
    pub data_dir: PathBuf,
    /// Prefix used when rendering amounts.
    pub currency_symbol: String,
    /// Buy-in pre-filled on the setup screen.
    pub default_buy_in: Amount,
    /// Chip denominations pre-filled on the setup screen.
    pub chip_denominations: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: FileStore::default_root(),
            currency_symbol: "₹".to_string(),
            default_buy_in: 500.0,
            chip_denominations: ["10", "25", "50", "100", "500"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
        }
    }
}

impl AppConfig {
    /// Load from the default config path plus environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load from `path` (optional) plus environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default(
                "data_dir",
                defaults.data_dir.to_string_lossy().into_owned(),
            )?
            .set_default("currency_symbol", defaults.currency_symbol)?
            .set_default("default_buy_in", defaults.default_buy_in)?
            .set_default("chip_denominations", defaults.chip_denominations)?
            .add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("CHIPCHECK")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("chip_denominations"),
            )
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("invalid config {}", path.display()))
    }
}

/// Default location of the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Write a commented default config file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    ensure_default_config_at(&path)?;
    Ok(path)
}

/// Same as [`ensure_default_config`] for an explicit path.
pub fn ensure_default_config_at(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, default_config_contents())
        .with_context(|| format!("failed to write config {}", path.display()))
}

fn default_config_contents() -> String {
    let defaults = AppConfig::default();
    let denominations = defaults
        .chip_denominations
        .iter()
        .map(|d| format!("\"{d}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "# ChipCheck settings\n\
         \n\
         # Where session data is stored.\n\
         data_dir = '{}'\n\
         currency_symbol = \"{}\"\n\
         default_buy_in = {:.1}\n\
         chip_denominations = [{}]\n",
        defaults.data_dir.display(),
        defaults.currency_symbol,
        defaults.default_buy_in,
        denominations,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("absent.toml"))?;
        assert_eq!(config.currency_symbol, AppConfig::default().currency_symbol);
        assert_eq!(config.chip_denominations.len(), 5);
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "currency_symbol = \"$\"\ndefault_buy_in = 20.0\nchip_denominations = [\"1\", \"5\"]\n",
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.default_buy_in, 20.0);
        assert_eq!(config.chip_denominations, vec!["1".to_string(), "5".to_string()]);
        Ok(())
    }

    #[test]
    fn generated_default_file_parses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join(CONFIG_FILE);
        ensure_default_config_at(&path)?;
        assert!(path.exists());

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.default_buy_in, 500.0);
        assert_eq!(config.data_dir, AppConfig::default().data_dir);

        // Existing files are left alone.
        fs::write(&path, "default_buy_in = 100.0\n")?;
        ensure_default_config_at(&path)?;
        assert_eq!(AppConfig::load_from(&path)?.default_buy_in, 100.0);
        Ok(())
    }
}
