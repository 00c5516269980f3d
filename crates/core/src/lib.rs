#![warn(clippy::all, missing_docs)]

//! Core domain logic for ChipCheck.
//!
//! This crate hosts the ledger, statistics and settlement engines,
//! the session archive and player registry, configuration handling,
//! and the persistence layer used by the terminal UI.

pub mod archive;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod names;
pub mod registry;
pub mod session;
pub mod settlement;
pub mod stats;
pub mod store;
pub mod summary;
pub mod templates;
pub mod validate;

/// Monetary amount in the session currency.
pub type Amount = f64;

pub use archive::{SessionArchive, SessionRecord};
pub use clock::{Clock, SystemClock};
pub use config::AppConfig;
pub use error::{PersistError, ValidationError};
pub use ledger::{Ledger, Participant};
pub use names::PlayerName;
pub use registry::{Registry, RegistryEntry};
pub use session::{ActiveSession, Persisted, SessionConfig, SessionController};
pub use settlement::{Settlement, Transfer};
pub use stats::{Insights, PlayerResult};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use summary::{ChartRow, ChartRows, SessionSummary};
pub use templates::{SessionTemplate, TemplateBook};
