//! Session lifecycle: setup, live ledger, close and archive.

mod controller;
mod models;

pub use controller::SessionController;
pub use models::{ActiveSession, Persisted, SessionConfig};
