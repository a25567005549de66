//! Course rosters, class sessions, and an attendance ledger that stays consistent with
//! enrollment.

pub mod calculator;
pub mod cli;
pub mod db;
pub mod display;
pub mod error;
pub mod input;
pub mod ledger;
pub mod manager;
pub mod models;
pub mod mutate;
pub mod reconcile;
pub mod roster;
pub mod schema;
pub mod sessions;
pub mod settings;

pub use error::{Error, Result};

use crate::manager::AttendanceManager;
use crate::settings::Settings;

/// Connects to the database named by the loaded [`Settings`].
pub fn create_default_manager(settings: &Settings) -> Result<AttendanceManager> {
    AttendanceManager::connect(&settings.database.url)
}
