//! Opening SQLite connections with the pragmas and schema the rest of the crate relies on.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// How long a writer waits on another connection's lock before giving up, in milliseconds.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Connects to the `sqlite3` database at `database_url` and brings its schema up to date.
///
/// Foreign keys are switched on for every connection, since cascading deletes of sessions and
/// students are how attendance records get removed.
pub fn connect(database_url: &str) -> Result<SqliteConnection> {
    let mut conn =
        SqliteConnection::establish(database_url).map_err(|source| Error::Connection {
            url: database_url.to_string(),
            source,
        })?;

    conn.batch_execute(&format!(
        "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"
    ))?;

    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(Error::Migration)?
        .len();

    if applied == 0 {
        debug!(database_url, "schema is up to date");
    } else {
        info!(database_url, count = applied, "applied migrations");
    }

    Ok(conn)
}
