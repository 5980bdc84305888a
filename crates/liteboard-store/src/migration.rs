//! Database schema migrations for SQLite.
//!
//! Versioned: each migration moves the schema from version N to N+1 and is
//! recorded in `schema_migrations`.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, strftime('%s', 'now'))",
                rusqlite::params![version],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: grants and share tokens.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per (user, content_type, action); kept unique by the mutator
        CREATE TABLE grants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            content_type TEXT NOT NULL,
            action TEXT NOT NULL,
            content_ids BLOB NOT NULL,         -- CBOR array of content ids
            version INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE share_tokens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            token TEXT NOT NULL UNIQUE,
            project_id INTEGER NOT NULL,
            permission_level TEXT NOT NULL,    -- 'read' or 'write'
            created_at INTEGER NOT NULL,       -- Unix seconds
            expires_at INTEGER NOT NULL        -- Unix seconds
        );

        CREATE INDEX idx_grants_key ON grants(user_id, content_type, action);
        CREATE INDEX idx_grants_content_type ON grants(content_type);
        CREATE INDEX idx_share_tokens_project ON share_tokens(project_id);
        "#,
    )?;

    Ok(())
}
