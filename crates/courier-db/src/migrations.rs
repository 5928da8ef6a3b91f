use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Additive, idempotent schema setup, safe to run on every startup.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            sender_id   TEXT NOT NULL,
            text        TEXT NOT NULL,
            direction   TEXT NOT NULL CHECK (direction IN ('inbound', 'outbound')),
            timestamp   REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_sender_timestamp
            ON messages(sender_id, timestamp);

        CREATE TABLE IF NOT EXISTS sync_state (
            id                   INTEGER PRIMARY KEY CHECK (id = 1),
            last_foreign_row_id  INTEGER NOT NULL DEFAULT 0
        );

        -- Seed the single checkpoint row
        INSERT OR IGNORE INTO sync_state (id, last_foreign_row_id) VALUES (1, 0);
        ",
    )?;

    info!("Local store migrations complete");
    Ok(())
}
