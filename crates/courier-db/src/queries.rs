use crate::Database;
use anyhow::Result;
use rusqlite::params;

use courier_types::models::{Conversation, Direction, Message};

impl Database {
    // -- Messages --

    /// Append a message.  Assigns the local id and a now-timestamp; the row
    /// is committed before this returns.
    pub fn insert_message(
        &self,
        sender_id: &str,
        text: &str,
        direction: Direction,
    ) -> Result<Message> {
        let timestamp = now_epoch();

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (sender_id, text, direction, timestamp) VALUES (?1, ?2, ?3, ?4)",
                params![sender_id, text, direction.as_str(), timestamp],
            )?;

            Ok(Message {
                id: conn.last_insert_rowid(),
                sender_id: sender_id.to_string(),
                text: text.to_string(),
                direction,
                timestamp,
            })
        })
    }

    /// The `limit` most recent messages for a counterparty, oldest first.
    pub fn history(&self, sender_id: &str, limit: u32) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, text, direction, timestamp
                 FROM messages
                 WHERE sender_id = ?1
                 ORDER BY timestamp DESC, id DESC
                 LIMIT ?2",
            )?;

            let mut rows = stmt
                .query_map(params![sender_id, limit], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.reverse();
            Ok(rows)
        })
    }

    /// Latest message per counterparty in the local store, most recent first.
    pub fn conversations(&self) -> Result<Vec<Conversation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT sender_id,
                        MAX(timestamp) AS last_timestamp,
                        (SELECT text FROM messages m2
                         WHERE m2.sender_id = m1.sender_id
                         ORDER BY m2.timestamp DESC, m2.id DESC LIMIT 1) AS last_message
                 FROM messages m1
                 GROUP BY sender_id
                 ORDER BY last_timestamp DESC",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(Conversation {
                        sender_id: row.get(0)?,
                        last_timestamp: row.get(1)?,
                        last_message: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        unread_count: 0,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Checkpoint --

    /// Highest foreign-log row id fully absorbed into the local store.
    pub fn checkpoint(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let id = conn.query_row(
                "SELECT last_foreign_row_id FROM sync_state WHERE id = 1",
                [],
                |row| row.get(0),
            )?;
            Ok(id)
        })
    }

    /// Move the checkpoint forward.  The guard keeps it monotonic: a stale
    /// or equal value leaves the stored checkpoint untouched.
    pub fn advance_checkpoint(&self, foreign_row_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE sync_state SET last_foreign_row_id = ?1
                 WHERE id = 1 AND last_foreign_row_id <= ?1",
                [foreign_row_id],
            )?;
            Ok(())
        })
    }
}

fn map_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let direction: String = row.get(3)?;
    let direction = direction.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(Message {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        text: row.get(2)?,
        direction,
        timestamp: row.get(4)?,
    })
}

fn now_epoch() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn open_test_db() -> Database {
        Database::open(Path::new(":memory:")).unwrap()
    }

    #[test]
    fn insert_assigns_increasing_ids() {
        let db = open_test_db();

        let first = db
            .insert_message("+15551234567", "hi", Direction::Inbound)
            .unwrap();
        let second = db
            .insert_message("+15551234567", "yo", Direction::Outbound)
            .unwrap();

        assert!(second.id > first.id);
        assert!(second.timestamp >= first.timestamp);
    }

    #[test]
    fn history_is_ordered_and_capped() {
        let db = open_test_db();

        for i in 0..5 {
            db.insert_message("+15551234567", &format!("m{i}"), Direction::Inbound)
                .unwrap();
        }
        db.insert_message("+15559999999", "other", Direction::Inbound)
            .unwrap();

        let history = db.history("+15551234567", 3).unwrap();
        let texts: Vec<&str> = history.iter().map(|m| m.text.as_str()).collect();

        // The 3 most recent, oldest first
        assert_eq!(texts, ["m2", "m3", "m4"]);
        for pair in history.windows(2) {
            assert!((pair[0].timestamp, pair[0].id) < (pair[1].timestamp, pair[1].id));
        }
    }

    #[test]
    fn conversations_aggregate_latest_message() {
        let db = open_test_db();

        db.insert_message("+15551111111", "first", Direction::Inbound)
            .unwrap();
        db.insert_message("+15552222222", "hello", Direction::Inbound)
            .unwrap();
        db.insert_message("+15551111111", "latest", Direction::Outbound)
            .unwrap();

        let conversations = db.conversations().unwrap();
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].sender_id, "+15551111111");
        assert_eq!(conversations[0].last_message, "latest");
    }

    #[test]
    fn checkpoint_defaults_to_zero() {
        let db = open_test_db();
        assert_eq!(db.checkpoint().unwrap(), 0);
    }

    #[test]
    fn checkpoint_is_monotonic() {
        let db = open_test_db();

        db.advance_checkpoint(10).unwrap();
        assert_eq!(db.checkpoint().unwrap(), 10);

        // Equal value is a safe no-op
        db.advance_checkpoint(10).unwrap();
        assert_eq!(db.checkpoint().unwrap(), 10);

        // A stale value never moves it backward
        db.advance_checkpoint(5).unwrap();
        assert_eq!(db.checkpoint().unwrap(), 10);

        db.advance_checkpoint(42).unwrap();
        assert_eq!(db.checkpoint().unwrap(), 42);
    }

    #[test]
    fn migrations_are_idempotent() {
        let db = open_test_db();
        db.with_conn(|conn| {
            crate::migrations::run(conn)?;
            crate::migrations::run(conn)
        })
        .unwrap();
        assert_eq!(db.checkpoint().unwrap(), 0);
    }
}
