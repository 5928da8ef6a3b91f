use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use rusqlite::{Connection, OpenFlags, params};
use tracing::info;

use courier_types::models::Conversation;

/// Offset between the Apple epoch (2001-01-01) and the Unix epoch, seconds.
const APPLE_EPOCH_OFFSET: i64 = 978_307_200;

/// A raw row from the foreign message log, in foreign coordinates.
#[derive(Debug, Clone)]
pub struct ForeignRow {
    pub foreign_id: i64,
    pub sender_id: String,
    pub text: String,
    pub is_from_me: bool,
    pub timestamp: f64,
}

/// Read-only adapter over the Messages.app store.  The file belongs to a
/// hostile neighbor: it may be absent, appear later, or be locked mid-query.
/// Absence reads as an empty log; everything else surfaces as an error for
/// the caller to retry.
pub struct ChatLogReader {
    path: PathBuf,
    service: String,
    conn: Mutex<Option<Connection>>,
}

impl ChatLogReader {
    pub fn new(path: impl Into<PathBuf>, service: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            service: service.into(),
            conn: Mutex::new(None),
        }
    }

    /// Rows newer than `since`, ascending by foreign row id.  Only rows for
    /// the configured service are reported; NULL text (attachment-only rows)
    /// reads as empty.
    pub fn list_new_rows(&self, since: i64) -> Result<Vec<ForeignRow>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT message.ROWID,
                        handle.id,
                        COALESCE(message.text, ''),
                        message.is_from_me,
                        message.date
                 FROM message
                 INNER JOIN handle ON message.handle_id = handle.ROWID
                 WHERE message.ROWID > ?1 AND handle.service = ?2
                 ORDER BY message.ROWID ASC",
            )?;

            let rows = stmt
                .query_map(params![since, self.service], |row| {
                    Ok(ForeignRow {
                        foreign_id: row.get(0)?,
                        sender_id: row.get(1)?,
                        text: row.get(2)?,
                        is_from_me: row.get::<_, i64>(3)? != 0,
                        timestamp: apple_to_unix(row.get(4)?),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })?;

        Ok(rows.unwrap_or_default())
    }

    /// One row per phone-number counterparty on the configured service,
    /// ordered by last activity, most recent first.
    pub fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT handle.id,
                        MAX(message.date) AS last_date,
                        (SELECT COALESCE(m2.text, '') FROM message m2
                         WHERE m2.handle_id = handle.ROWID
                         ORDER BY m2.date DESC LIMIT 1) AS last_message
                 FROM handle
                 INNER JOIN message ON message.handle_id = handle.ROWID
                 WHERE handle.service = ?1
                 GROUP BY handle.id
                 ORDER BY last_date DESC",
            )?;

            let rows = stmt
                .query_map(params![self.service], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })?;

        Ok(rows
            .unwrap_or_default()
            .into_iter()
            // Other channels share the store; only phone-number handles are
            // conversations the bridge can address.
            .filter(|(sender_id, _, _)| sender_id.starts_with('+'))
            .map(|(sender_id, last_date, last_message)| Conversation {
                sender_id,
                last_message: last_message.unwrap_or_default(),
                last_timestamp: apple_to_unix(last_date),
                // TODO: derive unread counts from the foreign store's is_read column
                unread_count: 0,
            })
            .collect())
    }

    /// Run `f` against the read-only connection, opening it lazily.  Returns
    /// `Ok(None)` while the foreign store file does not exist.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<Option<T>> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("chat log lock poisoned: {}", e))?;

        if guard.is_none() {
            if !self.path.exists() {
                return Ok(None);
            }
            let conn = Connection::open_with_flags(
                &self.path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            info!("Connected to foreign message log at {}", self.path.display());
            *guard = Some(conn);
        }

        match guard.as_ref() {
            Some(conn) => f(conn).map(Some),
            None => Ok(None),
        }
    }
}

fn apple_to_unix(date: i64) -> f64 {
    date as f64 / 1e9 + APPLE_EPOCH_OFFSET as f64
}
