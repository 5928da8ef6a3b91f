use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use courier_chatlog::ChatLogReader;
use courier_db::Database;
use courier_gateway::Hub;
use courier_types::events::BridgeEvent;
use courier_types::models::Direction;

/// Multiplier applied to the poll interval while cycles are failing.
const ERROR_BACKOFF_FACTOR: u32 = 5;

/// Drives the checkpointed poll loop: foreign log -> local store -> hub.
///
/// The checkpoint is single-writer; only this engine advances it.
pub struct SyncEngine {
    db: Arc<Database>,
    reader: Arc<ChatLogReader>,
    hub: Hub,
    interval: Duration,
}

impl SyncEngine {
    pub fn new(
        db: Arc<Database>,
        reader: Arc<ChatLogReader>,
        hub: Hub,
        interval: Duration,
    ) -> Self {
        Self {
            db,
            reader,
            hub,
            interval,
        }
    }

    /// Run until `shutdown` fires.  A failed cycle backs off and retries;
    /// the loop never terminates itself on error.
    pub async fn run(self, shutdown: CancellationToken) {
        info!("Sync loop started (interval {:?})", self.interval);

        loop {
            let sleep = match self.run_cycle().await {
                Ok(0) => self.interval,
                Ok(absorbed) => {
                    debug!("Absorbed {} foreign rows", absorbed);
                    self.interval
                }
                Err(e) => {
                    error!("Sync cycle failed: {:#}", e);
                    self.interval * ERROR_BACKOFF_FACTOR
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(sleep) => {}
            }
        }

        info!("Sync loop stopped");
    }

    /// One poll cycle.  Per row: persist, emit, then advance the checkpoint.
    /// Persisting before advancing makes a crash between the two a
    /// redelivery on restart, never a loss; advancing per-row bounds the
    /// redelivery window to the rows of the interrupted cycle.
    pub async fn run_cycle(&self) -> Result<usize> {
        let checkpoint = self.db.checkpoint()?;
        let rows = self.reader.list_new_rows(checkpoint)?;
        let absorbed = rows.len();

        for row in rows {
            let direction = if row.is_from_me {
                Direction::Outbound
            } else {
                Direction::Inbound
            };

            let message = self.db.insert_message(&row.sender_id, &row.text, direction)?;
            self.hub.broadcast(BridgeEvent::from_message(&message)).await;
            self.db.advance_checkpoint(row.foreign_id)?;
        }

        Ok(absorbed)
    }
}
