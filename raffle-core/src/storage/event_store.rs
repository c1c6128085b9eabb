use crate::error::Result;
use crate::storage::Storage;
use crate::types::RaffleEvent;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub seq: u64,
    pub event: RaffleEvent,
    pub created_at: DateTime<Utc>,
}

pub struct EventStore<'a> {
    storage: &'a Storage,
}

impl<'a> EventStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Append events after the raffle's current last sequence number.
    pub async fn append(&self, raffle_id: &str, events: &[RaffleEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;

        let last: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq), 0) FROM events WHERE raffle_id = ?1",
            params![raffle_id],
            |row| row.get(0),
        )?;

        let now = Utc::now().timestamp();
        for (offset, event) in events.iter().enumerate() {
            tx.execute(
                "INSERT INTO events (raffle_id, seq, kind, payload, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    raffle_id,
                    last + 1 + offset as i64,
                    event.kind(),
                    serde_json::to_string(event)?,
                    now,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub async fn load_events(&self, raffle_id: &str) -> Result<Vec<StoredEvent>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT seq, payload, created_at FROM events WHERE raffle_id = ?1 ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map(params![raffle_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (seq, payload, created_at) = row?;
            events.push(StoredEvent {
                seq: seq as u64,
                event: serde_json::from_str(&payload)?,
                created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
            });
        }

        Ok(events)
    }
}
