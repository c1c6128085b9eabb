use crate::config::Network;
use crate::coordinator::RaffleSnapshot;
use crate::error::{RaffleError, Result};
use crate::provider::MockState;
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaffleRecord {
    pub id: String,
    pub name: String,
    pub network: Network,
    pub created_at: DateTime<Utc>,
    pub snapshot: RaffleSnapshot,
}

pub struct RaffleStore<'a> {
    storage: &'a Storage,
}

impl<'a> RaffleStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_raffle(&self, record: &RaffleRecord) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT INTO raffles (id, name, network, created_at, config, snapshot)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET snapshot = excluded.snapshot",
            params![
                record.id,
                record.name,
                record.network.to_string(),
                record.created_at.timestamp(),
                serde_json::to_string(&record.snapshot.config)?,
                serde_json::to_string(&record.snapshot)?,
            ],
        )?;

        Ok(())
    }

    pub async fn load_raffle(&self, name: &str) -> Result<RaffleRecord> {
        let conn = self.storage.get_connection().await;

        let row = conn
            .query_row(
                "SELECT id, name, network, created_at, snapshot FROM raffles WHERE name = ?1",
                params![name],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| RaffleError::RaffleNotFound {
                name: name.to_string(),
            })?;

        into_record(row)
    }

    pub async fn list_raffles(&self) -> Result<Vec<RaffleRecord>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT id, name, network, created_at, snapshot
             FROM raffles ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut raffles = Vec::new();
        for row in rows {
            raffles.push(into_record(row?)?);
        }

        Ok(raffles)
    }

    pub async fn raffle_exists(&self, name: &str) -> Result<bool> {
        let conn = self.storage.get_connection().await;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM raffles WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    pub async fn delete_raffle(&self, raffle_id: &str) -> Result<()> {
        let conn = self.storage.get_connection().await;

        // Delete in order due to foreign key constraints
        conn.execute("DELETE FROM events WHERE raffle_id = ?1", params![raffle_id])?;
        conn.execute("DELETE FROM rounds WHERE raffle_id = ?1", params![raffle_id])?;
        conn.execute(
            "DELETE FROM mock_providers WHERE raffle_id = ?1",
            params![raffle_id],
        )?;
        conn.execute("DELETE FROM raffles WHERE id = ?1", params![raffle_id])?;

        Ok(())
    }

    pub async fn save_mock_state(&self, raffle_id: &str, state: &MockState) -> Result<()> {
        let conn = self.storage.get_connection().await;

        conn.execute(
            "INSERT OR REPLACE INTO mock_providers (raffle_id, state) VALUES (?1, ?2)",
            params![raffle_id, serde_json::to_string(state)?],
        )?;

        Ok(())
    }

    pub async fn load_mock_state(&self, raffle_id: &str) -> Result<Option<MockState>> {
        let conn = self.storage.get_connection().await;

        let state: Option<String> = conn
            .query_row(
                "SELECT state FROM mock_providers WHERE raffle_id = ?1",
                params![raffle_id],
                |row| row.get(0),
            )
            .optional()?;

        match state {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

fn into_record(row: (String, String, String, i64, String)) -> Result<RaffleRecord> {
    let (id, name, network, created_at, snapshot) = row;

    Ok(RaffleRecord {
        id,
        name,
        network: network.parse()?,
        created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
        snapshot: serde_json::from_str(&snapshot)?,
    })
}
