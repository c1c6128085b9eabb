pub mod event_store;
pub mod raffle_store;
pub mod round_store;

pub use event_store::EventStore;
pub use raffle_store::RaffleStore;
pub use round_store::RoundStore;

use crate::error::{RaffleError, Result};
use rusqlite::Connection;
use std::path::Path;
use tokio::sync::Mutex;

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RaffleError::internal(format!("Failed to create directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        conn.execute("PRAGMA foreign_keys = ON", [])?;

        // Raffles table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS raffles (
                id TEXT PRIMARY KEY,
                name TEXT UNIQUE NOT NULL,
                network TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                config TEXT NOT NULL,
                snapshot TEXT NOT NULL
            )",
            [],
        )?;

        // Mock provider state, development networks only
        conn.execute(
            "CREATE TABLE IF NOT EXISTS mock_providers (
                raffle_id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                FOREIGN KEY (raffle_id) REFERENCES raffles(id)
            )",
            [],
        )?;

        // Settled rounds
        conn.execute(
            "CREATE TABLE IF NOT EXISTS rounds (
                raffle_id TEXT NOT NULL,
                round INTEGER NOT NULL,
                request_id INTEGER NOT NULL,
                winner TEXT NOT NULL,
                winner_index INTEGER NOT NULL,
                prize TEXT NOT NULL,
                random_value TEXT NOT NULL,
                entrant_count INTEGER NOT NULL,
                settled_at INTEGER NOT NULL,
                FOREIGN KEY (raffle_id) REFERENCES raffles(id),
                PRIMARY KEY (raffle_id, round)
            )",
            [],
        )?;

        // Event log for indexers
        conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                raffle_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (raffle_id) REFERENCES raffles(id),
                PRIMARY KEY (raffle_id, seq)
            )",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
