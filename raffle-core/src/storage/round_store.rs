use crate::error::Result;
use crate::storage::Storage;
use crate::types::{Amount, RequestId, RoundResult};
use chrono::{DateTime, Utc};
use rusqlite::params;

pub struct RoundStore<'a> {
    storage: &'a Storage,
}

impl<'a> RoundStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub async fn save_round(&self, raffle_id: &str, result: &RoundResult) -> Result<()> {
        let conn = self.storage.get_connection().await;

        // Amounts exceed SQLite's integer range, so they are stored as text
        conn.execute(
            "INSERT OR REPLACE INTO rounds
             (raffle_id, round, request_id, winner, winner_index, prize, random_value, entrant_count, settled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                raffle_id,
                result.round as i64,
                result.request_id.0 as i64,
                result.winner.as_str(),
                result.winner_index as i64,
                result.prize.to_string(),
                result.random_value.to_hex(),
                result.entrant_count as i64,
                result.settled_at.timestamp(),
            ],
        )?;

        tracing::debug!("Saved round {} for raffle {}", result.round, raffle_id);
        Ok(())
    }

    /// Settled rounds, oldest first.
    pub async fn load_rounds(&self, raffle_id: &str) -> Result<Vec<RoundResult>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(
            "SELECT round, request_id, winner, winner_index, prize, random_value, entrant_count, settled_at
             FROM rounds WHERE raffle_id = ?1 ORDER BY round ASC",
        )?;

        let rows = stmt.query_map(params![raffle_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, i64>(7)?,
            ))
        })?;

        let mut rounds = Vec::new();
        for row in rows {
            let (round, request_id, winner, winner_index, prize, random_value, entrant_count, settled_at) =
                row?;

            let prize: u128 = prize.parse().map_err(|_| {
                rusqlite::Error::InvalidColumnType(4, "prize".to_string(), rusqlite::types::Type::Text)
            })?;

            rounds.push(RoundResult {
                round: round as u64,
                request_id: RequestId(request_id as u64),
                winner: winner.parse()?,
                winner_index: winner_index as u64,
                prize: Amount::from_base_units(prize),
                random_value: random_value.parse()?,
                entrant_count: entrant_count as u64,
                settled_at: DateTime::from_timestamp(settled_at, 0).unwrap_or_else(Utc::now),
            });
        }

        Ok(rounds)
    }
}
