//! SQLite-backed store on a `sqlx` pool.

use sqlx::SqlitePool;

use autopark_core::Plate;

use super::{LedgerStore, closed_fields};
use crate::connection::Database;
use crate::error::{StorageError, StorageResult};
use crate::models::{ActiveSessionRow, GateEvent, GateEventRow, HistoryRow, ParkingSession};

/// `LIMIT -1` is "no limit" in SQLite.
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))
}

/// Persistent [`LedgerStore`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl LedgerStore for SqliteStore {
    async fn find_active(&self, plate: &Plate) -> StorageResult<Option<ParkingSession>> {
        let row = sqlx::query_as::<_, ActiveSessionRow>(
            r#"
            SELECT plate, slot_id, entry_time
            FROM active_sessions
            WHERE plate = ?
            "#,
        )
        .bind(plate.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ParkingSession::try_from).transpose()
    }

    async fn list_active(&self) -> StorageResult<Vec<ParkingSession>> {
        let rows = sqlx::query_as::<_, ActiveSessionRow>(
            r#"
            SELECT plate, slot_id, entry_time
            FROM active_sessions
            ORDER BY slot_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ParkingSession::try_from).collect()
    }

    async fn count_active(&self) -> StorageResult<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM active_sessions")
            .fetch_one(&self.pool)
            .await?;

        usize::try_from(count)
            .map_err(|_| StorageError::Validation(format!("negative row count {count}")))
    }

    async fn insert_active(&self, session: &ParkingSession) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO active_sessions (plate, slot_id, entry_time)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(session.plate.as_str())
        .bind(i64::from(session.slot_id.as_u32()))
        .bind(session.entry_time)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from_insert)?;

        Ok(())
    }

    async fn close_session(&self, closed: &ParkingSession) -> StorageResult<()> {
        let (exit_time, fee) = closed_fields(closed)?;
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM active_sessions WHERE plate = ?")
            .bind(closed.plate.as_str())
            .execute(&mut *tx)
            .await?;

        if removed.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StorageError::not_found(
                "ParkingSession",
                "plate",
                closed.plate.as_str(),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO parking_history (plate, slot_id, entry_time, exit_time, fee_minor)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(closed.plate.as_str())
        .bind(i64::from(closed.slot_id.as_u32()))
        .bind(closed.entry_time)
        .bind(exit_time)
        .bind(fee.minor())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_history(&self, limit: Option<usize>) -> StorageResult<Vec<ParkingSession>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT id, plate, slot_id, entry_time, exit_time, fee_minor
            FROM parking_history
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ParkingSession::try_from).collect()
    }

    async fn append_event(&self, event: &GateEvent) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO gate_events (plate, direction, kind, detail, timestamp)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.plate)
        .bind(event.direction.as_str())
        .bind(event.kind.as_str())
        .bind(&event.detail)
        .bind(event.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list_events(&self, limit: Option<usize>) -> StorageResult<Vec<GateEvent>> {
        let rows = sqlx::query_as::<_, GateEventRow>(
            r#"
            SELECT id, plate, direction, kind, detail, timestamp
            FROM gate_events
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(GateEvent::try_from).collect()
    }
}
