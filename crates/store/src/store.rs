//! SQLite-backed local store.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

use depotrack_core::{MovementId, MovementKind, PartId, RemoteId, WorkOrderId};

use crate::records::{MovementWithPart, Part, StockMovement, WorkOrder};

/// Local store error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Handle to the local SQLite database.
///
/// Cheap to clone; the underlying pool is shared. The webhook listener and
/// interactive callers use clones of the same handle, with no isolation
/// beyond per-statement SQLite semantics.
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Open (creating if absent) the database file at `path` and ensure the
    /// schema exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// In-memory store for tests and dev.
    ///
    /// Pinned to a single pooled connection: every pooled connection to
    /// `sqlite::memory:` would otherwise open its own empty database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create the three tables if they do not exist yet.
    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS parts (
                id          TEXT PRIMARY KEY,
                code        TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                quantity    INTEGER NOT NULL DEFAULT 0,
                shelf       TEXT NOT NULL DEFAULT '',
                remote_id   TEXT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stock_movements (
                id          TEXT PRIMARY KEY,
                part_id     TEXT NOT NULL REFERENCES parts(id),
                kind        TEXT NOT NULL,
                quantity    INTEGER NOT NULL,
                shelf       TEXT NULL,
                remote_id   TEXT NULL,
                recorded_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS work_orders (
                id             TEXT PRIMARY KEY,
                record         TEXT NOT NULL,
                required_parts TEXT NOT NULL DEFAULT '',
                status         TEXT NOT NULL DEFAULT '',
                remote_id      TEXT NULL,
                recorded_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ---- parts ----

    /// Look up a part by its business code.
    pub async fn find_part_by_code(&self, code: &str) -> Result<Option<Part>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, code, description, quantity, shelf, remote_id
            FROM parts
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_part).transpose()
    }

    /// Look up a part by code, creating it with a zero baseline if absent.
    ///
    /// Code uniqueness is enforced by the table itself; a concurrent insert
    /// of the same code resolves by re-selecting the surviving row.
    pub async fn find_or_create_part(&self, code: &str) -> Result<Part, StoreError> {
        if let Some(part) = self.find_part_by_code(code).await? {
            return Ok(part);
        }

        let id = PartId::new();
        sqlx::query(
            r#"
            INSERT INTO parts (id, code, description, quantity, shelf, remote_id)
            VALUES (?1, ?2, '', 0, '', NULL)
            ON CONFLICT(code) DO NOTHING
            "#,
        )
        .bind(id.to_string())
        .bind(code)
        .execute(&self.pool)
        .await?;

        self.find_part_by_code(code)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("part '{code}' vanished after insert")))
    }

    pub async fn get_part(&self, id: PartId) -> Result<Option<Part>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, code, description, quantity, shelf, remote_id
            FROM parts
            WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_part).transpose()
    }

    pub async fn update_part_quantity(&self, id: PartId, quantity: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE parts SET quantity = ?2 WHERE id = ?1")
            .bind(id.to_string())
            .bind(quantity)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Update quantity and shelf together (physical count).
    pub async fn update_part_quantity_and_shelf(
        &self,
        id: PartId,
        quantity: i64,
        shelf: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE parts SET quantity = ?2, shelf = ?3 WHERE id = ?1")
            .bind(id.to_string())
            .bind(quantity)
            .bind(shelf)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Assign the remote identifier if the part does not have one yet.
    ///
    /// First successful remote create wins: once set, the identifier is never
    /// overwritten. Returns whether this call wrote it.
    pub async fn set_part_remote_id(
        &self,
        id: PartId,
        remote_id: &RemoteId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE parts
            SET remote_id = ?2
            WHERE id = ?1
              AND remote_id IS NULL
            "#,
        )
        .bind(id.to_string())
        .bind(remote_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn list_parts(&self) -> Result<Vec<Part>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, code, description, quantity, shelf, remote_id
            FROM parts
            ORDER BY code ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_part).collect()
    }

    // ---- stock movements ----

    pub async fn insert_movement(
        &self,
        part_id: PartId,
        kind: MovementKind,
        quantity: i64,
        shelf: Option<&str>,
        recorded_at: DateTime<Utc>,
    ) -> Result<StockMovement, StoreError> {
        let id = MovementId::new();

        sqlx::query(
            r#"
            INSERT INTO stock_movements (id, part_id, kind, quantity, shelf, remote_id, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6)
            "#,
        )
        .bind(id.to_string())
        .bind(part_id.to_string())
        .bind(kind.as_str())
        .bind(quantity)
        .bind(shelf)
        .bind(recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(StockMovement {
            id,
            part_id,
            kind,
            quantity,
            shelf: shelf.map(str::to_string),
            remote_id: None,
            recorded_at,
        })
    }

    pub async fn get_movement(&self, id: MovementId) -> Result<Option<StockMovement>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, part_id, kind, quantity, shelf, remote_id, recorded_at
            FROM stock_movements
            WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_movement).transpose()
    }

    /// Assign the remote identifier if the movement does not have one yet.
    pub async fn set_movement_remote_id(
        &self,
        id: MovementId,
        remote_id: &RemoteId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE stock_movements
            SET remote_id = ?2
            WHERE id = ?1
              AND remote_id IS NULL
            "#,
        )
        .bind(id.to_string())
        .bind(remote_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_movement(&self, id: MovementId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM stock_movements WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All movements joined with their part, oldest first.
    pub async fn list_movements(&self) -> Result<Vec<MovementWithPart>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.part_id, m.kind, m.quantity, m.shelf, m.remote_id, m.recorded_at,
                   p.code AS part_code, p.quantity AS part_quantity
            FROM stock_movements m
            JOIN parts p ON m.part_id = p.id
            ORDER BY m.recorded_at ASC, m.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_movement_with_part).collect()
    }

    /// Count movements only (the physical-count table), oldest first.
    pub async fn list_count_movements(&self) -> Result<Vec<MovementWithPart>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.part_id, m.kind, m.quantity, m.shelf, m.remote_id, m.recorded_at,
                   p.code AS part_code, p.quantity AS part_quantity
            FROM stock_movements m
            JOIN parts p ON m.part_id = p.id
            WHERE m.kind = 'count'
            ORDER BY m.recorded_at ASC, m.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_movement_with_part).collect()
    }

    // ---- work orders ----

    pub async fn insert_work_order(
        &self,
        record: &str,
        required_parts: &str,
        status: &str,
        recorded_at: DateTime<Utc>,
    ) -> Result<WorkOrder, StoreError> {
        let id = WorkOrderId::new();

        sqlx::query(
            r#"
            INSERT INTO work_orders (id, record, required_parts, status, remote_id, recorded_at)
            VALUES (?1, ?2, ?3, ?4, NULL, ?5)
            "#,
        )
        .bind(id.to_string())
        .bind(record)
        .bind(required_parts)
        .bind(status)
        .bind(recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(WorkOrder {
            id,
            record: record.to_string(),
            required_parts: required_parts.to_string(),
            status: status.to_string(),
            remote_id: None,
            recorded_at,
        })
    }

    /// Insert a work order unless a row with an exact match on all three text
    /// fields already exists (webhook deduplication).
    ///
    /// The check and the insert are one statement, so a duplicate push racing
    /// itself cannot insert twice. Returns the new row, or `None` when a
    /// matching row was already present.
    pub async fn insert_work_order_if_absent(
        &self,
        record: &str,
        required_parts: &str,
        status: &str,
        recorded_at: DateTime<Utc>,
    ) -> Result<Option<WorkOrder>, StoreError> {
        let id = WorkOrderId::new();

        let result = sqlx::query(
            r#"
            INSERT INTO work_orders (id, record, required_parts, status, remote_id, recorded_at)
            SELECT ?1, ?2, ?3, ?4, NULL, ?5
            WHERE NOT EXISTS (
                SELECT 1 FROM work_orders
                WHERE record = ?2 AND required_parts = ?3 AND status = ?4
            )
            "#,
        )
        .bind(id.to_string())
        .bind(record)
        .bind(required_parts)
        .bind(status)
        .bind(recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(WorkOrder {
            id,
            record: record.to_string(),
            required_parts: required_parts.to_string(),
            status: status.to_string(),
            remote_id: None,
            recorded_at,
        }))
    }

    pub async fn get_work_order(&self, id: WorkOrderId) -> Result<Option<WorkOrder>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, record, required_parts, status, remote_id, recorded_at
            FROM work_orders
            WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_work_order).transpose()
    }

    /// Assign the remote identifier if the work order does not have one yet.
    pub async fn set_work_order_remote_id(
        &self,
        id: WorkOrderId,
        remote_id: &RemoteId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE work_orders
            SET remote_id = ?2
            WHERE id = ?1
              AND remote_id IS NULL
            "#,
        )
        .bind(id.to_string())
        .bind(remote_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn delete_work_order(&self, id: WorkOrderId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM work_orders WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All work orders, newest first.
    pub async fn list_work_orders(&self) -> Result<Vec<WorkOrder>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, record, required_parts, status, remote_id, recorded_at
            FROM work_orders
            ORDER BY recorded_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_work_order).collect()
    }
}

// ---- row mapping ----

fn row_to_part(row: SqliteRow) -> Result<Part, StoreError> {
    let id_str: String = row.try_get("id")?;
    let id = id_str
        .parse::<PartId>()
        .map_err(|e| StoreError::Corrupt(format!("parts.id: {e}")))?;

    let remote_id: Option<String> = row.try_get("remote_id")?;

    Ok(Part {
        id,
        code: row.try_get("code")?,
        description: row.try_get("description")?,
        quantity: row.try_get("quantity")?,
        shelf: row.try_get("shelf")?,
        remote_id: remote_id.map(RemoteId::new),
    })
}

fn row_to_movement(row: SqliteRow) -> Result<StockMovement, StoreError> {
    let id_str: String = row.try_get("id")?;
    let id = id_str
        .parse::<MovementId>()
        .map_err(|e| StoreError::Corrupt(format!("stock_movements.id: {e}")))?;

    let part_str: String = row.try_get("part_id")?;
    let part_id = part_str
        .parse::<PartId>()
        .map_err(|e| StoreError::Corrupt(format!("stock_movements.part_id: {e}")))?;

    let kind_str: String = row.try_get("kind")?;
    let kind = kind_str
        .parse::<MovementKind>()
        .map_err(|e| StoreError::Corrupt(format!("stock_movements.kind: {e}")))?;

    let recorded_str: String = row.try_get("recorded_at")?;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("stock_movements.recorded_at: {e}")))?;

    let remote_id: Option<String> = row.try_get("remote_id")?;

    Ok(StockMovement {
        id,
        part_id,
        kind,
        quantity: row.try_get("quantity")?,
        shelf: row.try_get("shelf")?,
        remote_id: remote_id.map(RemoteId::new),
        recorded_at,
    })
}

fn row_to_movement_with_part(row: SqliteRow) -> Result<MovementWithPart, StoreError> {
    let part_code: String = row.try_get("part_code")?;
    let part_quantity: i64 = row.try_get("part_quantity")?;
    let movement = row_to_movement(row)?;

    Ok(MovementWithPart {
        movement,
        part_code,
        part_quantity,
    })
}

fn row_to_work_order(row: SqliteRow) -> Result<WorkOrder, StoreError> {
    let id_str: String = row.try_get("id")?;
    let id = id_str
        .parse::<WorkOrderId>()
        .map_err(|e| StoreError::Corrupt(format!("work_orders.id: {e}")))?;

    let recorded_str: String = row.try_get("recorded_at")?;
    let recorded_at = DateTime::parse_from_rfc3339(&recorded_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("work_orders.recorded_at: {e}")))?;

    let remote_id: Option<String> = row.try_get("remote_id")?;

    Ok(WorkOrder {
        id,
        record: row.try_get("record")?,
        required_parts: row.try_get("required_parts")?,
        status: row.try_get("status")?,
        remote_id: remote_id.map(RemoteId::new),
        recorded_at,
    })
}
