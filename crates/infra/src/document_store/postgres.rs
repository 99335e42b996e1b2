//! Postgres-backed document store.
//!
//! Each pickup point is one row of `pickup_points`; its reception log (with
//! the embedded product stacks) is a single `JSONB` column.
//!
//! ## Conditional writes
//!
//! `apply()` runs one transaction:
//! 1. `SELECT ... FOR UPDATE` the row
//! 2. check and apply the transition in memory (domain rules)
//! 3. `UPDATE ... WHERE id = $1 AND version = $expected AND <precondition>`
//! 4. commit
//!
//! The precondition predicate is evaluated over the stored JSONB by the same
//! statement that writes. Zero affected rows is reported as a failed
//! precondition, never as success.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `AlreadyExists` (insert only) |
//! | Database (other) | any | `Unavailable` |
//! | Decode / ColumnDecode | N/A | `Corrupt` |
//! | PoolClosed / PoolTimedOut / Io / Tls | N/A | `Unavailable` |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use pvz_core::{AggregateRoot, DomainError, PickupPointId, Precondition};
use pvz_pickup::{PickupPoint, ReceptionEvent};

use super::query::{Pagination, TimeWindow};
use super::r#trait::{AppliedTransition, DocumentStore, StoreError};

const SELECT_COLUMNS: &str = "id, city, registered_at, version, receptions";

/// Postgres-backed pickup point store.
///
/// `Send + Sync`; all operations go through the SQLx connection pool.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: Arc<PgPool>,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for PostgresDocumentStore {
    #[instrument(skip(self, point), fields(pickup_point_id = %point.id_typed()), err)]
    async fn insert(&self, point: &PickupPoint) -> Result<(), StoreError> {
        let receptions = serde_json::to_value(point.receptions())
            .map_err(|e| StoreError::Corrupt(format!("receptions encoding failed: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO pickup_points (id, city, registered_at, version, receptions)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(point.id_typed().as_uuid())
        .bind(point.city().as_str())
        .bind(point.registered_at())
        .bind(version_to_db(point.version())?)
        .bind(&receptions)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::AlreadyExists(point.id_typed())
            } else {
                map_sqlx_error("insert", e)
            }
        })?;

        Ok(())
    }

    #[instrument(skip(self), fields(pickup_point_id = %id), err)]
    async fn load(&self, id: PickupPointId) -> Result<Option<PickupPoint>, StoreError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM pickup_points WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load", e))?;

        match row {
            Some(row) => Ok(Some(PickupPointRow::from_row(&row).map_err(decode_error)?.into_point()?)),
            None => Ok(None),
        }
    }

    #[instrument(
        skip(self, event),
        fields(pickup_point_id = %id, event_type = event.event_type(), version),
        err
    )]
    async fn apply(
        &self,
        id: PickupPointId,
        event: &ReceptionEvent,
    ) -> Result<AppliedTransition, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let Some(mut point) = lock_row(&mut tx, id).await? else {
            rollback(tx).await?;
            return Err(StoreError::NotFound(id));
        };

        let expected_version = point.version();
        let outcome = match point.transition(event) {
            Ok(outcome) => outcome,
            Err(err) => {
                rollback(tx).await?;
                return Err(err.into());
            }
        };

        let receptions = serde_json::to_value(point.receptions())
            .map_err(|e| StoreError::Corrupt(format!("receptions encoding failed: {e}")))?;

        let guards = guards_for(event);
        let guard = guards
            .iter()
            .map(|(sql, _)| *sql)
            .collect::<Vec<_>>()
            .join(" AND ");
        let sql = format!(
            r#"
            UPDATE pickup_points
               SET receptions = $2, version = version + 1
             WHERE id = $1
               AND version = $3
               AND {guard}
            "#
        );
        let result = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(&receptions)
            .bind(version_to_db(expected_version)?)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("conditional_update", e))?;

        if result.rows_affected() == 0 {
            let precondition = failed_precondition(&mut tx, id, guards).await?;
            rollback(tx).await?;
            tracing::debug!(precondition = %precondition, "conditional update matched no rows");
            return Err(StoreError::Rejected(DomainError::Precondition(precondition)));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("version", point.version());
        Ok(AppliedTransition { point, outcome })
    }

    #[instrument(skip(self), fields(count), err)]
    async fn list_in_interval(
        &self,
        window: TimeWindow,
        pagination: Pagination,
    ) -> Result<Vec<PickupPoint>, StoreError> {
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
              FROM pickup_points
             WHERE EXISTS (
                   SELECT 1
                     FROM jsonb_array_elements(receptions) AS reception
                    WHERE (reception->>'opened_at')::timestamptz <= $1
                      AND (reception->>'closed_at' IS NULL
                           OR (reception->>'closed_at')::timestamptz >= $2)
             )
             ORDER BY registered_at ASC, id ASC
             LIMIT $3 OFFSET $4
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(window.end())
            .bind(window.start())
            .bind(i64::from(pagination.limit))
            .bind(i64::from(pagination.offset))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_in_interval", e))?;

        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            points.push(PickupPointRow::from_row(&row).map_err(decode_error)?.into_point()?);
        }

        Span::current().record("count", points.len());
        Ok(points)
    }
}

/// Lock the row for the rest of the transaction and decode it.
async fn lock_row(
    tx: &mut Transaction<'_, Postgres>,
    id: PickupPointId,
) -> Result<Option<PickupPoint>, StoreError> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM pickup_points WHERE id = $1 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_row", e))?;

    match row {
        Some(row) => Ok(Some(PickupPointRow::from_row(&row).map_err(decode_error)?.into_point()?)),
        None => Ok(None),
    }
}

async fn rollback(tx: Transaction<'_, Postgres>) -> Result<(), StoreError> {
    tx.rollback()
        .await
        .map_err(|e| map_sqlx_error("rollback", e))
}

type Guard = (&'static str, Precondition);

/// SQL predicates over the stored reception array that must hold for `event`,
/// each with the precondition it stands for, in reporting order.
fn guards_for(event: &ReceptionEvent) -> &'static [Guard] {
    const NO_OPEN: &str = "NOT EXISTS (SELECT 1 FROM jsonb_array_elements(receptions) AS r \
                           WHERE r->>'closed_at' IS NULL)";
    const HAS_OPEN: &str = "EXISTS (SELECT 1 FROM jsonb_array_elements(receptions) AS r \
                            WHERE r->>'closed_at' IS NULL)";
    const OPEN_WITH_PRODUCTS: &str = "EXISTS (SELECT 1 FROM jsonb_array_elements(receptions) AS r \
                                      WHERE r->>'closed_at' IS NULL \
                                      AND jsonb_array_length(COALESCE(r->'products', '[]'::jsonb)) > 0)";

    // The guard runs against the pre-update row.
    const OPENED: &[Guard] = &[(NO_OPEN, Precondition::ReceptionAlreadyOpen)];
    const NEEDS_OPEN: &[Guard] = &[(HAS_OPEN, Precondition::NoOpenReception)];
    const REMOVED: &[Guard] = &[
        (HAS_OPEN, Precondition::NoOpenReception),
        (OPEN_WITH_PRODUCTS, Precondition::EmptyProductStack),
    ];

    match event {
        ReceptionEvent::ReceptionOpened(_) => OPENED,
        ReceptionEvent::ProductAdded(_) | ReceptionEvent::ReceptionClosed(_) => NEEDS_OPEN,
        ReceptionEvent::LastProductRemoved(_) => REMOVED,
    }
}

/// First guard that does not hold for the locked row.
///
/// Falls back to the last guard when all of them hold, which means the
/// version check was what failed.
async fn failed_precondition(
    tx: &mut Transaction<'_, Postgres>,
    id: PickupPointId,
    guards: &[Guard],
) -> Result<Precondition, StoreError> {
    for (guard, precondition) in guards {
        let sql = format!("SELECT {guard} AS holds FROM pickup_points WHERE id = $1");
        let holds: Option<bool> = sqlx::query_scalar(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("classify_rejection", e))?;
        if holds != Some(true) {
            return Ok(*precondition);
        }
    }
    guards
        .last()
        .map(|(_, precondition)| *precondition)
        .ok_or_else(|| StoreError::Corrupt("transition without a guard".to_string()))
}

fn version_to_db(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version).map_err(|_| StoreError::Corrupt(format!("version {version} out of range")))
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(format!("failed to decode pickup point row: {err}"))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Unavailable(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("decode error in {operation}: {err}"))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {operation}"))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {operation}: {err}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

// SQLx row types

#[derive(Debug)]
struct PickupPointRow {
    id: uuid::Uuid,
    city: String,
    registered_at: DateTime<Utc>,
    version: i64,
    receptions: serde_json::Value,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for PickupPointRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(PickupPointRow {
            id: row.try_get("id")?,
            city: row.try_get("city")?,
            registered_at: row.try_get("registered_at")?,
            version: row.try_get("version")?,
            receptions: row.try_get("receptions")?,
        })
    }
}

impl PickupPointRow {
    /// Reassemble the nested document and run it through the structural checks.
    fn into_point(self) -> Result<PickupPoint, StoreError> {
        if self.version < 0 {
            return Err(StoreError::Corrupt(format!(
                "pickup point {} has negative version {}",
                self.id, self.version
            )));
        }
        let document = json!({
            "id": self.id,
            "city": self.city,
            "registered_at": self.registered_at,
            "version": self.version,
            "receptions": self.receptions,
        });
        Ok(PickupPoint::from_json(document)?)
    }
}
