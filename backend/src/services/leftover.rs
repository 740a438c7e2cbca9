//! Leftover materials recorded after a batch and their return to stock

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{BatchStatus, Leftover, StockMovement};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ledger;

/// Leftover service
#[derive(Clone)]
pub struct LeftoverService {
    db: PgPool,
}

fn default_reusable() -> bool {
    true
}

/// One leftover line to record
#[derive(Debug, Deserialize, Validate)]
pub struct LeftoverInput {
    pub material_id: Uuid,
    #[serde(alias = "quantity")]
    pub leftover_quantity: Decimal,
    #[serde(default = "default_reusable")]
    pub is_reusable: bool,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Input for saving the leftovers of a batch
#[derive(Debug, Deserialize, Validate)]
pub struct SaveLeftoversInput {
    pub batch_id: Uuid,
    #[validate]
    pub leftovers: Vec<LeftoverInput>,
}

/// Input for returning leftovers to stock
#[derive(Debug, Deserialize, Validate)]
pub struct ReaddLeftoversInput {
    #[validate(length(min = 1))]
    pub leftover_ids: Vec<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ReaddResult {
    pub success: bool,
    pub count: usize,
    pub transactions_created: Vec<Uuid>,
}

#[derive(Debug, FromRow)]
struct LeftoverRow {
    id: Uuid,
    batch_id: Uuid,
    material_id: Uuid,
    leftover_quantity: Decimal,
    is_reusable: bool,
    readded_to_stock: bool,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<LeftoverRow> for Leftover {
    fn from(row: LeftoverRow) -> Self {
        Leftover {
            id: row.id,
            batch_id: row.batch_id,
            material_id: row.material_id,
            leftover_quantity: row.leftover_quantity,
            is_reusable: row.is_reusable,
            readded_to_stock: row.readded_to_stock,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

const LEFTOVER_COLUMNS: &str =
    "id, batch_id, material_id, leftover_quantity, is_reusable, readded_to_stock, notes, created_at";

impl LeftoverService {
    /// Create a new LeftoverService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Leftovers recorded for a batch
    pub async fn list(&self, batch_id: Uuid) -> AppResult<Vec<Leftover>> {
        let rows = sqlx::query_as::<_, LeftoverRow>(&format!(
            "SELECT {} FROM batch_leftovers WHERE batch_id = $1 ORDER BY created_at, id",
            LEFTOVER_COLUMNS
        ))
        .bind(batch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Replace the pending leftovers of a completed batch.
    ///
    /// Rows already returned to stock stay untouched so the ledger keeps its counterpart.
    pub async fn save(&self, input: SaveLeftoversInput) -> AppResult<Vec<Leftover>> {
        input.validate()?;
        let batch_id = input.batch_id;
        for line in &input.leftovers {
            shared::validate_leftover_quantity(line.leftover_quantity)
                .map_err(|m| AppError::validation("leftover_quantity", m))?;
        }

        let mut tx = self.db.begin().await?;

        let (reference, status) = sqlx::query_as::<_, (String, String)>(
            "SELECT batch_reference, status FROM production_batches WHERE id = $1 FOR UPDATE",
        )
        .bind(batch_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;

        let status: BatchStatus = status
            .parse()
            .map_err(|e: shared::ParseEnumError| AppError::Internal(e.to_string()))?;
        if status != BatchStatus::Termine {
            return Err(AppError::InvalidStateTransition(format!(
                "Leftovers can only be recorded for completed batches; {} is {}",
                reference, status
            )));
        }

        let material_ids: Vec<Uuid> = input.leftovers.iter().map(|l| l.material_id).collect();
        let known = sqlx::query_scalar::<_, Uuid>("SELECT id FROM materials WHERE id = ANY($1)")
            .bind(&material_ids)
            .fetch_all(&mut *tx)
            .await?;
        if let Some(missing) = material_ids.iter().find(|id| !known.contains(id)) {
            return Err(AppError::NotFound(format!("Material {}", missing)));
        }

        sqlx::query("DELETE FROM batch_leftovers WHERE batch_id = $1 AND readded_to_stock = FALSE")
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;

        for line in &input.leftovers {
            sqlx::query(
                r#"
                INSERT INTO batch_leftovers (batch_id, material_id, leftover_quantity, is_reusable, notes)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(batch_id)
            .bind(line.material_id)
            .bind(line.leftover_quantity)
            .bind(line.is_reusable)
            .bind(&line.notes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            batch_reference = %reference,
            leftovers = input.leftovers.len(),
            "Leftovers saved"
        );

        self.list(batch_id).await
    }

    /// Return reusable leftovers to stock, each at most once.
    ///
    /// Unknown ids and leftovers that are not reusable or already returned are skipped.
    pub async fn readd_to_stock(&self, input: ReaddLeftoversInput) -> AppResult<ReaddResult> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let rows = sqlx::query_as::<_, LeftoverRow>(&format!(
            "SELECT {} FROM batch_leftovers WHERE id = ANY($1) ORDER BY id FOR UPDATE",
            LEFTOVER_COLUMNS
        ))
        .bind(&input.leftover_ids)
        .fetch_all(&mut *tx)
        .await?;
        let leftovers: Vec<Leftover> = rows.into_iter().map(Into::into).collect();
        let selected = shared::select_readdable(&leftovers, &input.leftover_ids);

        ledger::lock_materials(
            &mut tx,
            &shared::lock_order(
                selected
                    .iter()
                    .filter(|l| l.restock_quantity().is_some())
                    .map(|l| l.material_id),
            ),
        )
        .await?;
        let mut transactions_created = Vec::with_capacity(selected.len());

        for leftover in &selected {
            if let Some(quantity) = leftover.restock_quantity() {
                let reference = sqlx::query_scalar::<_, String>(
                    "SELECT batch_reference FROM production_batches WHERE id = $1",
                )
                .bind(leftover.batch_id)
                .fetch_one(&mut *tx)
                .await?;

                let movement = StockMovement::restore(
                    leftover.material_id,
                    quantity,
                    format!("Leftover return {}", reference),
                )
                .with_reference(Some(reference))
                .by(input.user_id);
                let entry = ledger::restore(&mut tx, movement).await?;
                transactions_created.push(entry.transaction.id);
            }

            sqlx::query("UPDATE batch_leftovers SET readded_to_stock = TRUE WHERE id = $1")
                .bind(leftover.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let skipped = input.leftover_ids.len().saturating_sub(selected.len());
        tracing::info!(
            count = selected.len(),
            skipped,
            "Leftovers returned to stock"
        );

        Ok(ReaddResult {
            success: true,
            count: selected.len(),
            transactions_created,
        })
    }
}
