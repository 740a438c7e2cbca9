//! Stock ledger: the single write path for material stock
//!
//! Every change to `materials.quantity_in_stock` goes through [`record`], which
//! locks the material row, applies the movement and appends exactly one
//! `stock_transactions` row inside the caller's database transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    LedgerReconciliation, PaginatedResponse, Pagination, PaginationMeta, StockDirection,
    StockMovement, StockTransaction,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Ledger service for stand-alone stock movements and ledger queries
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

/// Stock-relevant columns of a locked material row
#[derive(Debug, Clone, FromRow)]
pub struct MaterialStock {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub unit_price: Decimal,
    pub quantity_in_stock: Decimal,
}

/// Result of one ledger write
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub transaction: StockTransaction,
    pub material_name: String,
    pub new_stock: Decimal,
}

/// Row for ledger queries
#[derive(Debug, FromRow)]
struct StockTransactionRow {
    id: Uuid,
    material_id: Uuid,
    direction: String,
    quantity: Decimal,
    quantity_type: String,
    unit_price: Decimal,
    total_cost: Decimal,
    motif: String,
    reference: Option<String>,
    user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<StockTransactionRow> for StockTransaction {
    type Error = AppError;

    fn try_from(row: StockTransactionRow) -> Result<Self, Self::Error> {
        Ok(StockTransaction {
            id: row.id,
            material_id: row.material_id,
            direction: row
                .direction
                .parse()
                .map_err(|e: shared::ParseEnumError| AppError::Internal(e.to_string()))?,
            quantity: row.quantity,
            quantity_type: row.quantity_type,
            unit_price: row.unit_price,
            total_cost: row.total_cost,
            motif: row.motif,
            reference: row.reference,
            user_id: row.user_id,
            created_at: row.created_at,
        })
    }
}

const TRANSACTION_COLUMNS: &str = "id, material_id, direction, quantity, quantity_type, unit_price, \
     total_cost, motif, reference, user_id, created_at";

/// Input for a manual stock adjustment
#[derive(Debug, Deserialize, Validate)]
pub struct AdjustStockInput {
    pub direction: StockDirection,
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    pub reference: Option<String>,
    pub user_id: Option<Uuid>,
}

/// One line of a multi-material deduction
#[derive(Debug, Serialize, Deserialize)]
pub struct MaterialQuantityInput {
    pub material_id: Uuid,
    pub quantity: Decimal,
}

/// Input for deducting several materials at once
#[derive(Debug, Deserialize, Validate)]
pub struct DeductMaterialsInput {
    #[validate(length(min = 1))]
    pub materials: Vec<MaterialQuantityInput>,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    pub reference: Option<String>,
    pub user_id: Option<Uuid>,
}

/// Outcome of one material deduction, as reported to callers
#[derive(Debug, Clone, Serialize)]
pub struct DeductedMaterial {
    pub material_id: Uuid,
    pub material_name: String,
    pub transaction_id: Uuid,
    pub quantity_deducted: Decimal,
    pub new_stock: Decimal,
    pub total_cost: Decimal,
}

impl From<&LedgerEntry> for DeductedMaterial {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            material_id: entry.transaction.material_id,
            material_name: entry.material_name.clone(),
            transaction_id: entry.transaction.id,
            quantity_deducted: entry.transaction.quantity,
            new_stock: entry.new_stock,
            total_cost: entry.transaction.total_cost,
        }
    }
}

// ============================================================================
// Transaction-scoped primitives
// ============================================================================

/// Lock material rows in ascending id order and return their stock levels.
///
/// Missing ids are simply absent from the map.
pub async fn lock_materials(
    conn: &mut PgConnection,
    material_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, MaterialStock>> {
    let rows = sqlx::query_as::<_, MaterialStock>(
        r#"
        SELECT id, name, unit, unit_price, quantity_in_stock
        FROM materials
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(material_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(|m| (m.id, m)).collect())
}

/// Apply one stock movement and append its ledger row.
///
/// Outgoing movements fail with `InsufficientStock` when they exceed the locked
/// stock level; nothing is written in that case. The caller owns the transaction.
pub async fn record(conn: &mut PgConnection, movement: &StockMovement) -> AppResult<LedgerEntry> {
    shared::validate_motif(&movement.motif).map_err(|m| AppError::validation("reason", m))?;

    let material = sqlx::query_as::<_, MaterialStock>(
        r#"
        SELECT id, name, unit, unit_price, quantity_in_stock
        FROM materials
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(movement.material_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Material {}", movement.material_id)))?;

    let new_stock = shared::apply_movement(
        material.id,
        material.quantity_in_stock,
        movement.direction,
        movement.quantity,
    )
    .map_err(|e| AppError::from(e).with_material_name(Some(&material.name)))?;

    sqlx::query("UPDATE materials SET quantity_in_stock = $1, updated_at = NOW() WHERE id = $2")
        .bind(new_stock)
        .bind(material.id)
        .execute(&mut *conn)
        .await?;

    let total_cost = shared::movement_cost(material.id, movement.quantity, material.unit_price)?;
    let row = sqlx::query_as::<_, StockTransactionRow>(&format!(
        r#"
        INSERT INTO stock_transactions (
            material_id, direction, quantity, quantity_type, unit_price,
            total_cost, motif, reference, user_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {}
        "#,
        TRANSACTION_COLUMNS
    ))
    .bind(material.id)
    .bind(movement.direction.as_str())
    .bind(movement.quantity)
    .bind(&material.unit)
    .bind(material.unit_price)
    .bind(total_cost)
    .bind(&movement.motif)
    .bind(&movement.reference)
    .bind(movement.user_id)
    .fetch_one(&mut *conn)
    .await?;

    tracing::debug!(
        material_id = %material.id,
        direction = movement.direction.as_str(),
        quantity = %movement.quantity,
        new_stock = %new_stock,
        "Stock movement recorded"
    );

    Ok(LedgerEntry {
        transaction: row.try_into()?,
        material_name: material.name,
        new_stock,
    })
}

/// Running total of movement costs
pub fn add_cost(total: Decimal, cost: Decimal) -> AppResult<Decimal> {
    total
        .checked_add(cost)
        .ok_or_else(|| AppError::validation("quantity", "Total cost is out of range"))
}

/// Outgoing movement
pub async fn deduct(conn: &mut PgConnection, movement: StockMovement) -> AppResult<LedgerEntry> {
    debug_assert_eq!(movement.direction, StockDirection::Out);
    record(conn, &movement).await
}

/// Incoming movement; stock has no ceiling
pub async fn restore(conn: &mut PgConnection, movement: StockMovement) -> AppResult<LedgerEntry> {
    debug_assert_eq!(movement.direction, StockDirection::In);
    record(conn, &movement).await
}

/// Ledger rows carrying a reference (a batch reference, an order id...)
pub async fn transactions_for_reference(
    conn: &mut PgConnection,
    reference: &str,
) -> AppResult<Vec<StockTransaction>> {
    let rows = sqlx::query_as::<_, StockTransactionRow>(&format!(
        "SELECT {} FROM stock_transactions WHERE reference = $1 ORDER BY created_at, id",
        TRANSACTION_COLUMNS
    ))
    .bind(reference)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
}

impl LedgerService {
    /// Create a new LedgerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Manually move stock in or out of one material
    pub async fn adjust(&self, material_id: Uuid, input: AdjustStockInput) -> AppResult<LedgerEntry> {
        input.validate()?;
        shared::validate_positive_quantity(input.quantity)
            .map_err(|m| AppError::validation("quantity", m))?;

        let movement = StockMovement {
            material_id,
            direction: input.direction,
            quantity: input.quantity,
            motif: input.reason,
            reference: input.reference,
            user_id: input.user_id,
        };

        let mut tx = self.db.begin().await?;
        let entry = record(&mut tx, &movement).await?;
        tx.commit().await?;

        tracing::info!(
            material_id = %material_id,
            direction = movement.direction.as_str(),
            quantity = %movement.quantity,
            "Stock adjusted"
        );

        Ok(entry)
    }

    /// Deduct several materials one after the other in a single transaction.
    ///
    /// All rows are locked up front in id order; deductions then follow request
    /// order. The first shortage aborts the call and rolls back every earlier deduction.
    pub async fn deduct_materials(&self, input: DeductMaterialsInput) -> AppResult<Vec<DeductedMaterial>> {
        input.validate()?;
        for line in &input.materials {
            shared::validate_positive_quantity(line.quantity)
                .map_err(|m| AppError::validation("materials.quantity", m))?;
        }

        let mut tx = self.db.begin().await?;
        lock_materials(
            &mut tx,
            &shared::lock_order(input.materials.iter().map(|line| line.material_id)),
        )
        .await?;
        let mut deducted = Vec::with_capacity(input.materials.len());

        for line in &input.materials {
            let movement = StockMovement::out(line.material_id, line.quantity, input.reason.clone())
                .with_reference(input.reference.clone())
                .by(input.user_id);
            let entry = deduct(&mut tx, movement).await?;
            deducted.push(DeductedMaterial::from(&entry));
        }

        tx.commit().await?;

        tracing::info!(
            materials = deducted.len(),
            reference = ?input.reference,
            "Materials deducted from stock"
        );

        Ok(deducted)
    }

    /// Paginated ledger of one material, newest first
    pub async fn list_material_transactions(
        &self,
        material_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<PaginatedResponse<StockTransaction>> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM materials WHERE id = $1)")
            .bind(material_id)
            .fetch_one(&self.db)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Material".to_string()));
        }

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM stock_transactions WHERE material_id = $1",
        )
        .bind(material_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, StockTransactionRow>(&format!(
            r#"
            SELECT {}
            FROM stock_transactions
            WHERE material_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(material_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<AppResult<Vec<StockTransaction>>>()?;

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(&pagination, total.max(0) as u64),
        })
    }

    /// Compare a material's stock counter with its opening stock plus ledger movements
    pub async fn reconcile(&self, material_id: Uuid) -> AppResult<LedgerReconciliation> {
        let (opening_stock, actual_stock) = sqlx::query_as::<_, (Decimal, Decimal)>(
            "SELECT opening_stock, quantity_in_stock FROM materials WHERE id = $1",
        )
        .bind(material_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Material".to_string()))?;

        let movements = sqlx::query_as::<_, (String, Decimal)>(
            "SELECT direction, quantity FROM stock_transactions WHERE material_id = $1",
        )
        .bind(material_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|(direction, quantity)| {
            direction
                .parse::<StockDirection>()
                .map(|d| (d, quantity))
                .map_err(|e| AppError::Internal(e.to_string()))
        })
        .collect::<AppResult<Vec<_>>>()?;

        let report = shared::reconcile(material_id, opening_stock, actual_stock, movements);
        if !report.is_balanced() {
            tracing::warn!(
                material_id = %material_id,
                drift = %report.drift,
                "Stock counter disagrees with ledger"
            );
        }

        Ok(report)
    }
}
