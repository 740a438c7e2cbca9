//! Production batch lifecycle: start, deduct, cancel, complete and report
//!
//! Each mutating operation runs in one database transaction. Any error drops the
//! transaction before it is reported, so a batch is never left half-deducted.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    calculate_requirements, generate_batch_reference, restore_quantities, Batch, BatchMaterialUsage,
    BatchStatus, DeductionMode, DuplicateConfiguration, ProductType, ProductionPlan, RequirementSet,
    RestoreSource, StockError, StockMovement, StockTransaction,
};
use sqlx::{types::Json, FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::config::ProductionConfig;
use crate::error::{AppError, AppResult};
use crate::services::configuration::{MaterialConfigurationSource, ProductionProduct};
use crate::services::ledger::{self, DeductedMaterial, LedgerEntry, MaterialStock};

/// Batch service driving production runs and their stock effects
#[derive(Clone)]
pub struct BatchService {
    db: PgPool,
    production: ProductionConfig,
}

fn default_true() -> bool {
    true
}

/// Input for starting production
#[derive(Debug, Deserialize, Validate)]
pub struct StartProductionInput {
    pub product_id: Uuid,
    #[serde(default)]
    pub product_type: ProductType,
    #[validate(range(max = 1000000))]
    pub quantity_to_produce: u32,
    pub sizes_breakdown: Option<BTreeMap<String, u32>>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub user_id: Option<Uuid>,
    /// `false` creates the batch without touching stock; stock is then deducted
    /// later from actually consumed quantities
    #[serde(default = "default_true")]
    pub deduct_stock: bool,
}

/// Result of starting production
#[derive(Debug, Serialize)]
pub struct StartProductionResult {
    pub success: bool,
    pub batch_id: Uuid,
    pub batch_reference: String,
    pub deduction_mode: DeductionMode,
    pub total_cost: Decimal,
    pub materials: Vec<DeductedMaterial>,
    pub duplicate_configurations: Vec<DuplicateConfiguration>,
}

/// Input for deducting stock from actually consumed quantities
#[derive(Debug, Deserialize)]
pub struct DeductActualInput {
    pub batch_id: Uuid,
    /// Quantity consumed per produced piece, keyed by material id
    pub materials_quantities: HashMap<Uuid, Decimal>,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DeductActualResult {
    pub success: bool,
    pub transactions: Vec<DeductedMaterial>,
    pub total_cost: Decimal,
}

/// Input for cancelling a batch, addressed by its reference
#[derive(Debug, Deserialize, Validate)]
pub struct CancelBatchInput {
    #[validate(length(min = 1, max = 64))]
    pub batch_id: String,
    #[validate(length(min = 1, max = 2000))]
    pub cancellation_reason: String,
    pub cancelled_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoredMaterial {
    pub material_id: Uuid,
    pub material_name: String,
    pub quantity_restored: Decimal,
    pub new_stock: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CancelBatchResult {
    pub success: bool,
    pub batch_reference: String,
    pub materials_restored: Vec<RestoredMaterial>,
    pub transactions_created: Vec<Uuid>,
}

/// Batch with the stock it actually consumed
#[derive(Debug, Serialize)]
pub struct BatchDetail {
    #[serde(flatten)]
    pub batch: Batch,
    pub materials_used: Vec<BatchMaterialUsage>,
}

/// One material in a live requirement estimate
#[derive(Debug, Clone, Serialize)]
pub struct EstimatedMaterial {
    pub material_id: Uuid,
    pub material_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_cost: Decimal,
    pub quantity_in_stock: Decimal,
}

/// What the batch's plan would consume under the current configuration
#[derive(Debug, Serialize)]
pub struct BatchEstimate {
    pub batch_id: Uuid,
    pub batch_reference: String,
    pub materials: Vec<EstimatedMaterial>,
    pub total_cost: Decimal,
    pub duplicate_configurations: Vec<DuplicateConfiguration>,
}

/// Query filters for listing batches
#[derive(Debug, Default, Deserialize)]
pub struct BatchListQuery {
    pub status: Option<BatchStatus>,
    pub product_id: Option<Uuid>,
}

/// Row for batch queries
#[derive(Debug, FromRow)]
struct BatchRow {
    id: Uuid,
    batch_reference: String,
    product_id: Uuid,
    product_type: String,
    quantity_to_produce: i32,
    sizes_breakdown: Json<ProductionPlan>,
    status: String,
    deduction_mode: String,
    total_materials_cost: Decimal,
    notes: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    cancelled_by: Option<Uuid>,
}

impl TryFrom<BatchRow> for Batch {
    type Error = AppError;

    fn try_from(row: BatchRow) -> Result<Self, Self::Error> {
        let corrupt = |e: shared::ParseEnumError| AppError::Internal(e.to_string());
        Ok(Batch {
            id: row.id,
            batch_reference: row.batch_reference,
            product_id: row.product_id,
            product_type: row.product_type.parse().map_err(corrupt)?,
            quantity_to_produce: u32::try_from(row.quantity_to_produce)
                .map_err(|_| AppError::Internal("negative quantity_to_produce".to_string()))?,
            sizes_breakdown: row.sizes_breakdown.0,
            status: row.status.parse().map_err(corrupt)?,
            deduction_mode: row.deduction_mode.parse().map_err(corrupt)?,
            total_materials_cost: row.total_materials_cost,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            cancelled_at: row.cancelled_at,
            cancellation_reason: row.cancellation_reason,
            cancelled_by: row.cancelled_by,
        })
    }
}

#[derive(Debug, FromRow)]
struct UsageRow {
    id: Uuid,
    batch_id: Uuid,
    material_id: Uuid,
    material_name: String,
    quantity_used: Decimal,
    unit_cost: Decimal,
    total_cost: Decimal,
    transaction_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<UsageRow> for BatchMaterialUsage {
    fn from(row: UsageRow) -> Self {
        BatchMaterialUsage {
            id: row.id,
            batch_id: row.batch_id,
            material_id: row.material_id,
            material_name: row.material_name,
            quantity_used: row.quantity_used,
            unit_cost: row.unit_cost,
            total_cost: row.total_cost,
            transaction_id: row.transaction_id,
            created_at: row.created_at,
        }
    }
}

const BATCH_COLUMNS: &str = "id, batch_reference, product_id, product_type, quantity_to_produce, \
     sizes_breakdown, status, deduction_mode, total_materials_cost, notes, created_by, created_at, \
     started_at, completed_at, cancelled_at, cancellation_reason, cancelled_by";

/// Map a pre-check failure to an error naming the material
fn shortage_error(e: StockError, locked: &HashMap<Uuid, MaterialStock>) -> AppError {
    let name = match &e {
        StockError::Insufficient { material_id, .. } => {
            locked.get(material_id).map(|m| m.name.as_str())
        }
        _ => None,
    };
    AppError::from(e).with_material_name(name)
}

fn log_duplicates(product_id: Uuid, requirements: &RequirementSet) {
    for dup in requirements.duplicates() {
        tracing::warn!(
            product_id = %product_id,
            material_id = %dup.material_id,
            size = dup.size.as_deref().unwrap_or("all"),
            "Duplicate material configuration row ignored"
        );
    }
}

async fn fetch_batch(conn: &mut PgConnection, batch_id: Uuid, for_update: bool) -> AppResult<Batch> {
    let lock = if for_update { "FOR UPDATE" } else { "" };
    let row = sqlx::query_as::<_, BatchRow>(&format!(
        "SELECT {} FROM production_batches WHERE id = $1 {}",
        BATCH_COLUMNS, lock
    ))
    .bind(batch_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;
    row.try_into()
}

async fn lock_batch_by_reference(conn: &mut PgConnection, reference: &str) -> AppResult<Batch> {
    let row = sqlx::query_as::<_, BatchRow>(&format!(
        "SELECT {} FROM production_batches WHERE batch_reference = $1 FOR UPDATE",
        BATCH_COLUMNS
    ))
    .bind(reference)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Batch {}", reference)))?;
    row.try_into()
}

async fn insert_usage(conn: &mut PgConnection, batch_id: Uuid, entry: &LedgerEntry) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO batch_materials (batch_id, material_id, quantity_used, unit_cost, total_cost, transaction_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(batch_id)
    .bind(entry.transaction.material_id)
    .bind(entry.transaction.quantity)
    .bind(entry.transaction.unit_price)
    .bind(entry.transaction.total_cost)
    .bind(entry.transaction.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Usage rows actually recorded for a batch
async fn historical_usage(conn: &mut PgConnection, batch_id: Uuid) -> AppResult<Vec<BatchMaterialUsage>> {
    let rows = sqlx::query_as::<_, UsageRow>(
        r#"
        SELECT bm.id, bm.batch_id, bm.material_id, m.name AS material_name, bm.quantity_used,
               bm.unit_cost, bm.total_cost, bm.transaction_id, bm.created_at
        FROM batch_materials bm
        JOIN materials m ON m.id = bm.material_id
        WHERE bm.batch_id = $1
        ORDER BY bm.created_at, bm.material_id
        "#,
    )
    .bind(batch_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Release the product unless another active batch still produces it
async fn release_product(
    conn: &mut PgConnection,
    source: MaterialConfigurationSource,
    batch: &Batch,
) -> AppResult<()> {
    let still_active = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM production_batches
            WHERE product_id = $1 AND product_type = $2 AND id <> $3
              AND status IN ('planifie', 'en_cours')
        )
        "#,
    )
    .bind(batch.product_id)
    .bind(batch.product_type.as_str())
    .bind(batch.id)
    .fetch_one(&mut *conn)
    .await?;

    if !still_active {
        source.set_in_production(conn, batch.product_id, false).await?;
    }
    Ok(())
}

impl BatchService {
    /// Create a new BatchService instance
    pub fn new(db: PgPool, production: ProductionConfig) -> Self {
        Self { db, production }
    }

    fn display_cost(&self, cost: Decimal) -> Decimal {
        cost.round_dp(self.production.cost_scale)
    }

    fn next_reference(&self, product_type: ProductType) -> String {
        generate_batch_reference(
            self.production.reference_prefix(product_type),
            Utc::now().date_naive(),
            &Uuid::new_v4().simple().to_string(),
        )
    }

    /// Start production: compute requirements, check every material, deduct them
    /// all and record the batch, or change nothing.
    pub async fn start_production(&self, input: StartProductionInput) -> AppResult<StartProductionResult> {
        input.validate()?;
        shared::validate_quantity_to_produce(input.quantity_to_produce)
            .map_err(|m| AppError::validation("quantity_to_produce", m))?;
        let plan = ProductionPlan::from_breakdown(input.sizes_breakdown.clone(), input.quantity_to_produce);
        shared::validate_plan_matches_quantity(&plan, input.quantity_to_produce)
            .map_err(|m| AppError::validation("sizes_breakdown", m))?;

        let source = MaterialConfigurationSource::from(input.product_type);
        let mode = DeductionMode::at_start(input.deduct_stock);

        let mut tx = self.db.begin().await?;

        let product: ProductionProduct = source.lock_product(&mut tx, input.product_id).await?;
        if !product.materials_configured {
            return Err(AppError::validation(
                "product_id",
                "No materials configured for this product",
            ));
        }

        let rows = source.requirements(&mut tx, product.id).await?;
        let requirements = calculate_requirements(&rows, &plan)?;
        log_duplicates(product.id, &requirements);

        let locked = ledger::lock_materials(&mut tx, &requirements.material_ids()).await?;
        let unit_prices: HashMap<Uuid, Decimal> =
            locked.iter().map(|(id, m)| (*id, m.unit_price)).collect();
        let estimate = requirements.priced(&unit_prices)?;

        if mode.has_deducted() {
            let on_hand: HashMap<Uuid, Decimal> =
                locked.iter().map(|(id, m)| (*id, m.quantity_in_stock)).collect();
            if let Err(e) = shared::check_availability(requirements.iter(), &on_hand) {
                tracing::warn!(product_id = %product.id, error = %e, "Production start refused");
                return Err(shortage_error(e, &locked));
            }
        }

        let reference = self.next_reference(input.product_type);
        let batch_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO production_batches (
                batch_reference, product_id, product_type, quantity_to_produce, sizes_breakdown,
                status, deduction_mode, total_materials_cost, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(&reference)
        .bind(product.id)
        .bind(input.product_type.as_str())
        .bind(input.quantity_to_produce as i32)
        .bind(Json(&plan))
        .bind(BatchStatus::Planifie.as_str())
        .bind(mode.as_str())
        .bind(estimate.total_cost)
        .bind(&input.notes)
        .bind(input.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut materials = Vec::new();
        let mut total_cost = estimate.total_cost;

        if mode.has_deducted() {
            total_cost = Decimal::ZERO;
            for (material_id, quantity) in requirements.iter() {
                let movement = StockMovement::out(material_id, quantity, format!("Production {}", reference))
                    .with_reference(Some(reference.clone()))
                    .by(input.user_id);
                let entry = ledger::deduct(&mut tx, movement).await?;
                insert_usage(&mut tx, batch_id, &entry).await?;
                total_cost = ledger::add_cost(total_cost, entry.transaction.total_cost)?;
                materials.push(DeductedMaterial::from(&entry));
            }

            sqlx::query("UPDATE production_batches SET total_materials_cost = $1 WHERE id = $2")
                .bind(total_cost)
                .bind(batch_id)
                .execute(&mut *tx)
                .await?;
        }

        source.set_in_production(&mut tx, product.id, true).await?;

        tx.commit().await?;

        tracing::info!(
            batch_id = %batch_id,
            batch_reference = %reference,
            product_id = %product.id,
            mode = mode.as_str(),
            materials = materials.len(),
            total_cost = %total_cost,
            "Production batch started"
        );

        Ok(StartProductionResult {
            success: true,
            batch_id,
            batch_reference: reference,
            deduction_mode: mode,
            total_cost: self.display_cost(total_cost),
            materials,
            duplicate_configurations: requirements.duplicates().to_vec(),
        })
    }

    /// Deduct stock for a deferred batch from the quantities actually consumed per piece.
    ///
    /// Materials are deducted one by one; the first shortage rolls back the whole call.
    pub async fn deduct_actual_quantities(&self, input: DeductActualInput) -> AppResult<DeductActualResult> {
        if input.materials_quantities.is_empty() {
            return Err(AppError::validation(
                "materials_quantities",
                "At least one material quantity is required",
            ));
        }
        for quantity in input.materials_quantities.values() {
            shared::validate_positive_quantity(*quantity)
                .map_err(|m| AppError::validation("materials_quantities", m))?;
        }

        let mut tx = self.db.begin().await?;
        let batch = fetch_batch(&mut tx, input.batch_id, true).await?;

        shared::ensure_actual_deduction_allowed(batch.status, batch.deduction_mode)
            .map_err(|e| AppError::batch_rule(&batch.batch_reference, e))?;

        let consumed = shared::actual_consumption(&input.materials_quantities, batch.quantity_to_produce)?;
        ledger::lock_materials(&mut tx, &shared::lock_order(consumed.keys().copied())).await?;
        let mut transactions = Vec::with_capacity(consumed.len());
        let mut total_cost = Decimal::ZERO;

        for (material_id, quantity) in consumed {
            let movement = StockMovement::out(
                material_id,
                quantity,
                format!("Actual consumption {}", batch.batch_reference),
            )
            .with_reference(Some(batch.batch_reference.clone()))
            .by(Some(input.user_id));
            let entry = ledger::deduct(&mut tx, movement).await?;
            insert_usage(&mut tx, batch.id, &entry).await?;
            total_cost = ledger::add_cost(total_cost, entry.transaction.total_cost)?;
            transactions.push(DeductedMaterial::from(&entry));
        }

        sqlx::query(
            "UPDATE production_batches SET deduction_mode = $1, total_materials_cost = $2 WHERE id = $3",
        )
        .bind(DeductionMode::ActualQuantities.as_str())
        .bind(total_cost)
        .bind(batch.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            batch_reference = %batch.batch_reference,
            materials = transactions.len(),
            total_cost = %total_cost,
            "Actual quantities deducted"
        );

        Ok(DeductActualResult {
            success: true,
            transactions,
            total_cost: self.display_cost(total_cost),
        })
    }

    /// Cancel a batch and give its materials back to stock.
    ///
    /// Batches deducted at creation restore what the current configuration yields for
    /// the stored plan; batches deducted from actual quantities restore their recorded
    /// usage; deferred batches restore nothing.
    pub async fn cancel_batch(&self, input: CancelBatchInput) -> AppResult<CancelBatchResult> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let batch = lock_batch_by_reference(&mut tx, &input.batch_id).await?;

        batch
            .status
            .ensure_transition(BatchStatus::Cancelled)
            .map_err(|e| AppError::batch_rule(&batch.batch_reference, e))?;

        let source = MaterialConfigurationSource::from(batch.product_type);
        let restore_source = batch.deduction_mode.restore_source();
        let configuration = match restore_source {
            RestoreSource::CurrentConfiguration => source.requirements(&mut tx, batch.product_id).await?,
            _ => Vec::new(),
        };
        let usage = match restore_source {
            RestoreSource::RecordedUsage => historical_usage(&mut tx, batch.id).await?,
            _ => Vec::new(),
        };
        if restore_source == RestoreSource::CurrentConfiguration && configuration.is_empty() {
            tracing::warn!(
                batch_reference = %batch.batch_reference,
                "Product has no material configuration left; nothing to restore"
            );
        }

        let to_restore = restore_quantities(restore_source, &configuration, &batch.sizes_breakdown, &usage)?;
        log_duplicates(batch.product_id, &to_restore);
        ledger::lock_materials(&mut tx, &to_restore.material_ids()).await?;

        let motif = format!(
            "Cancellation {}: {}",
            batch.batch_reference, input.cancellation_reason
        );
        let mut materials_restored = Vec::with_capacity(to_restore.len());
        let mut transactions_created = Vec::with_capacity(to_restore.len());

        for (material_id, quantity) in to_restore.iter() {
            let movement = StockMovement::restore(material_id, quantity, motif.clone())
                .with_reference(Some(batch.batch_reference.clone()))
                .by(input.cancelled_by);
            let entry = ledger::restore(&mut tx, movement).await?;
            transactions_created.push(entry.transaction.id);
            materials_restored.push(RestoredMaterial {
                material_id,
                material_name: entry.material_name,
                quantity_restored: quantity,
                new_stock: entry.new_stock,
            });
        }

        sqlx::query(
            r#"
            UPDATE production_batches
            SET status = $1, cancelled_at = NOW(), cancellation_reason = $2, cancelled_by = $3
            WHERE id = $4
            "#,
        )
        .bind(BatchStatus::Cancelled.as_str())
        .bind(&input.cancellation_reason)
        .bind(input.cancelled_by)
        .bind(batch.id)
        .execute(&mut *tx)
        .await?;

        release_product(&mut tx, source, &batch).await?;

        tx.commit().await?;

        tracing::info!(
            batch_reference = %batch.batch_reference,
            restored = materials_restored.len(),
            "Production batch cancelled"
        );

        Ok(CancelBatchResult {
            success: true,
            batch_reference: batch.batch_reference,
            materials_restored,
            transactions_created,
        })
    }

    /// planifie → en_cours
    pub async fn start_batch(&self, batch_id: Uuid) -> AppResult<Batch> {
        self.transition(batch_id, BatchStatus::EnCours).await
    }

    /// planifie | en_cours → termine; releases the product
    pub async fn complete_batch(&self, batch_id: Uuid) -> AppResult<Batch> {
        self.transition(batch_id, BatchStatus::Termine).await
    }

    async fn transition(&self, batch_id: Uuid, next: BatchStatus) -> AppResult<Batch> {
        let mut tx = self.db.begin().await?;
        let batch = fetch_batch(&mut tx, batch_id, true).await?;

        batch
            .status
            .ensure_transition(next)
            .map_err(|e| AppError::batch_rule(&batch.batch_reference, e))?;

        let timestamp_column = match next {
            BatchStatus::EnCours => "started_at",
            BatchStatus::Termine => "completed_at",
            _ => {
                return Err(AppError::Internal(format!(
                    "unsupported transition target {}",
                    next
                )))
            }
        };

        sqlx::query(&format!(
            "UPDATE production_batches SET status = $1, {} = NOW() WHERE id = $2",
            timestamp_column
        ))
        .bind(next.as_str())
        .bind(batch.id)
        .execute(&mut *tx)
        .await?;

        if next == BatchStatus::Termine {
            release_product(&mut tx, MaterialConfigurationSource::from(batch.product_type), &batch).await?;
        }

        let updated = fetch_batch(&mut tx, batch.id, false).await?;
        tx.commit().await?;

        tracing::info!(
            batch_reference = %updated.batch_reference,
            status = %updated.status,
            "Batch status changed"
        );

        Ok(updated)
    }

    /// Batch with its recorded material usage
    pub async fn get_batch(&self, batch_id: Uuid) -> AppResult<BatchDetail> {
        let mut conn = self.db.acquire().await?;
        let batch = fetch_batch(&mut conn, batch_id, false).await?;
        let materials_used = historical_usage(&mut conn, batch.id).await?;
        Ok(BatchDetail {
            batch,
            materials_used,
        })
    }

    /// Live recomputation of the batch's needs under the current configuration.
    ///
    /// This can differ from what was actually deducted if the configuration changed.
    pub async fn current_estimate(&self, batch_id: Uuid) -> AppResult<BatchEstimate> {
        let mut conn = self.db.acquire().await?;
        let batch = fetch_batch(&mut conn, batch_id, false).await?;
        let source = MaterialConfigurationSource::from(batch.product_type);
        let rows = source.requirements(&mut conn, batch.product_id).await?;
        let requirements = calculate_requirements(&rows, &batch.sizes_breakdown)?;

        let materials = sqlx::query_as::<_, MaterialStock>(
            "SELECT id, name, unit, unit_price, quantity_in_stock FROM materials WHERE id = ANY($1)",
        )
        .bind(requirements.material_ids())
        .fetch_all(&mut *conn)
        .await?;
        let by_id: HashMap<Uuid, MaterialStock> = materials.into_iter().map(|m| (m.id, m)).collect();
        let unit_prices: HashMap<Uuid, Decimal> = by_id.iter().map(|(id, m)| (*id, m.unit_price)).collect();
        let costs = requirements.priced(&unit_prices)?;

        let materials = costs
            .lines
            .iter()
            .filter_map(|line| {
                by_id.get(&line.material_id).map(|material| EstimatedMaterial {
                    material_id: line.material_id,
                    material_name: material.name.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    total_cost: self.display_cost(line.total_cost),
                    quantity_in_stock: material.quantity_in_stock,
                })
            })
            .collect();

        Ok(BatchEstimate {
            batch_id: batch.id,
            batch_reference: batch.batch_reference,
            materials,
            total_cost: self.display_cost(costs.total_cost),
            duplicate_configurations: requirements.duplicates().to_vec(),
        })
    }

    /// Ledger rows written for a batch
    pub async fn batch_transactions(&self, batch_id: Uuid) -> AppResult<Vec<StockTransaction>> {
        let mut conn = self.db.acquire().await?;
        let batch = fetch_batch(&mut conn, batch_id, false).await?;
        ledger::transactions_for_reference(&mut conn, &batch.batch_reference).await
    }

    /// List batches, newest first
    pub async fn list_batches(&self, query: BatchListQuery) -> AppResult<Vec<Batch>> {
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            r#"
            SELECT {}
            FROM production_batches
            WHERE ($1::VARCHAR IS NULL OR status = $1)
              AND ($2::UUID IS NULL OR product_id = $2)
            ORDER BY created_at DESC
            "#,
            BATCH_COLUMNS
        ))
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.product_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Products ready to be put into production
    pub async fn available_products(&self, product_type: ProductType) -> AppResult<Vec<ProductionProduct>> {
        let mut conn = self.db.acquire().await?;
        MaterialConfigurationSource::from(product_type)
            .available_products(&mut conn)
            .await
    }
}
