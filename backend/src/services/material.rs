//! Material catalogue reads

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::Material;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Material service
#[derive(Clone)]
pub struct MaterialService {
    db: PgPool,
}

/// Query filters for listing materials
#[derive(Debug, Default, Deserialize)]
pub struct MaterialListQuery {
    pub search: Option<String>,
    /// Only materials at or below this stock level
    pub max_stock: Option<Decimal>,
}

#[derive(Debug, FromRow)]
struct MaterialRow {
    id: Uuid,
    name: String,
    color: Option<String>,
    unit: String,
    unit_price: Decimal,
    opening_stock: Decimal,
    quantity_in_stock: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MaterialRow> for Material {
    fn from(row: MaterialRow) -> Self {
        Material {
            id: row.id,
            name: row.name,
            color: row.color,
            unit: row.unit,
            unit_price: row.unit_price,
            opening_stock: row.opening_stock,
            quantity_in_stock: row.quantity_in_stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const MATERIAL_COLUMNS: &str =
    "id, name, color, unit, unit_price, opening_stock, quantity_in_stock, created_at, updated_at";

impl MaterialService {
    /// Create a new MaterialService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List materials by name
    pub async fn list(&self, query: MaterialListQuery) -> AppResult<Vec<Material>> {
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let rows = sqlx::query_as::<_, MaterialRow>(&format!(
            r#"
            SELECT {}
            FROM materials
            WHERE ($1::TEXT IS NULL OR name ILIKE $1)
              AND ($2::NUMERIC IS NULL OR quantity_in_stock <= $2)
            ORDER BY name
            "#,
            MATERIAL_COLUMNS
        ))
        .bind(search)
        .bind(query.max_stock)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get material by ID
    pub async fn get(&self, material_id: Uuid) -> AppResult<Material> {
        sqlx::query_as::<_, MaterialRow>(&format!(
            "SELECT {} FROM materials WHERE id = $1",
            MATERIAL_COLUMNS
        ))
        .bind(material_id)
        .fetch_optional(&self.db)
        .await?
        .map(Into::into)
        .ok_or_else(|| AppError::NotFound("Material".to_string()))
    }
}
