//! Material configuration sources
//!
//! Regular and sub-contracted products keep their material configuration in
//! parallel tables. The source is resolved once per batch from its product type.

use rust_decimal::Decimal;
use serde::Serialize;
use shared::{MaterialRequirement, ProductType};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Where a product and its material configuration live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialConfigurationSource {
    Regular,
    SubContracted,
}

/// Product columns the production core reads and writes
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductionProduct {
    pub id: Uuid,
    pub name: String,
    pub materials_configured: bool,
    pub in_production: bool,
}

#[derive(Debug, FromRow)]
struct RequirementRow {
    material_id: Uuid,
    quantity_needed: Decimal,
    size: Option<String>,
    notes: Option<String>,
}

impl From<RequirementRow> for MaterialRequirement {
    fn from(row: RequirementRow) -> Self {
        MaterialRequirement {
            material_id: row.material_id,
            quantity_needed: row.quantity_needed,
            size: row.size,
            notes: row.notes,
        }
    }
}

impl From<ProductType> for MaterialConfigurationSource {
    fn from(product_type: ProductType) -> Self {
        match product_type {
            ProductType::Regular => MaterialConfigurationSource::Regular,
            ProductType::Soustraitance => MaterialConfigurationSource::SubContracted,
        }
    }
}

impl MaterialConfigurationSource {
    fn products_table(&self) -> &'static str {
        match self {
            MaterialConfigurationSource::Regular => "products",
            MaterialConfigurationSource::SubContracted => "soustraitance_products",
        }
    }

    fn requirements_table(&self) -> &'static str {
        match self {
            MaterialConfigurationSource::Regular => "product_materials",
            MaterialConfigurationSource::SubContracted => "soustraitance_product_materials",
        }
    }

    /// Load and lock the product row
    pub async fn lock_product(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
    ) -> AppResult<ProductionProduct> {
        sqlx::query_as::<_, ProductionProduct>(&format!(
            "SELECT id, name, materials_configured, in_production FROM {} WHERE id = $1 FOR UPDATE",
            self.products_table()
        ))
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Configuration rows in insertion order, which decides which duplicate counts
    pub async fn requirements(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
    ) -> AppResult<Vec<MaterialRequirement>> {
        let rows = sqlx::query_as::<_, RequirementRow>(&format!(
            r#"
            SELECT material_id, quantity_needed, size, notes
            FROM {}
            WHERE product_id = $1
            ORDER BY id
            "#,
            self.requirements_table()
        ))
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Flag the product as being produced (or released) so it leaves (or rejoins)
    /// the available-for-production list
    pub async fn set_in_production(
        &self,
        conn: &mut PgConnection,
        product_id: Uuid,
        in_production: bool,
    ) -> AppResult<()> {
        sqlx::query(&format!(
            "UPDATE {} SET in_production = $1 WHERE id = $2",
            self.products_table()
        ))
        .bind(in_production)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Products with a material configuration that are not currently in production
    pub async fn available_products(&self, conn: &mut PgConnection) -> AppResult<Vec<ProductionProduct>> {
        let products = sqlx::query_as::<_, ProductionProduct>(&format!(
            r#"
            SELECT id, name, materials_configured, in_production
            FROM {}
            WHERE materials_configured = TRUE AND in_production = FALSE
            ORDER BY name
            "#,
            self.products_table()
        ))
        .fetch_all(&mut *conn)
        .await?;
        Ok(products)
    }
}
