//! Product catalog service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use shared::validation::{validate_code, validate_name, validate_unit_cost};

use crate::error::{is_unique_violation, AppError, AppResult};

/// Product service for catalog maintenance
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// Product information
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub unit: String,
    pub cost: Decimal,
    pub price: Decimal,
    pub reorder_level: i32,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub sku: String,
    pub name: String,
    pub unit: String,
    pub cost: Decimal,
    pub price: Decimal,
    pub reorder_level: Option<i32>,
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get all products ordered by SKU
    pub async fn list(&self) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, unit, cost, price, reorder_level, created_at
            FROM products
            ORDER BY sku ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    /// Get a product by ID
    pub async fn get(&self, product_id: Uuid) -> AppResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, unit, cost, price, reorder_level, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(product)
    }

    /// Create a new product
    pub async fn create(&self, input: CreateProductInput) -> AppResult<Product> {
        validate_product_input(&input)?;

        let reorder_level = input.reorder_level.unwrap_or(0);

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (sku, name, unit, cost, price, reorder_level)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, sku, name, unit, cost, price, reorder_level, created_at
            "#,
        )
        .bind(input.sku.trim())
        .bind(input.name.trim())
        .bind(input.unit.trim())
        .bind(input.cost)
        .bind(input.price)
        .bind(reorder_level)
        .fetch_one(&self.db)
        .await
        .map_err(|err| {
            // The sku column carries a unique constraint
            if is_unique_violation(&err) {
                AppError::DuplicateEntry("sku".to_string())
            } else {
                AppError::DatabaseError(err)
            }
        })?;

        Ok(product)
    }
}

fn validate_product_input(input: &CreateProductInput) -> AppResult<()> {
    validate_code(&input.sku).map_err(|message| AppError::Validation {
        field: "sku".to_string(),
        message: message.to_string(),
    })?;

    validate_name(&input.name).map_err(|message| AppError::Validation {
        field: "name".to_string(),
        message: message.to_string(),
    })?;

    if input.unit.trim().is_empty() {
        return Err(AppError::Validation {
            field: "unit".to_string(),
            message: "Unit cannot be empty".to_string(),
        });
    }

    validate_unit_cost(input.cost).map_err(|message| AppError::Validation {
        field: "cost".to_string(),
        message: message.to_string(),
    })?;

    if input.price < Decimal::ZERO {
        return Err(AppError::Validation {
            field: "price".to_string(),
            message: "Price cannot be negative".to_string(),
        });
    }

    if let Some(level) = input.reorder_level {
        if level < 0 {
            return Err(AppError::Validation {
                field: "reorder_level".to_string(),
                message: "Reorder level cannot be negative".to_string(),
            });
        }
    }

    Ok(())
}
