//! Warehouse catalog service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use shared::validation::{validate_code, validate_name};

use crate::error::{AppError, AppResult};

/// Warehouse service for location maintenance
#[derive(Clone)]
pub struct WarehouseService {
    db: PgPool,
}

/// Warehouse information
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Warehouse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or renaming a warehouse
#[derive(Debug, Deserialize)]
pub struct UpsertWarehouseInput {
    pub code: String,
    pub name: String,
}

impl WarehouseService {
    /// Create a new WarehouseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get all warehouses ordered by code
    pub async fn list(&self) -> AppResult<Vec<Warehouse>> {
        let warehouses = sqlx::query_as::<_, Warehouse>(
            r#"
            SELECT id, code, name, created_at
            FROM warehouses
            ORDER BY code ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(warehouses)
    }

    /// Create a warehouse, or rename it when the code already exists
    pub async fn upsert(&self, input: UpsertWarehouseInput) -> AppResult<Warehouse> {
        validate_code(&input.code).map_err(|message| AppError::Validation {
            field: "code".to_string(),
            message: message.to_string(),
        })?;

        validate_name(&input.name).map_err(|message| AppError::Validation {
            field: "name".to_string(),
            message: message.to_string(),
        })?;

        let warehouse = sqlx::query_as::<_, Warehouse>(
            r#"
            INSERT INTO warehouses (code, name)
            VALUES ($1, $2)
            ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, code, name, created_at
            "#,
        )
        .bind(input.code.trim())
        .bind(input.name.trim())
        .fetch_one(&self.db)
        .await?;

        Ok(warehouse)
    }
}
