// File: guildpass-core/src/repositories/postgres/product_configs.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;
use guildpass_common::error::Error;
use guildpass_common::models::product::ProductConfig;
use guildpass_common::traits::repository_traits::ProductConfigRepository;

#[derive(Clone)]
pub struct PostgresProductConfigRepository {
    pool: Pool<Postgres>,
}

impl PostgresProductConfigRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_config(r: &sqlx::postgres::PgRow) -> Result<ProductConfig, Error> {
    Ok(ProductConfig {
        product_config_id: r.try_get("product_config_id")?,
        server_id: r.try_get("server_id")?,
        external_group_id: r.try_get("external_group_id")?,
        grant_role_id: r.try_get("grant_role_id")?,
        redemption_message: r.try_get("redemption_message")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl ProductConfigRepository for PostgresProductConfigRepository {
    async fn get_by_id(&self, product_config_id: Uuid) -> Result<Option<ProductConfig>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT product_config_id, server_id, external_group_id,
                   grant_role_id, redemption_message, created_at, updated_at
            FROM product_configs
            WHERE product_config_id = $1
            "#,
        )
            .bind(product_config_id)
            .fetch_optional(&self.pool)
            .await?;

        match row_opt {
            Some(r) => Ok(Some(row_to_config(&r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_server(&self, server_id: Uuid) -> Result<Vec<ProductConfig>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT product_config_id, server_id, external_group_id,
                   grant_role_id, redemption_message, created_at, updated_at
            FROM product_configs
            WHERE server_id = $1
            ORDER BY created_at
            "#,
        )
            .bind(server_id)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::new();
        for r in rows {
            out.push(row_to_config(&r)?);
        }
        Ok(out)
    }

    async fn list_by_group_id(&self, external_group_id: &str) -> Result<Vec<ProductConfig>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT product_config_id, server_id, external_group_id,
                   grant_role_id, redemption_message, created_at, updated_at
            FROM product_configs
            WHERE external_group_id = $1
            ORDER BY created_at
            "#,
        )
            .bind(external_group_id)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::new();
        for r in rows {
            out.push(row_to_config(&r)?);
        }
        Ok(out)
    }
}
