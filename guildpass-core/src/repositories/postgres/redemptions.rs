// File: guildpass-core/src/repositories/postgres/redemptions.rs
//
// Redemption records are written by the platform bot; the sync engine only
// reads them for whitelist aggregation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;
use guildpass_common::error::Error;
use guildpass_common::models::product::RedemptionRecord;
use guildpass_common::traits::repository_traits::RedemptionRepository;

#[derive(Clone)]
pub struct PostgresRedemptionRepository {
    pool: Pool<Postgres>,
}

impl PostgresRedemptionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RedemptionRepository for PostgresRedemptionRepository {
    async fn list_for_products(
        &self,
        product_config_ids: &[Uuid],
    ) -> Result<Vec<RedemptionRecord>, Error> {
        if product_config_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT redemption_id, product_config_id, external_user_id,
                   game_account_id, game_account_name, redeemed_at
            FROM redemption_records
            WHERE product_config_id = ANY($1)
            ORDER BY redeemed_at
            "#,
        )
            .bind(product_config_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::new();
        for r in rows {
            out.push(RedemptionRecord {
                redemption_id: r.try_get("redemption_id")?,
                product_config_id: r.try_get("product_config_id")?,
                external_user_id: r.try_get("external_user_id")?,
                game_account_id: r.try_get("game_account_id")?,
                game_account_name: r.try_get("game_account_name")?,
                redeemed_at: r.try_get("redeemed_at")?,
            });
        }
        Ok(out)
    }
}
