// File: guildpass-core/src/repositories/postgres/servers.rs
//
// Server rows are created by the platform-bot installation flow, never by the
// sync engine; this repository only reads them and performs the conditional
// claim. The claim is an UPDATE guarded by `claimed_by IS NULL` so two racing
// reconciliations cannot overwrite each other.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;
use guildpass_common::error::Error;
use guildpass_common::models::server::Server;
use guildpass_common::traits::repository_traits::ServerRepository;

#[derive(Clone)]
pub struct PostgresServerRepository {
    pool: Pool<Postgres>,
}

impl PostgresServerRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_server(r: &sqlx::postgres::PgRow) -> Result<Server, Error> {
    Ok(Server {
        server_id: r.try_get("server_id")?,
        guild_id: r.try_get("guild_id")?,
        guild_name: r.try_get("guild_name")?,
        guild_icon: r.try_get("guild_icon")?,
        member_count: r.try_get("member_count")?,
        claimed_by: r.try_get("claimed_by")?,
        bot_configured: r.try_get("bot_configured")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl ServerRepository for PostgresServerRepository {
    async fn get_by_guild_id(&self, guild_id: &str) -> Result<Option<Server>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT server_id, guild_id, guild_name, guild_icon, member_count,
                   claimed_by, bot_configured, created_at, updated_at
            FROM servers
            WHERE guild_id = $1
            "#,
        )
            .bind(guild_id)
            .fetch_optional(&self.pool)
            .await?;

        match row_opt {
            Some(r) => Ok(Some(row_to_server(&r)?)),
            None => Ok(None),
        }
    }

    async fn list_by_guild_ids(&self, guild_ids: &[String]) -> Result<Vec<Server>, Error> {
        if guild_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT server_id, guild_id, guild_name, guild_icon, member_count,
                   claimed_by, bot_configured, created_at, updated_at
            FROM servers
            WHERE guild_id = ANY($1)
            ORDER BY guild_name
            "#,
        )
            .bind(guild_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::new();
        for r in rows {
            out.push(row_to_server(&r)?);
        }
        Ok(out)
    }

    async fn list_claimed_by(&self, operator_id: Uuid) -> Result<Vec<Server>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT server_id, guild_id, guild_name, guild_icon, member_count,
                   claimed_by, bot_configured, created_at, updated_at
            FROM servers
            WHERE claimed_by = $1
            ORDER BY guild_name
            "#,
        )
            .bind(operator_id)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::new();
        for r in rows {
            out.push(row_to_server(&r)?);
        }
        Ok(out)
    }

    async fn claim_if_unclaimed(&self, guild_id: &str, operator_id: Uuid) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE servers
            SET claimed_by = $1,
                bot_configured = TRUE,
                updated_at = now()
            WHERE guild_id = $2
              AND claimed_by IS NULL
            "#,
        )
            .bind(operator_id)
            .bind(guild_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
