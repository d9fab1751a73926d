// File: guildpass-core/src/repositories/postgres/command_policies.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;
use guildpass_common::error::Error;
use guildpass_common::models::policy::{CommandPolicy, ConfigurableCommand};
use guildpass_common::traits::repository_traits::CommandPolicyRepository;

#[derive(Clone)]
pub struct PostgresCommandPolicyRepository {
    pool: Pool<Postgres>,
}

impl PostgresCommandPolicyRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_policy(r: &sqlx::postgres::PgRow) -> Result<CommandPolicy, Error> {
    Ok(CommandPolicy {
        server_id: r.try_get("server_id")?,
        command: r.try_get("command")?,
        enabled: r.try_get("enabled")?,
        require_admin: r.try_get("require_admin")?,
        allowed_role_ids: r.try_get("allowed_role_ids")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl CommandPolicyRepository for PostgresCommandPolicyRepository {
    async fn get_policy(
        &self,
        server_id: Uuid,
        command: ConfigurableCommand,
    ) -> Result<Option<CommandPolicy>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT server_id, command, enabled, require_admin, allowed_role_ids, updated_at
            FROM command_policies
            WHERE server_id = $1
              AND command = $2
            "#,
        )
            .bind(server_id)
            .bind(command)
            .fetch_optional(&self.pool)
            .await?;

        match row_opt {
            Some(r) => Ok(Some(row_to_policy(&r)?)),
            None => Ok(None),
        }
    }

    async fn list_policies(&self, server_id: Uuid) -> Result<Vec<CommandPolicy>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT server_id, command, enabled, require_admin, allowed_role_ids, updated_at
            FROM command_policies
            WHERE server_id = $1
            ORDER BY command
            "#,
        )
            .bind(server_id)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::new();
        for r in rows {
            out.push(row_to_policy(&r)?);
        }
        Ok(out)
    }

    async fn upsert_policy(&self, policy: &CommandPolicy) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO command_policies (
                server_id, command, enabled, require_admin, allowed_role_ids, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, now())
            ON CONFLICT (server_id, command)
            DO UPDATE SET enabled = EXCLUDED.enabled,
                          require_admin = EXCLUDED.require_admin,
                          allowed_role_ids = EXCLUDED.allowed_role_ids,
                          updated_at = now()
            "#,
        )
            .bind(policy.server_id)
            .bind(policy.command)
            .bind(policy.enabled)
            .bind(policy.require_admin)
            .bind(&policy.allowed_role_ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
