// File: guildpass-core/src/repositories/postgres/chat_identities.rs
//
// One identity row per operator, enforced by the UNIQUE constraint on
// operator_id. Only the token-exchange flow writes here.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;
use guildpass_common::error::Error;
use guildpass_common::models::identity::ChatIdentity;
use guildpass_common::traits::repository_traits::ChatIdentityRepository;

#[derive(Clone)]
pub struct PostgresChatIdentityRepository {
    pool: Pool<Postgres>,
}

impl PostgresChatIdentityRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn row_to_identity(r: &sqlx::postgres::PgRow) -> Result<ChatIdentity, Error> {
    Ok(ChatIdentity {
        chat_identity_id: r.try_get("chat_identity_id")?,
        operator_id: r.try_get("operator_id")?,
        external_user_id: r.try_get("external_user_id")?,
        external_username: r.try_get("external_username")?,
        access_token: r.try_get("access_token")?,
        refresh_token: r.try_get("refresh_token")?,
        expires_at: r.try_get("expires_at")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

#[async_trait]
impl ChatIdentityRepository for PostgresChatIdentityRepository {
    async fn get_for_operator(&self, operator_id: Uuid) -> Result<Option<ChatIdentity>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT chat_identity_id, operator_id, external_user_id, external_username,
                   access_token, refresh_token, expires_at, created_at, updated_at
            FROM chat_identities
            WHERE operator_id = $1
            "#,
        )
            .bind(operator_id)
            .fetch_optional(&self.pool)
            .await?;

        match row_opt {
            Some(r) => Ok(Some(row_to_identity(&r)?)),
            None => Ok(None),
        }
    }

    async fn upsert_identity(&self, identity: &ChatIdentity) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO chat_identities (
                chat_identity_id, operator_id, external_user_id, external_username,
                access_token, refresh_token, expires_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (operator_id)
            DO UPDATE SET external_user_id = EXCLUDED.external_user_id,
                          external_username = EXCLUDED.external_username,
                          access_token = EXCLUDED.access_token,
                          refresh_token = EXCLUDED.refresh_token,
                          expires_at = EXCLUDED.expires_at,
                          updated_at = now()
            "#,
        )
            .bind(identity.chat_identity_id)
            .bind(identity.operator_id)
            .bind(&identity.external_user_id)
            .bind(&identity.external_username)
            .bind(&identity.access_token)
            .bind(&identity.refresh_token)
            .bind(identity.expires_at)
            .bind(identity.created_at)
            .bind(identity.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_for_operator(&self, operator_id: Uuid) -> Result<(), Error> {
        sqlx::query("DELETE FROM chat_identities WHERE operator_id = $1")
            .bind(operator_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
