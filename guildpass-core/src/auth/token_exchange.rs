// File: src/auth/token_exchange.rs
//
// Drives the user-delegated OAuth link: trades the authorization code for
// tokens, persists the operator's chat identity, and hands the raw guild list
// to the reconciler. Authorization codes are single-use upstream, so a
// duplicated callback must not hit the token endpoint twice.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use chrono::{Duration, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use guildpass_common::error::Error;
use guildpass_common::models::discord::OauthGuild;
use guildpass_common::models::identity::ChatIdentity;
use guildpass_common::traits::repository_traits::ChatIdentityRepository;

use crate::platforms::discord::{TokenExchangeApi, TokenExchangeResponse};

/// Result of a successful link: the persisted identity plus the guild list
/// returned by the exchange (empty on the short-circuit paths).
#[derive(Debug, Clone)]
pub struct LinkOutcome {
    pub identity: ChatIdentity,
    pub guilds: Vec<OauthGuild>,
}

pub struct TokenExchangeClient {
    api: Arc<dyn TokenExchangeApi>,
    identity_repo: Arc<dyn ChatIdentityRepository>,
    processed_codes: Mutex<HashSet<String>>,
}

impl TokenExchangeClient {
    pub fn new(api: Arc<dyn TokenExchangeApi>, identity_repo: Arc<dyn ChatIdentityRepository>) -> Self {
        Self {
            api,
            identity_repo,
            processed_codes: Mutex::new(HashSet::new()),
        }
    }

    /// Exchange an authorization code and persist the resulting identity.
    ///
    /// A code already processed this session skips the HTTP call entirely and
    /// resolves from the stored identity. An exchange failure is suppressed
    /// when an identity already exists; only a first-time failure surfaces as
    /// `ExchangeFailed`.
    pub async fn link(
        &self,
        operator_id: Uuid,
        code: &str,
        redirect_uri: &str,
    ) -> Result<LinkOutcome, Error> {
        if self.code_already_processed(code) {
            debug!("authorization code already processed; re-reading stored identity");
            let identity = self
                .identity_repo
                .get_for_operator(operator_id)
                .await?
                .ok_or(Error::LinkRequired)?;
            return Ok(LinkOutcome {
                identity,
                guilds: Vec::new(),
            });
        }

        match self.api.exchange_code(code, redirect_uri).await {
            Ok(resp) => {
                let identity = self.persist_identity(operator_id, &resp).await?;
                self.mark_code_processed(code);
                Ok(LinkOutcome {
                    identity,
                    guilds: resp.guilds,
                })
            }
            Err(e) => {
                // An operator who has linked before keeps working on a failed
                // re-exchange; only a first-time link surfaces the failure.
                match self.identity_repo.get_for_operator(operator_id).await? {
                    Some(identity) => {
                        warn!("token exchange failed, reusing stored identity: {e}");
                        Ok(LinkOutcome {
                            identity,
                            guilds: Vec::new(),
                        })
                    }
                    None => Err(e),
                }
            }
        }
    }

    /// The stored identity for an operator, or `LinkRequired` if none exists.
    pub async fn identity_for(&self, operator_id: Uuid) -> Result<ChatIdentity, Error> {
        self.identity_repo
            .get_for_operator(operator_id)
            .await?
            .ok_or(Error::LinkRequired)
    }

    /// Refresh the access token when it has expired. A still-valid identity
    /// is returned unchanged.
    pub async fn refresh_if_expired(&self, identity: ChatIdentity) -> Result<ChatIdentity, Error> {
        if !identity.is_expired(Utc::now()) {
            return Ok(identity);
        }
        let refresh_token = match identity.refresh_token.as_deref() {
            Some(t) => t,
            None => return Err(Error::ExchangeFailed("no refresh token available".to_string())),
        };

        let resp = self.api.refresh_token(refresh_token).await?;
        let now = Utc::now();
        let updated = ChatIdentity {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token.or(identity.refresh_token.clone()),
            expires_at: Some(now + Duration::seconds(resp.expires_in)),
            updated_at: now,
            ..identity
        };
        self.identity_repo.upsert_identity(&updated).await?;
        Ok(updated)
    }

    /// Operator-initiated unlink. Claimed servers are left untouched.
    pub async fn unlink(&self, operator_id: Uuid) -> Result<(), Error> {
        self.identity_repo.delete_for_operator(operator_id).await
    }

    async fn persist_identity(
        &self,
        operator_id: Uuid,
        resp: &TokenExchangeResponse,
    ) -> Result<ChatIdentity, Error> {
        let now = Utc::now();
        let existing = self.identity_repo.get_for_operator(operator_id).await?;

        let identity = ChatIdentity {
            chat_identity_id: existing
                .as_ref()
                .map(|i| i.chat_identity_id)
                .unwrap_or_else(Uuid::new_v4),
            operator_id,
            external_user_id: resp.user.id.clone(),
            external_username: resp.user.username.clone(),
            access_token: resp.access_token.clone(),
            refresh_token: resp.refresh_token.clone(),
            expires_at: Some(now + Duration::seconds(resp.expires_in)),
            created_at: existing.as_ref().map(|i| i.created_at).unwrap_or(now),
            updated_at: now,
        };

        self.identity_repo.upsert_identity(&identity).await?;
        Ok(identity)
    }

    fn code_already_processed(&self, code: &str) -> bool {
        self.processed_codes.lock().unwrap().contains(code)
    }

    fn mark_code_processed(&self, code: &str) {
        self.processed_codes.lock().unwrap().insert(code.to_string());
    }
}
