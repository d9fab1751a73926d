// File: src/platforms/discord/mod.rs
//
// HTTP boundary to the chat platform: the user-delegated token exchange and
// the bot-credentialed server lookup. Both are behind traits so the services
// above them can be exercised with test doubles.

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use tracing::debug;

use guildpass_common::error::Error;
use guildpass_common::models::discord::OauthGuild;

/// Response from the token exchange endpoint. Alongside the tokens it carries
/// the authenticated user and the raw guild list the user may administer.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchangeResponse {
    pub user: ExchangeUser,
    #[serde(default)]
    pub guilds: Vec<OauthGuild>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

/// One server entry from the bot-authoritative lookup. These are
/// pre-verified: the bot already confirmed it is installed there and that the
/// requesting user is an admin.
#[derive(Debug, Clone, Deserialize)]
pub struct BotServerEntry {
    pub id: String,
    pub guild_id: String,
    pub guild_name: String,
    pub guild_icon: Option<String>,
    #[serde(default)]
    pub member_count: i32,
    #[serde(default)]
    pub is_configured: bool,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
struct BotLookupResponse {
    #[serde(default)]
    servers: Vec<BotServerEntry>,
    error: Option<String>,
    #[serde(rename = "needsLink")]
    #[allow(dead_code)]
    needs_link: Option<bool>,
}

#[async_trait]
pub trait TokenExchangeApi: Send + Sync {
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenExchangeResponse, Error>;

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenRefreshResponse, Error>;
}

#[async_trait]
pub trait BotLookupApi: Send + Sync {
    /// Servers where the bot is installed and has verified the given external
    /// user as an admin. An empty list is a normal answer.
    async fn list_operator_servers(
        &self,
        external_user_id: &str,
    ) -> Result<Vec<BotServerEntry>, Error>;
}

pub struct HttpTokenExchange {
    http: ReqwestClient,
    endpoint: String,
    client_id: String,
}

impl HttpTokenExchange {
    pub fn new(endpoint: String, client_id: String) -> Self {
        Self {
            http: ReqwestClient::new(),
            endpoint,
            client_id,
        }
    }

    /// Authorize URL for the initial link, for the caller to open in a
    /// browser.
    pub fn build_authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        let scopes = "identify guilds";
        format!(
            "https://discord.com/oauth2/authorize?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(scopes),
            urlencoding::encode(state),
        )
    }
}

#[async_trait]
impl TokenExchangeApi for HttpTokenExchange {
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenExchangeResponse, Error> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "code": code,
                "redirect_uri": redirect_uri,
            }))
            .send()
            .await
            .map_err(|e| Error::ExchangeFailed(format!("HTTP error exchanging code: {e}")))?
            .error_for_status()
            .map_err(|e| Error::ExchangeFailed(format!("Token endpoint error: {e}")))?
            .json::<TokenExchangeResponse>()
            .await
            .map_err(|e| Error::ExchangeFailed(format!("Parse error on token JSON: {e}")))?;

        debug!(
            "token exchange returned user={} with {} guilds",
            resp.user.id,
            resp.guilds.len()
        );
        Ok(resp)
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenRefreshResponse, Error> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "grant_type": "refresh_token",
                "refresh_token": refresh_token,
            }))
            .send()
            .await
            .map_err(|e| Error::ExchangeFailed(format!("HTTP error refreshing token: {e}")))?
            .error_for_status()
            .map_err(|e| Error::ExchangeFailed(format!("Token endpoint error: {e}")))?
            .json::<TokenRefreshResponse>()
            .await
            .map_err(|e| Error::ExchangeFailed(format!("Parse error on token JSON: {e}")))?;
        Ok(resp)
    }
}

pub struct HttpBotLookup {
    http: ReqwestClient,
    endpoint: String,
    bot_token: String,
}

impl HttpBotLookup {
    pub fn new(endpoint: String, bot_token: String) -> Self {
        Self {
            http: ReqwestClient::new(),
            endpoint,
            bot_token,
        }
    }
}

#[async_trait]
impl BotLookupApi for HttpBotLookup {
    async fn list_operator_servers(
        &self,
        external_user_id: &str,
    ) -> Result<Vec<BotServerEntry>, Error> {
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.bot_token)
            .json(&serde_json::json!({ "user_id": external_user_id }))
            .send()
            .await?
            .error_for_status()?
            .json::<BotLookupResponse>()
            .await?;

        if let Some(err) = resp.error {
            return Err(Error::Parse(format!("bot lookup returned error: {err}")));
        }
        Ok(resp.servers)
    }
}
