//! OAuth authorization-code login with a single-use state nonce
//!
//! ```text
//!   begin()  ──> store nonce ("login_state") ──> authorize URL
//!   finish(code, state) ──> compare + delete nonce ──> POST token form ──> TokenSession
//! ```

use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::session::{SessionManager, TokenSession};
use super::store::KeyValueStore;
use crate::error::{require, Error, Result};
use crate::gateway::transport::{ApiRequest, HttpTransport};

/// Storage key of the pending login nonce
pub const LOGIN_STATE_KEY: &str = "login_state";

/// Client id and endpoints of the OAuth application
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub authorize_url: String,
    pub token_url: String,
}

/// A started login: the user agent should be sent to `authorize_url`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub state: String,
    pub authorize_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    expires_in: Option<i64>,
    membership_id: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub struct OAuthLogin {
    settings: OAuthSettings,
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn KeyValueStore>,
}

impl OAuthLogin {
    pub fn new(
        settings: OAuthSettings,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            settings,
            transport,
            store,
        }
    }

    /// Create and persist a fresh nonce, returning the authorize URL carrying it
    pub fn begin(&self) -> Result<LoginRequest> {
        let state = Uuid::new_v4().to_string();
        self.store.set(LOGIN_STATE_KEY, &state)?;

        let url = url::Url::parse_with_params(
            &self.settings.authorize_url,
            &[
                ("client_id", self.settings.client_id.as_str()),
                ("response_type", "code"),
                ("state", state.as_str()),
            ],
        )
        .map_err(|e| Error::precondition(format!("Invalid authorize URL: {}", e)))?;

        tracing::info!("Login started");
        Ok(LoginRequest {
            state,
            authorize_url: url.into(),
        })
    }

    /// Whether a nonce is waiting for its callback
    pub fn is_pending(&self) -> Result<bool> {
        Ok(self.store.get(LOGIN_STATE_KEY)?.is_some())
    }

    /// Validate the callback `state` and exchange `code` for a session.
    ///
    /// The stored nonce is consumed whatever the comparison outcome.
    pub async fn finish(&self, code: &str, state: &str) -> Result<TokenSession> {
        let expected = self.store.get(LOGIN_STATE_KEY)?;
        self.store.remove(LOGIN_STATE_KEY)?;

        if expected.as_deref() != Some(state) {
            tracing::warn!("Login callback state did not match");
            return Err(Error::Unauthorized(
                "Invalid login state! Please try again!".to_string(),
            ));
        }

        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "authorization_code")
            .append_pair("code", code)
            .append_pair("client_id", &self.settings.client_id)
            .finish();
        let request = ApiRequest::post(&self.settings.token_url, form)
            .header("Content-Type", "application/x-www-form-urlencoded");

        let response = self.transport.execute(request).await?;
        let token: TokenResponse = serde_json::from_str(&response.body)?;

        if let Some(error) = token.error {
            return Err(Error::Application {
                code: i32::from(response.status),
                status: error.clone(),
                message: token.error_description.unwrap_or(error),
            });
        }

        let session = TokenSession {
            access_token: require(token.access_token, "token response without access_token")?,
            token_type: token.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_in: require(token.expires_in, "token response without expires_in")?,
            membership_id: require(token.membership_id, "token response without membership_id")?,
            issued_at: Utc::now().trunc_subsecs(0),
        };
        Ok(session)
    }

    /// `finish` and install the resulting session
    pub async fn complete_login(
        &self,
        sessions: &SessionManager,
        code: &str,
        state: &str,
    ) -> Result<TokenSession> {
        let session = self.finish(code, state).await?;
        sessions.set_session(session.clone())?;
        Ok(session)
    }
}

impl std::fmt::Debug for OAuthLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthLogin")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
