//! RequestGateway - the single path to the remote platform API
//!
//! Four calling conventions share one send path:
//!
//! | convention       | API key | Authorization | envelope |
//! |------------------|---------|---------------|----------|
//! | `public`         | yes     | no            | yes      |
//! | `anonymous`      | no      | no            | yes      |
//! | `anonymous_json` | no      | no            | no (cache-busted) |
//! | `authenticated`  | yes     | yes           | yes      |
//!
//! An HTTP 401 is reported as [`Error::Unauthorized`]. Authenticated calls
//! additionally ask the [`LoginRouter`] to send the user to the login screen,
//! once per failed call. Nothing is retried.

pub mod envelope;
pub mod transport;

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::auth::SessionManager;
use crate::error::{Error, Result};

pub use envelope::ServerResponse;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, ReqwestTransport};

/// Query parameter used to bypass intermediate caches on static content
pub const CACHE_BUSTING_PARAM: &str = "cachebusting";

/// Navigation side effect fired when authentication is required
pub trait LoginRouter: Send + Sync {
    fn route_to_login(&self);
}

/// Router that only records the redirect in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLoginRouter;

impl LoginRouter for TracingLoginRouter {
    fn route_to_login(&self) {
        tracing::warn!("Login required");
    }
}

pub struct RequestGateway {
    transport: Arc<dyn HttpTransport>,
    api_key: String,
    app_name: String,
    sessions: Arc<SessionManager>,
    router: Arc<dyn LoginRouter>,
}

impl RequestGateway {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        api_key: impl Into<String>,
        app_name: impl Into<String>,
        sessions: Arc<SessionManager>,
        router: Arc<dyn LoginRouter>,
    ) -> Self {
        Self {
            transport,
            api_key: api_key.into(),
            app_name: app_name.into(),
            sessions,
            router,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// Enveloped call carrying the API key
    pub async fn public<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let request = request.header("X-API-Key", self.api_key.as_str());
        let response = self.send(request).await?;
        decode_envelope(&response)
    }

    /// Enveloped call without the API key
    pub async fn anonymous<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.send(request).await?;
        decode_envelope(&response)
    }

    /// Raw JSON without the API key, tagged with the cache-busting parameter
    pub async fn anonymous_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let request = request.param(CACHE_BUSTING_PARAM, &self.app_name);
        let response = self.send(request).await?;
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Enveloped call on behalf of the logged-in user.
    ///
    /// Without a valid session this fails before any network traffic.
    pub async fn authenticated<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let session = match self.sessions.session() {
            Some(session) if session.is_valid() => session,
            Some(_) => return Err(self.require_login("Login expired")),
            None => return Err(self.require_login("You have to login first")),
        };

        let request = request
            .header("X-API-Key", self.api_key.as_str())
            .header("Authorization", session.authorization());

        match self.send(request).await {
            Err(error) if error.is_unauthorized() => {
                self.router.route_to_login();
                Err(error)
            }
            Err(error) => Err(error),
            Ok(response) => decode_envelope(&response),
        }
    }

    fn require_login(&self, reason: &str) -> Error {
        self.router.route_to_login();
        Error::Unauthorized(reason.to_string())
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        tracing::debug!(url = %request.url, method = ?request.method, "Requesting");
        let url = request.url.clone();
        let response = self.transport.execute(request).await?;

        if response.is_unauthorized() {
            return Err(Error::Unauthorized(format!(
                "{} {} {}\n{}",
                response.status_text, response.status, url, response.body
            )));
        }
        Ok(response)
    }
}

impl std::fmt::Debug for RequestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGateway")
            .field("app_name", &self.app_name)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

fn decode_envelope<T: DeserializeOwned>(response: &ApiResponse) -> Result<T> {
    let envelope: ServerResponse<T> = serde_json::from_str(&response.body)?;
    if envelope.is_error() {
        tracing::warn!(
            code = envelope.error_code,
            status = %envelope.error_status,
            "Platform returned an error envelope"
        );
    }
    envelope.into_response()
}
