//! TokenSession and the single-writer session manager

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::store::KeyValueStore;
use crate::error::Result;

/// Storage key of the persisted session record
pub const SESSION_KEY: &str = "tokens";

/// Locally held proof of authentication plus its expiry metadata.
///
/// Serialized flat, matching the token endpoint's field names plus `created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSession {
    pub access_token: String,
    pub token_type: String,
    /// Time-to-live in seconds
    pub expires_in: i64,
    pub membership_id: String,
    /// Issued-at, whole seconds
    #[serde(rename = "created", with = "created_seconds")]
    pub issued_at: DateTime<Utc>,
}

impl TokenSession {
    /// `None` when `expires_in` puts the expiry outside the representable range
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Duration::try_seconds(self.expires_in)
            .and_then(|ttl| self.issued_at.checked_add_signed(ttl))
    }

    /// An unrepresentable expiry counts as expired.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires_at| expires_at > now)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// `Authorization` header value
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// `created` is written as integer epoch seconds; fractional values are
/// accepted on read and truncated.
mod created_seconds {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(value.timestamp())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = f64::deserialize(deserializer)?;
        if !seconds.is_finite() {
            return Err(de::Error::custom("created is not a finite number"));
        }
        DateTime::from_timestamp(seconds.floor() as i64, 0)
            .ok_or_else(|| de::Error::custom(format!("created out of range: {}", seconds)))
    }
}

/// Holds the current session; replaced wholesale on login, read everywhere else.
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    current: RwLock<Option<TokenSession>>,
}

impl SessionManager {
    /// Load any persisted session from `store`. A corrupt record is ignored.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let current = match store.get(SESSION_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<TokenSession>(&raw) {
                Ok(session) if session.expires_at().is_none() => {
                    tracing::warn!(
                        expires_in = session.expires_in,
                        "Ignoring session record with unrepresentable expiry"
                    );
                    None
                }
                Ok(session) => Some(session),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring unreadable session record");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read session record");
                None
            }
        };

        Self {
            store,
            current: RwLock::new(current),
        }
    }

    /// Replace the session and persist it. Issued-at is kept to whole seconds,
    /// matching the persisted record.
    pub fn set_session(&self, mut session: TokenSession) -> Result<()> {
        session.issued_at = session.issued_at.trunc_subsecs(0);
        self.store
            .set(SESSION_KEY, &serde_json::to_string(&session)?)?;
        tracing::info!(
            membership_id = %session.membership_id,
            expires_at = ?session.expires_at(),
            "Session stored"
        );
        *self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(session);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(SESSION_KEY)?;
        *self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        Ok(())
    }

    pub fn session(&self) -> Option<TokenSession> {
        self.current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn is_logged_in_at(&self, now: DateTime<Utc>) -> bool {
        self.session().is_some_and(|s| s.is_valid_at(now))
    }

    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in_at(Utc::now())
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("logged_in", &self.is_logged_in())
            .finish()
    }
}
