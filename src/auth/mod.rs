//! Authentication: token session, client-local storage and the OAuth login flow

pub mod login;
pub mod session;
pub mod store;

pub use login::{LoginRequest, OAuthLogin, OAuthSettings, LOGIN_STATE_KEY};
pub use session::{SessionManager, TokenSession, SESSION_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
