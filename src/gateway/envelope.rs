//! Platform response envelope

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Envelope wrapping every platform response.
///
/// `ErrorCode` 1 is success; anything above it is an application-level
/// failure delivered with a successful transport status.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerResponse<T> {
    pub response: Option<T>,
    pub error_code: i32,
    #[serde(default)]
    pub throttle_seconds: i32,
    #[serde(default)]
    pub error_status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub message_data: HashMap<String, String>,
}

impl<T> ServerResponse<T> {
    pub fn is_error(&self) -> bool {
        self.error_code > 1
    }

    /// The payload, or the envelope's error
    pub fn into_response(self) -> Result<T> {
        if self.is_error() {
            return Err(Error::Application {
                code: self.error_code,
                status: self.error_status,
                message: self.message,
            });
        }
        self.response
            .ok_or_else(|| Error::precondition("response envelope without Response"))
    }
}
