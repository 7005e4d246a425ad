//! Wire types for the method-call API.
//!
//! A call is a JSON envelope naming a method; the reply is either
//! `{"response": ..., "code": 200}` or `{"error": ..., "code": <status>}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const OK: u16 = 200;
pub const BAD_REQUEST: u16 = 400;
pub const FORBIDDEN: u16 = 403;
pub const NOT_FOUND: u16 = 404;
pub const INVALID_REQUEST: u16 = 422;
pub const INTERNAL_ERROR: u16 = 500;

/// Default reason text for an error status code
pub fn error_text(code: u16) -> Option<&'static str> {
    match code {
        BAD_REQUEST => Some("Bad Request"),
        FORBIDDEN => Some("Forbidden"),
        NOT_FOUND => Some("Not Found"),
        INVALID_REQUEST => Some("Invalid Request"),
        INTERNAL_ERROR => Some("Internal Server Error"),
        _ => None,
    }
}

/// Methods callable through the envelope.
///
/// The wire names are fixed, including the `client_instrests` spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiMethod {
    #[serde(rename = "online_score")]
    OnlineScore,
    #[serde(rename = "client_instrests")]
    ClientsInterests,
}

impl ApiMethod {
    pub const ALL: [ApiMethod; 2] = [ApiMethod::OnlineScore, ApiMethod::ClientsInterests];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiMethod::OnlineScore => "online_score",
            ApiMethod::ClientsInterests => "client_instrests",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl std::fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one call, before it is rendered to the wire
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub code: u16,
    pub response: Option<Value>,
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn success(response: Value) -> Self {
        Self {
            code: OK,
            response: Some(response),
            error: None,
        }
    }

    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            response: None,
            error: Some(message.into()),
        }
    }

    /// Error response carrying only the default reason for `code`
    pub fn status(code: u16) -> Self {
        Self {
            code,
            response: None,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        error_text(self.code).is_none()
    }

    /// Render the JSON body sent to the caller
    pub fn to_body(&self) -> Value {
        if self.is_success() {
            json!({
                "response": self.response.clone().unwrap_or(Value::Null),
                "code": self.code,
            })
        } else {
            let message = self
                .error
                .clone()
                .or_else(|| error_text(self.code).map(str::to_string))
                .unwrap_or_else(|| "Unknown Error".to_string());
            json!({ "error": message, "code": self.code })
        }
    }
}
