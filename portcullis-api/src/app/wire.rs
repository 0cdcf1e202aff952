//! Authorization plugin protocol messages.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::HashMap;

#[derive(Debug, Serialize)]
pub struct ActivateResponse {
    #[serde(rename = "Implements")]
    pub implements: Vec<&'static str>,
}

/// One request forwarded by the engine for approval.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AuthzRequest {
    pub user: String,
    #[serde(rename = "UserAuthNMethod")]
    pub user_authn_method: String,
    pub request_method: String,
    #[serde(rename = "RequestUri", alias = "RequestURI")]
    pub request_uri: String,
    /// Base64 of the raw request body.
    pub request_body: Option<String>,
    pub request_headers: Option<HashMap<String, String>>,
}

impl AuthzRequest {
    pub fn body(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match &self.request_body {
            Some(encoded) => STANDARD.decode(encoded),
            None => Ok(Vec::new()),
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthzResponse {
    pub allow: bool,
    pub msg: Option<String>,
    pub err: Option<String>,
}

impl AuthzResponse {
    pub fn allow() -> Self {
        Self {
            allow: true,
            ..Self::default()
        }
    }

    pub fn deny(msg: impl Into<String>) -> Self {
        Self {
            msg: Some(msg.into()),
            ..Self::default()
        }
    }

    /// The request could not be evaluated.
    pub fn error(err: impl Into<String>) -> Self {
        Self {
            err: Some(err.into()),
            ..Self::default()
        }
    }
}
