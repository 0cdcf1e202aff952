//! Synthetic authorization requests against a running plugin.

use crate::client::handle_error;
use crate::ops::output::{print_json, OutputFormat};
use crate::ops::ui::{format_decision, print_error, print_kv, print_section};
use anyhow::Context;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthzRequest {
    pub user: String,
    pub request_method: String,
    #[serde(rename = "RequestUri")]
    pub request_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AuthzResponse {
    pub allow: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl AuthzRequest {
    /// `body`, when given, is a file holding the JSON payload of the request.
    pub fn new(user: &str, method: &str, uri: &str, body: Option<&Path>) -> anyhow::Result<Self> {
        let request_body = body
            .map(|path| {
                std::fs::read(path).with_context(|| format!("reading {}", path.display()))
            })
            .transpose()?
            .map(|bytes| STANDARD.encode(bytes));
        Ok(Self {
            user: user.to_string(),
            request_method: method.to_uppercase(),
            request_uri: uri.to_string(),
            request_body,
        })
    }
}

pub async fn send_request(
    client: &reqwest::Client,
    base: &str,
    request: &AuthzRequest,
    output: OutputFormat,
) -> anyhow::Result<AuthzResponse> {
    let url = format!("{}/AuthZPlugin.AuthZReq", base.trim_end_matches('/'));
    debug!(%url, method = %request.request_method, uri = %request.request_uri, "posting authorization request");
    let resp = client.post(url).json(request).send().await?;
    let resp: AuthzResponse = handle_error(resp).await?.json().await?;

    match output {
        OutputFormat::Json => print_json(&resp)?,
        OutputFormat::Table => {
            let user = if request.user.is_empty() {
                "<anonymous>"
            } else {
                request.user.as_str()
            };
            print_section(&format!(
                "{} {} as {}",
                request.request_method, request.request_uri, user
            ));
            print_kv("decision", &format_decision(resp.allow));
            if let Some(msg) = &resp.msg {
                print_kv("message", msg);
            }
            if let Some(err) = &resp.err {
                print_error(err);
            }
            println!();
        }
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_is_base64_encoded() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("create.json");
        std::fs::write(&path, br#"{"HostConfig":{}}"#).unwrap();

        let req = AuthzRequest::new("alice", "post", "/v1.41/containers/create", Some(&path))
            .unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["RequestMethod"], "POST");
        assert_eq!(json["RequestUri"], "/v1.41/containers/create");
        assert_eq!(
            STANDARD.decode(json["RequestBody"].as_str().unwrap()).unwrap(),
            br#"{"HostConfig":{}}"#
        );
    }

    #[test]
    fn request_without_body_omits_the_field() {
        let req = AuthzRequest::new("", "GET", "/_ping", None).unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("RequestBody").is_none());
    }

    #[test]
    fn missing_body_file_is_an_error() {
        assert!(AuthzRequest::new("a", "POST", "/x", Some(Path::new("/no/such/file"))).is_err());
    }
}
