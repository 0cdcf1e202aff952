//! The per-request decision: action check first, then the body check of
//! the actions that carry one.

mod container;
mod identity;
mod service;
mod volume;

use super::actions::{action_for, normalize_uri};
use super::wire::{AuthzRequest, AuthzResponse};
use identity::resolve_actor;
use portcullis_core::{authorize_action, Outcome, RuleSet, RuleStore};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

/// Runs on the blocking pool: rule loading and mount canonicalization touch
/// the filesystem.
pub fn decide(store: &RuleStore, anonymous_user: &str, req: &AuthzRequest) -> AuthzResponse {
    let uri = match normalize_uri(&req.request_uri) {
        Ok(uri) => uri,
        Err(e) => return AuthzResponse::error(e),
    };
    let user = if req.user.is_empty() {
        anonymous_user
    } else {
        req.user.as_str()
    };
    debug!(
        "checking {} request to {} from user {}",
        req.request_method, uri, user
    );

    let action = action_for(&req.request_method, &uri);
    let rules = match store.load_for(&resolve_actor(user)) {
        Ok(rules) => rules,
        Err(e) => {
            error!(user, error = %e, "can't load rules");
            return AuthzResponse {
                allow: false,
                msg: Some("authorization denied".into()),
                err: Some(e.to_string()),
            };
        }
    };

    debug!("checking if action {action} is allowed");
    let outcome = authorize_action(&rules, user, action);
    if !outcome.allowed {
        return respond(outcome);
    }

    let check: Option<BodyCheck> = match action {
        "ContainerCreate" => Some(container::check as BodyCheck),
        "ServiceCreate" => Some(service::check as BodyCheck),
        "VolumeCreate" => Some(volume::check as BodyCheck),
        _ => None,
    };
    let Some(check) = check else {
        return AuthzResponse::allow();
    };
    let body = match req.body() {
        Ok(body) => body,
        Err(e) => return AuthzResponse::error(format!("can't decode request body: {e}")),
    };
    check(&rules, user, &body)
}

type BodyCheck = fn(&RuleSet, &str, &[u8]) -> AuthzResponse;

fn respond(outcome: Outcome) -> AuthzResponse {
    if outcome.allowed {
        AuthzResponse::allow()
    } else {
        let reason = outcome.reason.unwrap_or_else(|| "not allowed".into());
        debug!("DENY: {reason}");
        AuthzResponse::deny(reason)
    }
}

/// An empty body decodes as the payload's default.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AuthzResponse> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AuthzResponse::error(e.to_string()))
}
