use super::{parse_body, respond};
use crate::app::wire::AuthzResponse;
use portcullis_core::{authorize_container, ContainerRequest, MountRequest, RuleSet};
use serde::Deserialize;
use serde_with::{serde_as, DefaultOnNull};
use std::collections::HashMap;
use tracing::{debug, error};

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct VolumeCreateBody {
    name: String,
    driver: String,
    #[serde_as(as = "DefaultOnNull")]
    driver_opts: HashMap<String, String>,
    #[serde_as(as = "DefaultOnNull")]
    labels: HashMap<String, String>,
}

/// Where a volume driver puts the volume's data on the host.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum DriverMount {
    /// Engine-managed storage, nothing to check.
    Local,
    At(String),
    Unknown,
}

/// Host path backing a volume of `driver` created with `opts`.
pub(super) fn driver_mount(
    driver: &str,
    opts: &HashMap<String, String>,
) -> Result<DriverMount, String> {
    match driver {
        "" | "local" => Ok(DriverMount::Local),
        "local-persist" => opts
            .get("mountpoint")
            .map(|mpt| DriverMount::At(mpt.clone()))
            .ok_or_else(|| "no mountpoint specified".to_string()),
        _ => Ok(DriverMount::Unknown),
    }
}

pub(super) fn check(rules: &RuleSet, user: &str, body: &[u8]) -> AuthzResponse {
    let body: VolumeCreateBody = match parse_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    debug!(
        "create volume request: volume {}, driver {}, labels {:?}, options {:?}",
        body.name, body.driver, body.labels, body.driver_opts
    );

    match driver_mount(&body.driver, &body.driver_opts) {
        Ok(DriverMount::Local) => AuthzResponse::allow(),
        Ok(DriverMount::At(mountpoint)) => {
            let request = ContainerRequest {
                mounts: vec![MountRequest::new(mountpoint, false)],
                ..ContainerRequest::default()
            };
            respond(authorize_container(rules, user, &request))
        }
        Ok(DriverMount::Unknown) => {
            error!(
                driver = %body.driver,
                volume = %body.name,
                "unknown volume driver, letting it through"
            );
            AuthzResponse::allow()
        }
        Err(e) => {
            error!(volume = %body.name, error = %e, "can't get mountpoint from request");
            AuthzResponse::error(e)
        }
    }
}
