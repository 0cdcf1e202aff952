use super::container::MountBody;
use super::volume::{driver_mount, DriverMount};
use super::{parse_body, respond};
use crate::app::wire::AuthzResponse;
use portcullis_core::{authorize_container, ContainerRequest, MountRequest, RuleSet};
use serde::Deserialize;
use serde_with::{serde_as, DefaultOnNull};
use tracing::{debug, error};

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ServiceSpec {
    #[serde_as(as = "DefaultOnNull")]
    task_template: TaskTemplate,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct TaskTemplate {
    container_spec: Option<ContainerSpec>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ContainerSpec {
    #[serde_as(as = "DefaultOnNull")]
    capability_add: Vec<String>,
    #[serde_as(as = "DefaultOnNull")]
    mounts: Vec<MountBody>,
}

/// Swarm services: added capabilities, bind mounts, and volume mounts whose
/// driver stores data at a known host path.
pub(super) fn check(rules: &RuleSet, user: &str, body: &[u8]) -> AuthzResponse {
    let spec: ServiceSpec = match parse_body(body) {
        Ok(spec) => spec,
        Err(resp) => return resp,
    };
    let container = spec.task_template.container_spec.unwrap_or_default();
    debug!(
        caps = ?container.capability_add,
        mounts = container.mounts.len(),
        "create service request"
    );

    let mut mounts = Vec::new();
    for mount in &container.mounts {
        match mount.kind.as_str() {
            "bind" => mounts.push(MountRequest::new(mount.source.clone(), mount.read_only)),
            "volume" => {
                let Some(driver) = mount
                    .volume_options
                    .as_ref()
                    .and_then(|o| o.driver_config.as_ref())
                else {
                    continue;
                };
                match driver_mount(&driver.name, &driver.options) {
                    Ok(DriverMount::At(mountpoint)) => {
                        mounts.push(MountRequest::new(mountpoint, mount.read_only))
                    }
                    Ok(DriverMount::Local) => {}
                    Ok(DriverMount::Unknown) => error!(
                        driver = %driver.name,
                        volume = %mount.source,
                        "unknown volume driver, letting it through"
                    ),
                    Err(e) => {
                        error!(volume = %mount.source, error = %e, "can't get mountpoint from request");
                        return AuthzResponse::error(e);
                    }
                }
            }
            other => error!(kind = other, "ignoring mount request of unsupported type"),
        }
    }

    let request = ContainerRequest {
        cap_add: container.capability_add,
        mounts,
        ..ContainerRequest::default()
    };
    respond(authorize_container(rules, user, &request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use portcullis_core::Rule;

    fn rules() -> RuleSet {
        RuleSet::new(vec![Rule {
            id: "svc".into(),
            allow_capability: vec!["NET_ADMIN".into()],
            mount: vec!["/srv/*".into()],
            ..Rule::default()
        }])
    }

    #[test]
    fn capabilities_are_checked() {
        let ok = check(
            &rules(),
            "alice",
            br#"{"TaskTemplate":{"ContainerSpec":{"CapabilityAdd":["CAP_NET_ADMIN"]}}}"#,
        );
        assert!(ok.allow);

        let bad = check(
            &rules(),
            "alice",
            br#"{"TaskTemplate":{"ContainerSpec":{"CapabilityAdd":["SYS_ADMIN"]}}}"#,
        );
        assert_eq!(
            bad.msg.as_deref(),
            Some("capability SYS_ADMIN is not allowed (default policy)")
        );
    }

    #[test]
    fn volume_mounts_are_checked_at_the_driver_path() {
        let resp = check(
            &rules(),
            "alice",
            br#"{"TaskTemplate":{"ContainerSpec":{"Mounts":[
                {"Type":"volume","Source":"v","VolumeOptions":{"DriverConfig":
                    {"Name":"local-persist","Options":{"mountpoint":"/etc/app"}}}}
            ]}}}"#,
        );
        assert!(!resp.allow);
        assert_eq!(
            resp.msg.as_deref(),
            Some("mounting /etc/app is not allowed (default policy)")
        );
    }

    #[test]
    fn local_volumes_and_other_types_pass() {
        let resp = check(
            &rules(),
            "alice",
            br#"{"TaskTemplate":{"ContainerSpec":{"Mounts":[
                {"Type":"volume","Source":"v","VolumeOptions":{"DriverConfig":{"Name":"local"}}},
                {"Type":"tmpfs","Target":"/tmp"}
            ]}}}"#,
        );
        assert!(resp.allow);
    }

    #[test]
    fn empty_body_has_nothing_to_check() {
        assert!(check(&rules(), "alice", b"").allow);
    }
}
