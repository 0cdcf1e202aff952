use super::{parse_body, respond};
use crate::app::wire::AuthzResponse;
use portcullis_core::{authorize_container, ContainerRequest, MountRequest, RuleSet};
use serde::Deserialize;
use serde_with::{serde_as, DefaultOnNull};

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(super) struct CreateBody {
    #[serde_as(as = "DefaultOnNull")]
    pub host_config: HostConfig,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(super) struct HostConfig {
    pub privileged: bool,
    #[serde_as(as = "DefaultOnNull")]
    pub cap_add: Vec<String>,
    #[serde_as(as = "DefaultOnNull")]
    pub binds: Vec<String>,
    #[serde_as(as = "DefaultOnNull")]
    pub mounts: Vec<MountBody>,
    #[serde_as(as = "DefaultOnNull")]
    pub memory: i64,
    #[serde_as(as = "DefaultOnNull")]
    pub kernel_memory: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(super) struct MountBody {
    #[serde(rename = "Type")]
    pub kind: String,
    pub source: String,
    pub read_only: bool,
    pub volume_options: Option<VolumeOptions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(super) struct VolumeOptions {
    pub driver_config: Option<DriverConfig>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(super) struct DriverConfig {
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    pub options: std::collections::HashMap<String, String>,
}

impl MountBody {
    pub fn is_bind(&self) -> bool {
        self.kind == "bind"
    }
}

/// `src:dst[:opts]`; `ro` among the comma-separated options makes it read-only.
fn parse_bind(bind: &str) -> MountRequest {
    let mut parts = bind.splitn(3, ':');
    let source = parts.next().unwrap_or_default();
    let read_only = parts
        .nth(1)
        .is_some_and(|opts| opts.split(',').any(|o| o == "ro"));
    MountRequest::new(source, read_only)
}

impl From<HostConfig> for ContainerRequest {
    fn from(host: HostConfig) -> Self {
        let mut mounts: Vec<MountRequest> =
            host.binds.iter().map(String::as_str).map(parse_bind).collect();
        mounts.extend(
            host.mounts
                .iter()
                .filter(|m| m.is_bind())
                .map(|m| MountRequest::new(m.source.clone(), m.read_only)),
        );
        ContainerRequest {
            privileged: host.privileged,
            cap_add: host.cap_add,
            mounts,
            memory: host.memory.max(0).unsigned_abs(),
            kernel_memory: host.kernel_memory.max(0).unsigned_abs(),
        }
    }
}

pub(super) fn check(rules: &RuleSet, user: &str, body: &[u8]) -> AuthzResponse {
    tracing::debug!("checking container parameters");
    let body: CreateBody = match parse_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    respond(authorize_container(rules, user, &body.host_config.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_split_into_source_and_mode() {
        assert_eq!(parse_bind("/srv:/data"), MountRequest::new("/srv", false));
        assert_eq!(parse_bind("/srv:/data:ro"), MountRequest::new("/srv", true));
        assert_eq!(parse_bind("/srv:/data:z,ro"), MountRequest::new("/srv", true));
        assert_eq!(parse_bind("/srv:/data:rw"), MountRequest::new("/srv", false));
        assert_eq!(parse_bind("cache:/var/cache"), MountRequest::new("cache", false));
    }

    #[test]
    fn host_config_with_nulls() {
        let body: CreateBody = serde_json::from_str(
            r#"{"Image":"alpine","HostConfig":{"Privileged":true,"CapAdd":null,"Binds":["/a:/b:ro"],
                "Mounts":[{"Type":"bind","Source":"/c","ReadOnly":false},{"Type":"volume","Source":"v"}],
                "Memory":1024,"KernelMemory":null}}"#,
        )
        .unwrap();
        let request = ContainerRequest::from(body.host_config);
        assert!(request.privileged);
        assert!(request.cap_add.is_empty());
        assert_eq!(
            request.mounts,
            [MountRequest::new("/a", true), MountRequest::new("/c", false)]
        );
        assert_eq!(request.memory, 1024);
        assert_eq!(request.kernel_memory, 0);
    }

    #[test]
    fn negative_memory_counts_as_unset() {
        let host = HostConfig {
            memory: -1,
            ..HostConfig::default()
        };
        assert_eq!(ContainerRequest::from(host).memory, 0);
    }
}
