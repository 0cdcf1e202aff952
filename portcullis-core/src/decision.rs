//! Request-level authorization built from the per-category rule-set queries.

use crate::acl::{resolution, MemoryKind, RuleSet, Verdict};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// One mount source requested by a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountRequest {
    pub source: String,
    #[serde(default)]
    pub read_only: bool,
}

impl MountRequest {
    pub fn new(source: impl Into<String>, read_only: bool) -> Self {
        Self {
            source: source.into(),
            read_only,
        }
    }
}

/// The container-creation fields the engine checks, already extracted from
/// the API payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerRequest {
    pub privileged: bool,
    pub cap_add: Vec<String>,
    pub mounts: Vec<MountRequest>,
    pub memory: u64,
    pub kernel_memory: u64,
}

/// Final answer for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub allowed: bool,
    /// Why the request was denied; `None` when allowed.
    pub reason: Option<String>,
}

impl Outcome {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

pub fn authorize_action(rules: &RuleSet, user: &str, action: &str) -> Outcome {
    let verdict = rules.action_allowed(action);
    trace!(
        "{user}: action {action} is {} by {}",
        verdict.resolution(),
        verdict.rule_id
    );
    if verdict.allowed {
        Outcome::allow()
    } else {
        Outcome::deny(format!(
            "action {action} is not allowed ({})",
            verdict.rule_id
        ))
    }
}

/// Check privileged mode, capabilities, mounts and memory ceilings in that
/// order; the first violation decides.
pub fn authorize_container(rules: &RuleSet, user: &str, request: &ContainerRequest) -> Outcome {
    debug!(user, "checking container parameters");

    if request.privileged {
        let verdict = rules.privileged_allowed();
        trace!(
            "{user}: privileged container creation is {} by {}",
            verdict.resolution(),
            verdict.rule_id
        );
        if !verdict.allowed {
            return deny("privileged containers are not allowed", &verdict);
        }
    }

    for cap in &request.cap_add {
        let verdict = rules.capability_allowed(cap);
        trace!(
            "{user}: adding capability {cap} is {} by {}",
            verdict.resolution(),
            verdict.rule_id
        );
        if !verdict.allowed {
            return deny(&format!("capability {cap} is not allowed"), &verdict);
        }
    }

    for mount in &request.mounts {
        let verdict = rules.mount_allowed(&mount.source, mount.read_only);
        trace!(
            "{user}: mounting {} is {} by {}",
            mount.source,
            verdict.resolution(),
            verdict.rule_id
        );
        if !verdict.allowed {
            return deny(&format!("mounting {} is not allowed", mount.source), &verdict);
        }
    }

    for (kind, requested) in [
        (MemoryKind::Plain, request.memory),
        (MemoryKind::Kernel, request.kernel_memory),
    ] {
        let verdict = rules.memory_within(kind, requested);
        trace!(
            "{user}: {kind} limit {requested} is {} by {}",
            resolution(verdict.allowed),
            verdict.rule_id
        );
        if !verdict.allowed {
            let ceiling = verdict.ceiling.unwrap_or_default();
            return Outcome::deny(format!(
                "{kind} limit must be lower than or equal to {ceiling} ({})",
                verdict.rule_id
            ));
        }
    }

    Outcome::allow()
}

fn deny(what: &str, verdict: &Verdict) -> Outcome {
    Outcome::deny(format!("{what} ({})", verdict.rule_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::Rule;

    fn rules() -> RuleSet {
        RuleSet::new(vec![
            Rule {
                id: "caps".into(),
                allow_capability: vec!["NET_ADMIN".into()],
                order: 1,
                ..Rule::default()
            },
            Rule {
                id: "mem".into(),
                max_memory: Some(1 << 30),
                max_kernel_memory: Some(1 << 20),
                allow: vec!["ALL".into()],
                deny: vec!["ContainerDelete".into()],
                order: 2,
                ..Rule::default()
            },
        ])
    }

    #[test]
    fn action_denial_names_the_rule() {
        let set = rules();
        assert!(authorize_action(&set, "alice", "ContainerList").allowed);
        let out = authorize_action(&set, "alice", "ContainerDelete");
        assert!(!out.allowed);
        assert_eq!(
            out.reason.as_deref(),
            Some("action ContainerDelete is not allowed (mem)")
        );
    }

    #[test]
    fn plain_request_passes() {
        let request = ContainerRequest {
            memory: 512 << 20,
            ..ContainerRequest::default()
        };
        assert_eq!(authorize_container(&rules(), "alice", &request), Outcome::allow());
    }

    #[test]
    fn privileged_falls_back_to_default_policy() {
        let request = ContainerRequest {
            privileged: true,
            ..ContainerRequest::default()
        };
        let out = authorize_container(&rules(), "alice", &request);
        assert_eq!(
            out.reason.as_deref(),
            Some("privileged containers are not allowed (default policy)")
        );
    }

    #[test]
    fn capability_check() {
        let ok = ContainerRequest {
            cap_add: vec!["net_admin".into()],
            ..ContainerRequest::default()
        };
        assert!(authorize_container(&rules(), "alice", &ok).allowed);

        let bad = ContainerRequest {
            cap_add: vec!["net_admin".into(), "SYS_ADMIN".into()],
            ..ContainerRequest::default()
        };
        let out = authorize_container(&rules(), "alice", &bad);
        assert_eq!(
            out.reason.as_deref(),
            Some("capability SYS_ADMIN is not allowed (default policy)")
        );
    }

    #[test]
    fn memory_ceilings() {
        let big = ContainerRequest {
            memory: 2 << 30,
            ..ContainerRequest::default()
        };
        let out = authorize_container(&rules(), "alice", &big);
        assert_eq!(
            out.reason.as_deref(),
            Some("memory limit must be lower than or equal to 1073741824 (mem)")
        );

        let kernel = ContainerRequest {
            kernel_memory: 2 << 20,
            ..ContainerRequest::default()
        };
        let out = authorize_container(&rules(), "alice", &kernel);
        assert_eq!(
            out.reason.as_deref(),
            Some("kernel memory limit must be lower than or equal to 1048576 (mem)")
        );
    }

    #[test]
    fn volume_mount_passes_bind_mount_does_not() {
        let request = ContainerRequest {
            mounts: vec![MountRequest::new("cache", false)],
            ..ContainerRequest::default()
        };
        assert!(authorize_container(&rules(), "alice", &request).allowed);

        let request = ContainerRequest {
            mounts: vec![MountRequest::new("/", true)],
            ..ContainerRequest::default()
        };
        let out = authorize_container(&rules(), "alice", &request);
        assert_eq!(
            out.reason.as_deref(),
            Some("mounting / is not allowed (default policy)")
        );
    }
}
