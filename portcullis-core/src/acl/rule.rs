use super::*;
use crate::capability::normalize_capability;

impl Rule {
    pub fn matches_user(&self, user: &str) -> bool {
        self.user.iter().any(|u| u == WILDCARD || u == user)
    }

    /// An exact `allow` entry wins immediately. Otherwise `ALL` in `allow`
    /// is provisional and any matching `deny` entry overrides it.
    pub fn action_result(&self, action: &str) -> EvalResult {
        let mut result = EvalResult::Undefined;
        for act in &self.allow {
            if act == action {
                return EvalResult::Accept;
            }
            if act == WILDCARD {
                result = EvalResult::Accept;
                break;
            }
        }
        if self.deny.iter().any(|act| act == action || act == WILDCARD) {
            result = EvalResult::Reject;
        }
        result
    }

    pub fn privileged_result(&self) -> EvalResult {
        match self.allow_privileged {
            Some(allowed) => EvalResult::from_bool(allowed),
            None => EvalResult::Undefined,
        }
    }

    /// `cap` must already be normalized. Like mounts, a grant list that does
    /// not name the capability leaves the decision to later rules.
    pub fn capability_result(&self, cap: &str) -> EvalResult {
        let granted = self
            .allow_capability
            .iter()
            .any(|c| c == WILDCARD || normalize_capability(c) == cap);
        if granted {
            EvalResult::Accept
        } else {
            EvalResult::Undefined
        }
    }

    /// `path` must already be canonical. A rule never rejects a mount: if none
    /// of its specifications match, it stays out of the decision.
    pub fn mount_result(&self, path: &str, read_only: bool) -> EvalResult {
        if self
            .mount
            .iter()
            .any(|raw| MountSpec::parse(raw).matches(path, read_only))
        {
            EvalResult::Accept
        } else {
            EvalResult::Undefined
        }
    }

    pub fn memory_ceiling(&self, kind: MemoryKind) -> Option<u64> {
        match kind {
            MemoryKind::Plain => self.max_memory,
            MemoryKind::Kernel => self.max_kernel_memory,
        }
    }

    pub fn memory_result(&self, kind: MemoryKind, requested: u64) -> EvalResult {
        match self.memory_ceiling(kind) {
            Some(ceiling) => EvalResult::from_bool(requested <= ceiling),
            None => EvalResult::Undefined,
        }
    }
}
