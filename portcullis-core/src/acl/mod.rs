//! Access-control entries (rules) and ordered rule sets.
//!
//! Every category query walks the rule set in priority order and stops at the
//! first rule with an opinion. A rule without an opinion on a category is
//! transparent to it. When nobody has an opinion the category's default
//! policy applies: deny for permissions, no ceiling for memory.

mod mount;
mod rule;
mod set;

pub use mount::{MountPattern, MountSpec};

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Matches every user, action or capability.
pub const WILDCARD: &str = "ALL";
/// Reported in place of a rule id when no rule had an opinion.
pub const DEFAULT_POLICY: &str = "default policy";
/// Reported when a mount source could not be canonicalized.
pub const BAD_PATH: &str = "(bad path)";
/// Reported for named-volume mounts, which are always allowed.
pub const VOLUME_MOUNT: &str = "volume mount";

/// One access-control entry.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    pub id: String,
    pub user: Vec<String>,
    pub host: Vec<String>,
    pub allow: Vec<String>,
    pub deny: Vec<String>,
    pub mount: Vec<String>,
    pub allow_privileged: Option<bool>,
    pub max_memory: Option<u64>,
    pub max_kernel_memory: Option<u64>,
    pub allow_capability: Vec<String>,
    pub order: i32,
}

/// Per-rule verdict on one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalResult {
    /// The rule has no opinion; evaluation falls through.
    Undefined,
    Reject,
    Accept,
}

impl EvalResult {
    pub fn from_bool(accept: bool) -> Self {
        if accept {
            EvalResult::Accept
        } else {
            EvalResult::Reject
        }
    }

    pub fn is_defined(self) -> bool {
        self != EvalResult::Undefined
    }

    pub fn is_accept(self) -> bool {
        self == EvalResult::Accept
    }
}

/// Outcome of a permission query: the decision and who made it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub allowed: bool,
    /// Id of the deciding rule, or one of [`DEFAULT_POLICY`], [`BAD_PATH`], [`VOLUME_MOUNT`].
    pub rule_id: String,
}

impl Verdict {
    pub fn new(allowed: bool, rule_id: impl Into<String>) -> Self {
        Self {
            allowed,
            rule_id: rule_id.into(),
        }
    }

    pub fn default_policy(allowed: bool) -> Self {
        Self::new(allowed, DEFAULT_POLICY)
    }

    /// `accepted` / `rejected`, for log lines.
    pub fn resolution(&self) -> &'static str {
        resolution(self.allowed)
    }
}

/// Which memory ceiling a query is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Plain,
    Kernel,
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryKind::Plain => f.write_str("memory"),
            MemoryKind::Kernel => f.write_str("kernel memory"),
        }
    }
}

/// Outcome of a memory-ceiling query.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryVerdict {
    pub allowed: bool,
    /// The deciding rule's ceiling; `None` under the default policy.
    pub ceiling: Option<u64>,
    pub rule_id: String,
}

/// Rules sorted by `order`, ready to be queried.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

pub fn resolution(allowed: bool) -> &'static str {
    if allowed {
        "accepted"
    } else {
        "rejected"
    }
}
