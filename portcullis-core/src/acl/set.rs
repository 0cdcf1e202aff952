use super::*;
use crate::capability::normalize_capability;
use crate::error::Result;
use crate::path::{clean_path, is_volume_name, real_path};
use std::path::Path;
use tracing::{debug, error};

impl RuleSet {
    /// Stable-sort `rules` by `order`; rules sharing an order keep their
    /// relative position.
    pub fn new(mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(|r| r.order);
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First rule with an opinion, and that opinion.
    fn first_defined<F>(&self, eval: F) -> Option<(&Rule, EvalResult)>
    where
        F: Fn(&Rule) -> EvalResult,
    {
        self.rules.iter().find_map(|rule| {
            let res = eval(rule);
            res.is_defined().then_some((rule, res))
        })
    }

    fn decide<F>(&self, eval: F) -> Verdict
    where
        F: Fn(&Rule) -> EvalResult,
    {
        match self.first_defined(eval) {
            Some((rule, res)) => Verdict::new(res.is_accept(), rule.id.clone()),
            None => Verdict::default_policy(false),
        }
    }

    pub fn action_allowed(&self, action: &str) -> Verdict {
        self.decide(|rule| rule.action_result(action))
    }

    pub fn privileged_allowed(&self) -> Verdict {
        self.decide(Rule::privileged_result)
    }

    pub fn capability_allowed(&self, cap: &str) -> Verdict {
        let cap = normalize_capability(cap);
        self.decide(|rule| rule.capability_result(&cap))
    }

    /// Mount check that surfaces canonicalization failures.
    ///
    /// Bare volume names are allowed outright and never touch the filesystem.
    pub fn check_mount(&self, source: &str, read_only: bool) -> Result<Verdict> {
        if is_volume_name(source) {
            return Ok(Verdict::new(true, VOLUME_MOUNT));
        }
        let resolved = real_path(source)?;
        if resolved != clean_path(Path::new(source)) {
            debug!(path = source, target = %resolved.display(), "mount source resolves elsewhere");
        }
        let resolved = resolved.to_string_lossy();
        Ok(self.decide(|rule| rule.mount_result(&resolved, read_only)))
    }

    /// Fail-closed mount check: a source that cannot be canonicalized is
    /// rejected with [`BAD_PATH`].
    pub fn mount_allowed(&self, source: &str, read_only: bool) -> Verdict {
        self.check_mount(source, read_only).unwrap_or_else(|e| {
            error!(error = %e, "mount check failed");
            Verdict::new(false, BAD_PATH)
        })
    }

    /// No ceiling anywhere means unlimited.
    pub fn memory_within(&self, kind: MemoryKind, requested: u64) -> MemoryVerdict {
        match self.first_defined(|rule| rule.memory_result(kind, requested)) {
            Some((rule, res)) => MemoryVerdict {
                allowed: res.is_accept(),
                ceiling: rule.memory_ceiling(kind),
                rule_id: rule.id.clone(),
            },
            None => MemoryVerdict {
                allowed: true,
                ceiling: None,
                rule_id: DEFAULT_POLICY.to_string(),
            },
        }
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self::new(rules)
    }
}
