//! File-backed rule source.
//!
//! Rules live in a JSON document, either `{"rules": [...]}` or a bare array.
//! Each decision loads a fresh [`RuleSet`] for one actor: records are filtered
//! by user, validity window and host, mount variables are expanded, and the
//! result is sorted by order.

use crate::acl::{Rule, RuleSet, WILDCARD};
use crate::error::{AccessError, Result};
use crate::size::parse_byte_size;
use crate::wildmat::{match_glob, GlobMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// The identity a rule set is assembled for. Resolved by the caller.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub home: Option<String>,
}

impl Actor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "name" => Some(self.name.clone()),
            "uid" => self.uid.map(|v| v.to_string()),
            "gid" => self.gid.map(|v| v.to_string()),
            "home" | "dir" => self.home.clone().filter(|h| !h.is_empty()),
            _ => None,
        }
    }
}

/// A size given either as a byte count or as text (`"2g"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SizeValue {
    Bytes(u64),
    Text(String),
}

impl SizeValue {
    fn bytes(&self) -> Result<u64> {
        match self {
            SizeValue::Bytes(n) => Ok(*n),
            SizeValue::Text(s) => parse_byte_size(s.trim()),
        }
    }
}

/// One rule as written in the rule file.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleRecord {
    pub id: Option<String>,
    pub user: Vec<String>,
    pub host: Vec<String>,
    pub allow: Vec<String>,
    pub deny: Vec<String>,
    pub order: i32,
    pub mount: Vec<String>,
    pub allow_privileged: Option<bool>,
    pub max_memory: Option<SizeValue>,
    pub max_kernel_memory: Option<SizeValue>,
    pub allow_capability: Vec<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RuleFile {
    Wrapped { rules: Vec<RuleRecord> },
    Bare(Vec<RuleRecord>),
}

impl RuleRecord {
    /// Malformed sizes drop the ceiling rather than the whole rule.
    pub fn to_rule(&self, index: usize) -> Rule {
        let id = self.id.clone().unwrap_or_else(|| format!("rule#{index}"));
        let size = |field: &str, value: &Option<SizeValue>| {
            value.as_ref().and_then(|v| match v.bytes() {
                Ok(n) => Some(n),
                Err(e) => {
                    warn!(rule = %id, field, error = %e, "ignoring malformed size");
                    None
                }
            })
        };
        let max_memory = size("max_memory", &self.max_memory);
        let max_kernel_memory = size("max_kernel_memory", &self.max_kernel_memory);

        Rule {
            id,
            user: self.user.clone(),
            host: self.host.clone(),
            allow: self.allow.clone(),
            deny: self.deny.clone(),
            mount: self.mount.clone(),
            allow_privileged: self.allow_privileged,
            max_memory,
            max_kernel_memory,
            allow_capability: self.allow_capability.clone(),
            order: self.order,
        }
    }

    fn in_window(&self, now: DateTime<Utc>) -> bool {
        self.not_before.map_or(true, |t| t <= now) && self.not_after.map_or(true, |t| now <= t)
    }
}

/// Rule file on disk plus the host name rules are matched against.
#[derive(Debug, Clone)]
pub struct RuleStore {
    path: PathBuf,
    hostname: Option<String>,
}

impl RuleStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            hostname: None,
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Every record in the file, unfiltered.
    pub fn load_records(&self) -> Result<Vec<RuleRecord>> {
        let data = std::fs::read(&self.path).map_err(|e| {
            AccessError::RuleSource(format!("can't read {}: {e}", self.path.display()))
        })?;
        let file: RuleFile = serde_json::from_slice(&data)?;
        Ok(match file {
            RuleFile::Wrapped { rules } | RuleFile::Bare(rules) => rules,
        })
    }

    pub fn load_for(&self, actor: &Actor) -> Result<RuleSet> {
        self.load_for_at(actor, Utc::now())
    }

    #[instrument(skip(self, actor), fields(user = %actor.name))]
    pub fn load_for_at(&self, actor: &Actor, now: DateTime<Utc>) -> Result<RuleSet> {
        let records = self.load_records()?;
        let mut rules = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if !record.in_window(now) {
                continue;
            }
            let mut rule = record.to_rule(index);
            if !applies_to(&rule, actor) || !self.matches_host(&rule.host, &actor.name) {
                continue;
            }
            expand_mounts(&mut rule, actor);
            rules.push(rule);
        }
        debug!(count = rules.len(), "rule set assembled");
        Ok(RuleSet::new(rules))
    }

    /// An empty host list applies everywhere.
    fn matches_host(&self, patterns: &[String], user: &str) -> bool {
        if patterns.is_empty() {
            return true;
        }
        patterns.iter().any(|pattern| {
            if pattern == WILDCARD {
                return true;
            }
            if let Some(netgroup) = pattern.strip_prefix('+') {
                warn!(netgroup, user, "netgroup host patterns are not supported");
                return false;
            }
            let Some(hostname) = &self.hostname else {
                return false;
            };
            match_glob(
                &pattern.to_lowercase(),
                &hostname.to_lowercase(),
                GlobMode::Lexical,
            )
        })
    }
}

/// `ALL`, the actor's name, or `%group` for one of the actor's groups.
fn applies_to(rule: &Rule, actor: &Actor) -> bool {
    rule.matches_user(&actor.name)
        || rule.user.iter().any(|u| {
            u.strip_prefix('%')
                .is_some_and(|group| actor.groups.iter().any(|g| g == group))
        })
}

fn expand_mounts(rule: &mut Rule, actor: &Actor) {
    for spec in &mut rule.mount {
        let expanded = expand_vars(spec, actor);
        if expanded != *spec {
            debug!("expand {} => {}", spec, expanded);
            *spec = expanded;
        }
    }
}

/// Substitute `$key` / `${key}` with actor fields. Unknown keys, and keys the
/// actor has no value for, are left as written.
fn expand_vars(spec: &str, actor: &Actor) -> String {
    let mut out = String::with_capacity(spec.len());
    let mut rest = spec;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let (key, consumed) = match after.strip_prefix('{') {
            Some(inner) => match inner.find('}') {
                Some(end) => (&inner[..end], end + 2),
                None => ("", 0),
            },
            None => {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..end], end)
            }
        };
        match (consumed > 0).then(|| actor.lookup(key)).flatten() {
            Some(value) => {
                out.push_str(&value);
                rest = &after[consumed..];
            }
            None => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn store_with(json: &str) -> (TempDir, RuleStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, json).unwrap();
        let store = RuleStore::new(&path).with_hostname("Build01.example.org");
        (dir, store)
    }

    fn ids(set: &RuleSet) -> Vec<&str> {
        set.rules().iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn filters_by_user_and_group() {
        let (_dir, store) = store_with(
            r#"{"rules": [
                {"id": "everyone", "user": ["ALL"], "order": 3},
                {"id": "alice", "user": ["alice"], "order": 1},
                {"id": "bob", "user": ["bob"]},
                {"id": "ops", "user": ["%ops"], "order": 2}
            ]}"#,
        );
        let alice = Actor::named("alice").with_groups(vec!["ops".into()]);
        let set = store.load_for(&alice).unwrap();
        assert_eq!(ids(&set), ["alice", "ops", "everyone"]);

        let carol = Actor::named("carol");
        let set = store.load_for(&carol).unwrap();
        assert_eq!(ids(&set), ["everyone"]);
    }

    #[test]
    fn bare_array_and_default_ids() {
        let (_dir, store) = store_with(r#"[{"user": ["ALL"]}, {"user": ["ALL"]}]"#);
        let set = store.load_for(&Actor::named("x")).unwrap();
        assert_eq!(ids(&set), ["rule#0", "rule#1"]);
    }

    #[test]
    fn sizes_and_bad_sizes() {
        let (_dir, store) = store_with(
            r#"[{"id": "r", "user": ["ALL"], "max_memory": "2g", "max_kernel_memory": "lots"},
                {"id": "n", "user": ["ALL"], "max_memory": 4096}]"#,
        );
        let set = store.load_for(&Actor::named("x")).unwrap();
        assert_eq!(set.rules()[0].max_memory, Some(2 << 30));
        assert_eq!(set.rules()[0].max_kernel_memory, None);
        assert_eq!(set.rules()[1].max_memory, Some(4096));
    }

    #[test]
    fn validity_window() {
        let (_dir, store) = store_with(
            r#"[{"id": "past", "user": ["ALL"], "not_after": "2020-01-01T00:00:00Z"},
                {"id": "future", "user": ["ALL"], "not_before": "2030-01-01T00:00:00Z"},
                {"id": "now", "user": ["ALL"], "not_before": "2024-01-01T00:00:00Z", "not_after": "2026-01-01T00:00:00Z"}]"#,
        );
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let set = store.load_for_at(&Actor::named("x"), at).unwrap();
        assert_eq!(ids(&set), ["now"]);
    }

    #[test]
    fn host_patterns() {
        let (_dir, store) = store_with(
            r#"[{"id": "exact", "user": ["ALL"], "host": ["build01.EXAMPLE.org"]},
                {"id": "glob", "user": ["ALL"], "host": ["build*.example.org"]},
                {"id": "other", "user": ["ALL"], "host": ["web01"]},
                {"id": "netgroup", "user": ["ALL"], "host": ["+builders"]},
                {"id": "anywhere", "user": ["ALL"], "host": ["ALL"]},
                {"id": "unrestricted", "user": ["ALL"]}]"#,
        );
        let set = store.load_for(&Actor::named("x")).unwrap();
        assert_eq!(ids(&set), ["exact", "glob", "anywhere", "unrestricted"]);
    }

    #[test]
    fn host_restricted_rules_need_a_hostname() {
        let (_dir, store) = store_with(r#"[{"id": "h", "user": ["ALL"], "host": ["build*"]}]"#);
        let store = RuleStore::new(store.path());
        assert!(store.load_for(&Actor::named("x")).unwrap().is_empty());
    }

    #[test]
    fn mount_variables_expand() {
        let (_dir, store) = store_with(
            r#"[{"id": "home", "user": ["ALL"],
                 "mount": ["$home/*", "/srv/${name}/data", "/run/user/$uid (ro)", "/x/$shell", "/cost$"]}]"#,
        );
        let actor = Actor {
            name: "alice".into(),
            uid: Some(1000),
            home: Some("/home/alice".into()),
            ..Actor::default()
        };
        let set = store.load_for(&actor).unwrap();
        assert_eq!(
            set.rules()[0].mount,
            [
                "/home/alice/*",
                "/srv/alice/data",
                "/run/user/1000 (ro)",
                "/x/$shell",
                "/cost$"
            ]
        );
    }

    #[test]
    fn empty_home_does_not_open_the_root() {
        let (_dir, store) = store_with(r#"[{"id": "home", "user": ["ALL"], "mount": ["$home/*"]}]"#);
        let actor = Actor {
            home: Some(String::new()),
            ..Actor::named("nobody")
        };
        let set = store.load_for(&actor).unwrap();
        assert_eq!(set.rules()[0].mount, ["$home/*"]);
        assert!(!set.mount_allowed("/etc", false).allowed);
    }

    #[test]
    fn missing_file_is_a_rule_source_error() {
        let store = RuleStore::new("/nonexistent/rules.json");
        assert!(matches!(
            store.load_for(&Actor::named("x")),
            Err(AccessError::RuleSource(_))
        ));
    }

    #[test]
    fn malformed_file_is_a_serde_error() {
        let (_dir, store) = store_with("{not json");
        assert!(matches!(
            store.load_for(&Actor::named("x")),
            Err(AccessError::Serde(_))
        ));
    }
}
