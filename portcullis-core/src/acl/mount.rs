//! Mount-point specifications as written in rules.
//!
//! ```text
//! /srv/data          exact path
//! /srv/data/*        anything below /srv/data
//! /home/*/cache      glob, `**` crosses directories
//! /srv/ro (ro)       any of the above, read-only requests only
//! ```

use crate::path::clean_path;
use crate::wildmat::{has_glob_meta, match_glob, GlobMode};
use std::path::Path;

const READ_ONLY_MARKER: &str = "(ro)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountPattern {
    Exact(String),
    /// Stored with its trailing separator, e.g. `/srv/data/`.
    Subtree(String),
    Glob(String),
    /// An empty entry. Never matches.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub pattern: MountPattern,
    pub read_only: bool,
}

impl MountSpec {
    pub fn parse(raw: &str) -> Self {
        let (body, read_only) = match raw.strip_suffix(READ_ONLY_MARKER) {
            Some(rest) if !rest.trim_end().is_empty() => (rest.trim_end(), true),
            _ => (raw, false),
        };

        if body.trim().is_empty() {
            return Self {
                pattern: MountPattern::Empty,
                read_only,
            };
        }

        let pattern = match body.strip_suffix("/*") {
            Some(prefix) if !has_glob_meta(prefix) => {
                let mut prefix = clean(prefix);
                if !prefix.ends_with('/') {
                    prefix.push('/');
                }
                MountPattern::Subtree(prefix)
            }
            _ if has_glob_meta(body) => MountPattern::Glob(body.to_string()),
            _ => MountPattern::Exact(clean(body)),
        };

        Self { pattern, read_only }
    }

    /// `path` must already be canonical.
    pub fn matches(&self, path: &str, read_only: bool) -> bool {
        if self.read_only && !read_only {
            return false;
        }
        match &self.pattern {
            MountPattern::Exact(p) => p == path,
            MountPattern::Subtree(prefix) => path.starts_with(prefix.as_str()),
            MountPattern::Glob(glob) => match_glob(glob, path, GlobMode::PathDoubleStar),
            MountPattern::Empty => false,
        }
    }
}

fn clean(s: &str) -> String {
    if s.is_empty() {
        return "/".to_string();
    }
    clean_path(Path::new(s)).to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kinds() {
        assert_eq!(
            MountSpec::parse("/srv/data").pattern,
            MountPattern::Exact("/srv/data".into())
        );
        assert_eq!(
            MountSpec::parse("/srv/data/").pattern,
            MountPattern::Exact("/srv/data".into())
        );
        assert_eq!(
            MountSpec::parse("/srv/data/*").pattern,
            MountPattern::Subtree("/srv/data/".into())
        );
        assert_eq!(MountSpec::parse("/*").pattern, MountPattern::Subtree("/".into()));
        assert_eq!(MountSpec::parse("").pattern, MountPattern::Empty);
        assert_eq!(
            MountSpec::parse("/home/*/cache").pattern,
            MountPattern::Glob("/home/*/cache".into())
        );
        assert_eq!(
            MountSpec::parse("/home/*/x/*").pattern,
            MountPattern::Glob("/home/*/x/*".into())
        );
    }

    #[test]
    fn empty_entries_match_nothing() {
        for raw in ["", "   ", " (ro)"] {
            let spec = MountSpec::parse(raw);
            assert_eq!(spec.pattern, MountPattern::Empty, "{raw:?}");
            assert!(!spec.matches("/", false));
            assert!(!spec.matches("/", true));
            assert!(!spec.matches("/etc", true));
        }
    }

    #[test]
    fn read_only_marker() {
        let spec = MountSpec::parse("/ro (ro)");
        assert!(spec.read_only);
        assert_eq!(spec.pattern, MountPattern::Exact("/ro".into()));
        assert!(spec.matches("/ro", true));
        assert!(!spec.matches("/ro", false));

        let tight = MountSpec::parse("/srv/*(ro)");
        assert!(tight.read_only);
        assert_eq!(tight.pattern, MountPattern::Subtree("/srv/".into()));

        // a bare marker is a (strange) literal path, not a flag
        assert!(!MountSpec::parse("(ro)").read_only);
    }

    #[test]
    fn subtree_is_a_string_prefix_below_the_directory() {
        let spec = MountSpec::parse("/data/*");
        assert!(spec.matches("/data/sub/file", false));
        assert!(spec.matches("/data/x", false));
        assert!(!spec.matches("/data", false));
        assert!(!spec.matches("/database", false));
        assert!(!spec.matches("/other/file", false));
    }

    #[test]
    fn glob_specs() {
        let one = MountSpec::parse("/home/*/cache");
        assert!(one.matches("/home/alice/cache", false));
        assert!(!one.matches("/home/alice/x/cache", false));

        let deep = MountSpec::parse("/home/**/cache");
        assert!(deep.matches("/home/alice/x/cache", false));
    }
}
