//! Symlink-safe path canonicalization for mount checks.
//!
//! A bind mount must be judged by its real target, otherwise a forbidden
//! directory can be reached through an allowed symlink. The source of a new
//! bind mount often does not exist yet, so resolution tolerates a missing
//! tail: the longest existing prefix is resolved and the rest re-appended.

use crate::error::{AccessError, Result};
use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Same bound the kernel applies before failing with `ELOOP`.
const MAX_LINK_HOPS: usize = 40;

/// Lexically clean a path: drop `.` components, fold `..` into its parent and
/// strip trailing separators. Never touches the filesystem.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Resolve `name` to an absolute, symlink-free path.
///
/// Missing trailing components are peeled off one at a time until an existing
/// prefix resolves; they are then re-appended unresolved in their original
/// order. `..` inside the existing prefix is resolved by the filesystem, not
/// lexically, so it cannot be used to step around a symlink. A dangling
/// symlink on the way is followed by hand, so a link whose target does not
/// exist yet still resolves to that target. Any failure other than
/// "not found" is returned as [`AccessError::PathResolution`].
pub fn real_path(name: impl AsRef<Path>) -> Result<PathBuf> {
    let original = name.as_ref();
    let fail = |source: io::Error| AccessError::PathResolution {
        path: original.to_path_buf(),
        source,
    };

    let mut path = original.to_path_buf();
    // reversed: last component first
    let mut tail: Vec<OsString> = Vec::new();
    let mut hops = 0;

    loop {
        match std::fs::canonicalize(&path) {
            Ok(mut resolved) => {
                for comp in tail.iter().rev() {
                    if comp == ".." {
                        resolved.pop();
                    } else {
                        resolved.push(comp);
                    }
                }
                return Ok(resolved);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(fail(e)),
        }

        let dangling = std::fs::symlink_metadata(&path)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false);
        if dangling {
            hops += 1;
            if hops > MAX_LINK_HOPS {
                return Err(fail(io::Error::new(
                    io::ErrorKind::Other,
                    "too many levels of symbolic links",
                )));
            }
            let target = std::fs::read_link(&path).map_err(fail)?;
            let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
            path = base.join(target);
            continue;
        }

        match path.components().next_back() {
            Some(Component::Normal(last)) => tail.push(last.to_os_string()),
            Some(Component::ParentDir) => tail.push(OsString::from("..")),
            _ => {
                return Err(fail(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no existing prefix",
                )))
            }
        }
        path = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
    }
}

/// A bare volume name (`data`, `my_vol.1`) rather than a filesystem path.
///
/// Named volumes are not bind mounts and are never canonicalized.
pub fn is_volume_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}
