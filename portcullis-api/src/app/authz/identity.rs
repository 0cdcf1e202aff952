//! Who the engine's user name refers to on this host.

use portcullis_core::Actor;
use tracing::debug;

/// Fill in groups, ids and home directory from the system user database.
/// A user the host doesn't know is matched by name only.
#[cfg(unix)]
pub fn resolve_actor(name: &str) -> Actor {
    use users::os::unix::UserExt;

    let Some(user) = users::get_user_by_name(name) else {
        debug!(user = name, "no such system user; matching by name only");
        return Actor::named(name);
    };
    let gid = user.primary_group_id();
    let groups = users::get_user_groups(name, gid)
        .unwrap_or_default()
        .iter()
        .map(|g| g.name().to_string_lossy().into_owned())
        .collect();
    let home = user.home_dir().to_string_lossy().into_owned();

    Actor {
        name: name.to_string(),
        groups,
        uid: Some(user.uid()),
        gid: Some(gid),
        home: Some(home).filter(|h| !h.is_empty()),
    }
}

#[cfg(not(unix))]
pub fn resolve_actor(name: &str) -> Actor {
    debug!(user = name, "no system user database; matching by name only");
    Actor::named(name)
}
