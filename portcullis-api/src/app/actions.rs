//! Mapping of engine API requests onto action names.

use portcullis_core::{match_glob, GlobMode};

/// Action reported for requests with no route entry. Only `ALL` grants it.
pub const UNKNOWN_ACTION: &str = "Unknown";

struct Route {
    method: &'static str,
    pattern: &'static str,
    action: &'static str,
}

const fn route(method: &'static str, pattern: &'static str, action: &'static str) -> Route {
    Route {
        method,
        pattern,
        action,
    }
}

/// Checked top to bottom. Patterns are `PathDoubleStar` globs: `*` is one
/// path segment, `**` spans image names that contain `/`.
static ROUTES: &[Route] = &[
    route("GET", "/_ping", "Ping"),
    route("HEAD", "/_ping", "Ping"),
    route("GET", "/info", "DockerInfo"),
    route("GET", "/version", "DockerVersion"),
    route("GET", "/events", "DockerEvents"),
    route("GET", "/system/df", "SystemDataUsage"),
    route("POST", "/auth", "DockerLogin"),
    // containers
    route("GET", "/containers/json", "ContainerList"),
    route("POST", "/containers/create", "ContainerCreate"),
    route("POST", "/containers/prune", "ContainerPrune"),
    route("GET", "/containers/*/json", "ContainerInspect"),
    route("GET", "/containers/*/top", "ContainerTop"),
    route("GET", "/containers/*/logs", "ContainerLogs"),
    route("GET", "/containers/*/changes", "ContainerChanges"),
    route("GET", "/containers/*/export", "ContainerExport"),
    route("GET", "/containers/*/stats", "ContainerStats"),
    route("POST", "/containers/*/resize", "ContainerResize"),
    route("POST", "/containers/*/start", "ContainerStart"),
    route("POST", "/containers/*/stop", "ContainerStop"),
    route("POST", "/containers/*/restart", "ContainerRestart"),
    route("POST", "/containers/*/kill", "ContainerKill"),
    route("POST", "/containers/*/update", "ContainerUpdate"),
    route("POST", "/containers/*/rename", "ContainerRename"),
    route("POST", "/containers/*/pause", "ContainerPause"),
    route("POST", "/containers/*/unpause", "ContainerUnpause"),
    route("POST", "/containers/*/attach", "ContainerAttach"),
    route("GET", "/containers/*/attach/ws", "ContainerAttachWs"),
    route("POST", "/containers/*/wait", "ContainerWait"),
    route("POST", "/containers/*/exec", "ContainerExecCreate"),
    route("HEAD", "/containers/*/archive", "ContainerArchiveInfo"),
    route("GET", "/containers/*/archive", "ContainerArchive"),
    route("PUT", "/containers/*/archive", "ContainerArchiveExtract"),
    route("DELETE", "/containers/*", "ContainerDelete"),
    // exec
    route("POST", "/exec/*/start", "ExecStart"),
    route("POST", "/exec/*/resize", "ExecResize"),
    route("GET", "/exec/*/json", "ExecInspect"),
    // images
    route("GET", "/images/json", "ImageList"),
    route("GET", "/images/search", "ImageSearch"),
    route("GET", "/images/get", "ImageGetAll"),
    route("POST", "/images/create", "ImageCreate"),
    route("POST", "/images/load", "ImageLoad"),
    route("POST", "/images/prune", "ImagePrune"),
    route("POST", "/build", "ImageBuild"),
    route("POST", "/build/prune", "BuildPrune"),
    route("POST", "/commit", "ImageCommit"),
    route("GET", "/images/**/json", "ImageInspect"),
    route("GET", "/images/**/history", "ImageHistory"),
    route("GET", "/images/**/get", "ImageGet"),
    route("POST", "/images/**/push", "ImagePush"),
    route("POST", "/images/**/tag", "ImageTag"),
    route("DELETE", "/images/**", "ImageDelete"),
    route("GET", "/distribution/**/json", "DistributionInspect"),
    // networks
    route("GET", "/networks", "NetworkList"),
    route("POST", "/networks/create", "NetworkCreate"),
    route("POST", "/networks/prune", "NetworkPrune"),
    route("GET", "/networks/*", "NetworkInspect"),
    route("POST", "/networks/*/connect", "NetworkConnect"),
    route("POST", "/networks/*/disconnect", "NetworkDisconnect"),
    route("DELETE", "/networks/*", "NetworkDelete"),
    // volumes
    route("GET", "/volumes", "VolumeList"),
    route("POST", "/volumes/create", "VolumeCreate"),
    route("POST", "/volumes/prune", "VolumePrune"),
    route("GET", "/volumes/*", "VolumeInspect"),
    route("DELETE", "/volumes/*", "VolumeDelete"),
    // swarm
    route("GET", "/swarm", "SwarmInspect"),
    route("POST", "/swarm/init", "SwarmInit"),
    route("POST", "/swarm/join", "SwarmJoin"),
    route("POST", "/swarm/leave", "SwarmLeave"),
    route("POST", "/swarm/update", "SwarmUpdate"),
    route("GET", "/swarm/unlockkey", "SwarmUnlockKey"),
    route("POST", "/swarm/unlock", "SwarmUnlock"),
    route("GET", "/nodes", "NodeList"),
    route("GET", "/nodes/*", "NodeInspect"),
    route("POST", "/nodes/*/update", "NodeUpdate"),
    route("DELETE", "/nodes/*", "NodeDelete"),
    route("GET", "/services", "ServiceList"),
    route("POST", "/services/create", "ServiceCreate"),
    route("GET", "/services/*", "ServiceInspect"),
    route("POST", "/services/*/update", "ServiceUpdate"),
    route("GET", "/services/*/logs", "ServiceLogs"),
    route("DELETE", "/services/*", "ServiceDelete"),
    route("GET", "/tasks", "TaskList"),
    route("GET", "/tasks/*", "TaskInspect"),
    route("GET", "/tasks/*/logs", "TaskLogs"),
    route("GET", "/secrets", "SecretList"),
    route("POST", "/secrets/create", "SecretCreate"),
    route("GET", "/secrets/*", "SecretInspect"),
    route("POST", "/secrets/*/update", "SecretUpdate"),
    route("DELETE", "/secrets/*", "SecretDelete"),
    route("GET", "/configs", "ConfigList"),
    route("POST", "/configs/create", "ConfigCreate"),
    route("GET", "/configs/*", "ConfigInspect"),
    route("POST", "/configs/*/update", "ConfigUpdate"),
    route("DELETE", "/configs/*", "ConfigDelete"),
    // plugins
    route("GET", "/plugins", "PluginList"),
    route("GET", "/plugins/privileges", "PluginPrivileges"),
    route("POST", "/plugins/pull", "PluginInstall"),
    route("POST", "/plugins/create", "PluginCreate"),
    route("GET", "/plugins/**/json", "PluginInspect"),
    route("POST", "/plugins/**/enable", "PluginEnable"),
    route("POST", "/plugins/**/disable", "PluginDisable"),
    route("POST", "/plugins/**/upgrade", "PluginUpgrade"),
    route("POST", "/plugins/**/push", "PluginPush"),
    route("POST", "/plugins/**/set", "PluginSet"),
    route("DELETE", "/plugins/**", "PluginDelete"),
    route("POST", "/session", "Session"),
];

/// Unescape `raw`, drop the query string and the `/vX.Y` version prefix.
pub fn normalize_uri(raw: &str) -> Result<String, String> {
    let unescaped = urlencoding::decode(raw).map_err(|e| format!("bad request URI {raw:?}: {e}"))?;
    let path = unescaped.split('?').next().unwrap_or_default();
    Ok(strip_version(path).to_string())
}

fn strip_version(path: &str) -> &str {
    let Some(rest) = path.strip_prefix("/v") else {
        return path;
    };
    let end = rest.find('/').unwrap_or(rest.len());
    let (version, tail) = rest.split_at(end);
    let numeric = version
        .split_once('.')
        .is_some_and(|(major, minor)| is_digits(major) && is_digits(minor));
    if numeric {
        if tail.is_empty() {
            "/"
        } else {
            tail
        }
    } else {
        path
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Action name for a request. `path` must already be normalized.
pub fn action_for(method: &str, path: &str) -> &'static str {
    let path = match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    };
    ROUTES
        .iter()
        .find(|r| {
            r.method.eq_ignore_ascii_case(method)
                && match_glob(r.pattern, path, GlobMode::PathDoubleStar)
        })
        .map_or(UNKNOWN_ACTION, |r| r.action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_prefix_and_query_are_dropped() {
        assert_eq!(
            normalize_uri("/v1.41/containers/json?all=1").unwrap(),
            "/containers/json"
        );
        assert_eq!(normalize_uri("/containers/json").unwrap(), "/containers/json");
        assert_eq!(normalize_uri("/v1.41").unwrap(), "/");
        assert_eq!(normalize_uri("/volumes/v1.x").unwrap(), "/volumes/v1.x");
        assert_eq!(normalize_uri("/vx.1/info").unwrap(), "/vx.1/info");
    }

    #[test]
    fn escaped_uri_is_decoded_before_the_query_is_cut() {
        assert_eq!(
            normalize_uri("/v1.41/images/library%2Fubuntu%3A22.04/json").unwrap(),
            "/images/library/ubuntu:22.04/json"
        );
    }

    #[test]
    fn container_routes() {
        assert_eq!(action_for("POST", "/containers/create"), "ContainerCreate");
        assert_eq!(action_for("GET", "/containers/json"), "ContainerList");
        assert_eq!(action_for("GET", "/containers/abc123/json"), "ContainerInspect");
        assert_eq!(action_for("post", "/containers/abc123/start"), "ContainerStart");
        assert_eq!(action_for("DELETE", "/containers/abc123"), "ContainerDelete");
        assert_eq!(action_for("DELETE", "/containers/abc/extra"), UNKNOWN_ACTION);
    }

    #[test]
    fn image_names_may_contain_slashes() {
        assert_eq!(action_for("GET", "/images/ubuntu/json"), "ImageInspect");
        assert_eq!(
            action_for("GET", "/images/registry.local/team/app:1/json"),
            "ImageInspect"
        );
        assert_eq!(action_for("POST", "/images/team/app/tag"), "ImageTag");
        assert_eq!(action_for("DELETE", "/images/team/app:1"), "ImageDelete");
        assert_eq!(action_for("GET", "/images/json"), "ImageList");
    }

    #[test]
    fn trailing_slash_is_ignored() {
        assert_eq!(action_for("GET", "/volumes/"), "VolumeList");
        assert_eq!(action_for("GET", "/"), UNKNOWN_ACTION);
    }

    #[test]
    fn unknown_routes() {
        assert_eq!(action_for("PATCH", "/containers/json"), UNKNOWN_ACTION);
        assert_eq!(action_for("GET", "/no/such/thing"), UNKNOWN_ACTION);
    }
}
