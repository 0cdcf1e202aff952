//! Linux capability names.

const CAP_PREFIX: &str = "CAP_";

/// Canonical form of a capability token: upper case, always `CAP_`-prefixed.
///
/// `sys_admin`, `SYS_ADMIN` and `cap_sys_admin` all become `CAP_SYS_ADMIN`.
pub fn normalize_capability(cap: &str) -> String {
    let upper = cap.to_uppercase();
    if upper.starts_with(CAP_PREFIX) {
        upper
    } else {
        format!("{CAP_PREFIX}{upper}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_prefix_and_upcases() {
        assert_eq!(normalize_capability("sys_admin"), "CAP_SYS_ADMIN");
        assert_eq!(normalize_capability("Net_Admin"), "CAP_NET_ADMIN");
        assert_eq!(normalize_capability("cap_chown"), "CAP_CHOWN");
    }

    #[test]
    fn idempotent() {
        for raw in ["sys_admin", "CAP_SYS_ADMIN", "cap_net_raw", "ALL", ""] {
            let once = normalize_capability(raw);
            assert_eq!(normalize_capability(&once), once);
        }
    }
}
