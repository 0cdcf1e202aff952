//! Access-control engine for container API requests: rules, ordered rule sets,
//! glob and mount matching, symlink-safe path resolution and the file-backed
//! rule store.

pub mod acl;
mod capability;
mod decision;
mod error;
pub mod path;
mod size;
mod store;
pub mod wildmat;

pub use acl::{
    EvalResult, MemoryKind, MemoryVerdict, MountPattern, MountSpec, Rule, RuleSet, Verdict,
    BAD_PATH, DEFAULT_POLICY, VOLUME_MOUNT, WILDCARD,
};
pub use capability::normalize_capability;
pub use decision::{authorize_action, authorize_container, ContainerRequest, MountRequest, Outcome};
pub use error::{AccessError, Result};
pub use size::parse_byte_size;
pub use store::{Actor, RuleRecord, RuleStore, SizeValue};
pub use wildmat::{has_glob_meta, match_glob, GlobMode};
