mod eval;
mod output;
mod request;
mod tools;
pub mod ui;

pub use eval::{eval, list_rules, Query, Subject};
pub use output::OutputFormat;
pub use request::{send_request, AuthzRequest};
pub use tools::{cap, glob, size, GlobArg};
