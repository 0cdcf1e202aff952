mod health;
mod plugin;

pub use health::{handler_404, health};
pub use plugin::{activate, authz_request, authz_response};
