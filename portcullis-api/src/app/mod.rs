mod actions;
mod authz;
mod error;
mod handlers;
mod router;
mod state;
mod wire;


pub use error::ApiError;
pub use router::app_router;
pub use state::AppState;
