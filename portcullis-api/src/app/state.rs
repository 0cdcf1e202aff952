use portcullis_core::RuleStore;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state for handlers.
#[derive(Clone)]
pub struct AppState {
    /// Consulted afresh for every decision.
    pub store: Arc<RuleStore>,
    /// Actor name used when the engine reports no user.
    pub anonymous_user: Arc<str>,
    pub decision_timeout: Duration,
}

impl AppState {
    pub fn new(store: RuleStore, anonymous_user: &str, decision_timeout: Duration) -> Self {
        Self {
            store: Arc::new(store),
            anonymous_user: Arc::from(anonymous_user),
            decision_timeout,
        }
    }
}
