mod app;

use app::{app_router, AppState};
use dotenvy::dotenv;
use portcullis_core::RuleStore;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_BIND: &str = "127.0.0.1:9180";
const DEFAULT_RULES_FILE: &str = "/etc/portcullis/rules.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
struct ApiConfig {
    bind: SocketAddr,
    rules_file: PathBuf,
    anonymous_user: String,
    /// Matched against rule host patterns.
    hostname: Option<String>,
    decision_timeout: Duration,
    log_format: LogFormat,
}

impl ApiConfig {
    fn from_env() -> anyhow::Result<Self> {
        let bind = env::var("PC_BIND").unwrap_or_else(|_| DEFAULT_BIND.into());
        let bind = bind
            .parse::<SocketAddr>()
            .map_err(|e| anyhow::anyhow!("invalid PC_BIND {bind:?}: {e}"))?;

        let rules_file = env::var("PC_RULES_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_RULES_FILE));

        let anonymous_user = env::var("PC_ANONYMOUS_USER")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "ANONYMOUS".into());

        let hostname = env::var("PC_HOSTNAME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(sysinfo::System::host_name);

        let decision_timeout = match env::var("PC_DECISION_TIMEOUT_MS") {
            Ok(ms) => ms
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| anyhow::anyhow!("invalid PC_DECISION_TIMEOUT_MS {ms:?}: {e}"))?,
            Err(_) => Duration::from_millis(5000),
        };

        let log_format = match env::var("PC_LOG_FORMAT") {
            Ok(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            bind,
            rules_file,
            anonymous_user,
            hostname,
            decision_timeout,
            log_format,
        })
    }

    fn rule_store(&self) -> RuleStore {
        let store = RuleStore::new(&self.rules_file);
        match &self.hostname {
            Some(host) => store.with_hostname(host.clone()),
            None => store,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv();
    let config = ApiConfig::from_env()?;
    init_tracing(config.log_format);

    info!(
        rules = %config.rules_file.display(),
        hostname = config.hostname.as_deref().unwrap_or("<unknown>"),
        "starting authorization plugin on {}",
        config.bind
    );
    if config.hostname.is_none() {
        warn!("host name unknown; host-restricted rules will never apply");
    }
    if !config.rules_file.exists() {
        warn!(rules = %config.rules_file.display(), "rule file missing; every request will be refused");
    }

    let state = AppState::new(
        config.rule_store(),
        &config.anonymous_user,
        config.decision_timeout,
    );

    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shut down");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "can't listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "can't listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
