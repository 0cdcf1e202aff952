mod client;
mod ops;

use clap::{Parser, Subcommand};
use ops::{
    cap, eval, glob, list_rules, send_request, size, AuthzRequest, GlobArg, OutputFormat, Query,
    Subject,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Inspect container authorization rules offline, or query a running plugin.
#[derive(Parser)]
#[command(
    name = "portcullis-cli",
    author,
    version,
    about = "CLI for Portcullis authorization rules"
)]
struct Cli {
    /// Rule file
    #[arg(long, env = "PC_RULES_FILE", default_value = "/etc/portcullis/rules.json")]
    rules: PathBuf,

    /// Plugin base url
    #[arg(long, env = "PC_API_BASE", default_value = "http://127.0.0.1:9180")]
    api_base: String,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one query against the rule file
    #[command(subcommand)]
    Eval(EvalCommands),
    /// List the rules that apply to a user, in evaluation order
    Rules {
        #[command(flatten)]
        subject: Subject,
    },
    /// Match a name against a wildcard pattern (exit status 1 on no match)
    Glob {
        pattern: String,
        name: String,
        #[arg(long, value_enum, default_value = "lexical")]
        mode: GlobArg,
    },
    /// Parse a size such as `512m` or `2G`
    Size { text: String },
    /// Normalize a capability name
    Cap { text: String },
    /// Post an authorization request to a running plugin
    Request {
        #[arg(long, default_value = "GET")]
        method: String,
        #[arg(long)]
        uri: String,
        /// File holding the request's JSON body
        #[arg(long)]
        body: Option<PathBuf>,
        /// Empty means anonymous
        #[arg(long, default_value = "")]
        user: String,
        /// Seconds to wait for the plugin
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },
}

#[derive(Subcommand)]
enum EvalCommands {
    /// Is an API action allowed
    Action {
        action: String,
        #[command(flatten)]
        subject: Subject,
    },
    /// May privileged containers be created
    Privileged {
        #[command(flatten)]
        subject: Subject,
    },
    /// May a capability be added
    Capability {
        cap: String,
        #[command(flatten)]
        subject: Subject,
    },
    /// May a host path be bind-mounted
    Mount {
        path: String,
        #[arg(long)]
        read_only: bool,
        #[command(flatten)]
        subject: Subject,
    },
    /// Is a memory limit within the ceiling
    Memory {
        size: String,
        /// Check the kernel memory ceiling instead
        #[arg(long)]
        kernel: bool,
        #[command(flatten)]
        subject: Subject,
    },
}

impl EvalCommands {
    fn into_query(self) -> (Query, Subject) {
        match self {
            EvalCommands::Action { action, subject } => (Query::Action(action), subject),
            EvalCommands::Privileged { subject } => (Query::Privileged, subject),
            EvalCommands::Capability { cap, subject } => (Query::Capability(cap), subject),
            EvalCommands::Mount {
                path,
                read_only,
                subject,
            } => (Query::Mount { path, read_only }, subject),
            EvalCommands::Memory {
                size,
                kernel,
                subject,
            } => (Query::Memory { size, kernel }, subject),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Eval(cmd) => {
            let (query, subject) = cmd.into_query();
            eval(&cli.rules, &subject, &query, cli.output)?
        }
        Commands::Rules { subject } => list_rules(&cli.rules, &subject, cli.output)?,
        Commands::Glob {
            pattern,
            name,
            mode,
        } => {
            if !glob(&pattern, &name, mode, cli.output)? {
                std::process::exit(1);
            }
        }
        Commands::Size { text } => size(&text, cli.output)?,
        Commands::Cap { text } => cap(&text, cli.output)?,
        Commands::Request {
            method,
            uri,
            body,
            user,
            timeout,
        } => {
            let client = client::build_client(Duration::from_secs(timeout))?;
            let request = AuthzRequest::new(&user, &method, &uri, body.as_deref())?;
            send_request(&client, &cli.api_base, &request, cli.output).await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
