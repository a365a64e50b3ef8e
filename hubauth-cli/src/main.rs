use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};
use hubauth_cli::{default_config_path, run_repl, CliError, Config, PromptAccountChooser};
use hubauth_client::HubClient;
use hubauth_core::{HubTokenAcquirer, SessionStore};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a log filter directive, e.g. `hubauth_core=debug`
const LOG_ENV: &str = "HUBAUTH_LOG";

#[derive(Debug, Parser)]
#[command(name = "hubauth", version, about = "Sign in to a registry hub and manage credential sessions")]
struct Args {
    /// Configuration file [default: <config dir>/hubauth/config.json]
    #[arg(long, env = "HUBAUTH_CONFIG")]
    config: Option<PathBuf>,

    /// Hub API base URL (overrides the config file)
    #[arg(long, env = hubauth_client::API_BASE_ENV)]
    api_base: Option<String>,

    /// Always sign in as this user instead of choosing
    #[arg(long, env = hubauth_core::account::USERNAME_ENV)]
    username: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = hubauth_client::TIMEOUT_ENV)]
    timeout_secs: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config_path = args.config.unwrap_or_else(default_config_path);
    let config = Config::load(&config_path).await?;

    let mut builder = HubClient::builder();
    if let Some(api_base) = args.api_base.or(config.api_base.clone()) {
        builder = builder.api_base(api_base);
    }
    if let Some(secs) = args.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build()?;
    let api_base = client.api_base().to_string();

    let mut chooser = PromptAccountChooser::new(config.accounts);
    if let Some(username) = args.username {
        chooser = chooser.with_username(username);
    }

    let store = Arc::new(SessionStore::new(chooser, HubTokenAcquirer::new(client)));
    run_repl(store, &api_base).await
}
