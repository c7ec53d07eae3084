use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prometheus::Registry;
use token_transport::helpers::context::CallContext;
use token_transport::server::server::{self, AppState};
use token_transport::utils::config_loader;
use token_transport::utils::logging::{self, LogLevel};
use token_transport::wrapper::TransportWrapper;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "token-transport.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Prints a valid access token, requesting a new one if needed
    Token {
        /// print the refresh token instead of the access token
        #[arg(long)]
        refresh: bool,
    },
    /// Serves tokens and metrics over HTTP until interrupted
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(Some(&service_config), args.log_level)?;

    // -------------------------------
    // 2. Build the token lifecycle manager
    // -------------------------------

    let settings = &service_config.settings;
    let registry = Registry::new();
    let mut builder = service_config
        .auth
        .to_builder()
        .retry(settings.retry_settings());
    if let Some(metrics) = settings.metrics.as_ref().filter(|m| m.is_enabled) {
        if let Some(subsystem) = &metrics.subsystem {
            builder = builder
                .metrics_subsystem(subsystem.clone())
                .metrics_registry(registry.clone());
        }
    }
    let wrapper: TransportWrapper = builder.build().context("can't create token manager")?;
    info!("using token URL '{}'", wrapper.token_url());

    // -------------------------------
    // 3. Run the command
    // -------------------------------

    match args.command {
        Command::Token { refresh } => {
            let tokens = wrapper
                .get_token(&CallContext::background(), Some(settings.freshness()))
                .await
                .context("can't get tokens")?;
            if refresh {
                println!("{}", tokens.refresh);
            } else {
                println!("{}", tokens.access);
            }
        }
        Command::Serve => {
            let server_config = settings.server.clone().unwrap_or_default();
            let state = AppState::new(registry, wrapper, settings.freshness());
            server::start(state, &server_config, settings.metrics.as_ref()).await?;
        }
    }

    Ok(())
}
