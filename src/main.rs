use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use alexa_fhem_gateway::{
    ApiServer, Catalog, Config, DirectiveEnvelope, Dispatcher, FhemClient, HubTransport,
};

/// alexa-fhem - Alexa Smart Home gateway for FHEM
#[derive(Parser)]
#[command(name = "alexa-fhem", version, about)]
struct Cli {
    /// Port to listen on (overrides ALEXA_FHEM_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve directives over HTTP (default)
    Serve,
    /// Handle one directive and print the response
    Invoke {
        /// Directive JSON file, `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
    },
    /// Run discovery and print the endpoints
    Discover,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,alexa_fhem_gateway=info",
        1 => "info,alexa_fhem_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    let hub: Arc<dyn HubTransport> = Arc::new(FhemClient::new(&config.hub)?);
    let catalog = Arc::new(Catalog::standard());

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let dispatcher = Arc::new(Dispatcher::from_config(hub, catalog, &config.hub));
            let port = cli.port.unwrap_or(config.api_server.port);
            serve(dispatcher, config.api_server.api_key, port).await
        }
        Command::Invoke { input } => {
            let dispatcher = Arc::new(Dispatcher::from_config(hub, catalog, &config.hub));
            invoke(&dispatcher, &input).await
        }
        Command::Discover => {
            let endpoints = alexa_fhem_gateway::discover(hub.as_ref(), &catalog)
                .await
                .map_err(|e| anyhow::anyhow!("discovery failed: {e}"))?;
            println!("{}", serde_json::to_string_pretty(&endpoints)?);
            Ok(())
        }
    }
}

async fn serve(
    dispatcher: Arc<Dispatcher>,
    api_key: Option<String>,
    port: u16,
) -> anyhow::Result<()> {
    tracing::info!(port, "starting alexa-fhem gateway");
    let server = ApiServer::new(dispatcher, api_key, port).spawn();

    tokio::select! {
        result = server => {
            result.context("API server task panicked")??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    Ok(())
}

async fn invoke(dispatcher: &Arc<Dispatcher>, input: &Path) -> anyhow::Result<()> {
    let raw = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read directive from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))?
    };

    let envelope: DirectiveEnvelope =
        serde_json::from_str(&raw).context("input is not a directive envelope")?;
    let response = dispatcher.respond(envelope).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
