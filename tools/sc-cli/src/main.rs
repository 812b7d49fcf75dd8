//! sc-cli: state-channel broker probe
//!
//! Connects to a broker, runs the challenge handshake with the configured
//! wallet key, issues one read-only RPC and prints the JSON result.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sc_01_rpc_protocol::EcdsaKeySigner;
use sc_02_session_client::{
    ClientConfig, ClientEvent, SessionApi, SessionClient, DEFAULT_BROKER_URL,
};
use serde_json::Value;
use shared_types::{Address, GetChannelsRequest};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sc-cli")]
#[command(about = "Authenticate against a state-channel broker and run a read-only RPC")]
struct Args {
    /// Broker WebSocket URL
    #[arg(short, long, env = "SC_BROKER_URL", default_value = DEFAULT_BROKER_URL)]
    broker: String,

    /// Hex private key of the wallet that authorizes the session
    #[arg(long, env = "SC_PRIVATE_KEY", hide_env_values = true)]
    private_key: String,

    /// Application name declared in auth_request
    #[arg(long, default_value = "sc-cli")]
    app_name: String,

    /// Seconds to wait for the handshake
    #[arg(long, default_value = "15")]
    auth_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Round-trip a ping
    Ping,
    /// Broker configuration (networks, contracts)
    Config,
    /// Ledger balances of an account (defaults to the wallet)
    Balances {
        #[arg(long)]
        account: Option<Address>,
    },
    /// Channels of a participant (defaults to the wallet)
    Channels {
        #[arg(long)]
        participant: Option<Address>,
    },
    /// Definition of an application session
    AppDefinition { app_session_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let identity =
        EcdsaKeySigner::from_hex(&args.private_key).context("invalid SC_PRIVATE_KEY")?;
    // A throwaway session key; the broker binds it to the wallet during auth.
    let session_key = EcdsaKeySigner::random();
    let wallet = identity.address();

    let mut config = ClientConfig::default();
    config.broker_url = args.broker.clone();
    config.auth.app_name = args.app_name.clone();
    config.auth.wallet = wallet;
    config.auth.participant = session_key.address();
    config.auth.timeout = Duration::from_secs(args.auth_timeout);
    // A probe should fail fast rather than retry.
    config.reconnect.enabled = false;

    let client = SessionClient::with_websocket(config, Arc::new(identity), Arc::new(session_key))
        .context("invalid client configuration")?;

    let mut events = client.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ClientEvent::AuthFailed { reason } => warn!(%reason, "authentication failed"),
                ClientEvent::Disconnected { reason, clean: false } => {
                    warn!(%reason, "connection dropped")
                }
                _ => {}
            }
        }
    });

    info!(broker = %args.broker, %wallet, "connecting");
    client
        .connect()
        .await
        .with_context(|| format!("failed to authenticate with {}", args.broker))?;

    let result = run(&client, &args.command, wallet).await;
    if let Err(e) = client.disconnect("probe finished").await {
        warn!(error = %e, "disconnect failed");
    }

    let value = result?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn run(client: &SessionClient, command: &Command, wallet: Address) -> Result<Value> {
    let value = match command {
        Command::Ping => client.ping().await.context("ping failed")?,
        Command::Config => client.get_config().await.context("get_config failed")?,
        Command::Balances { account } => client
            .get_ledger_balances(&account.unwrap_or(wallet))
            .await
            .context("get_ledger_balances failed")?,
        Command::Channels { participant } => {
            let filter = GetChannelsRequest {
                participant: Some(participant.unwrap_or(wallet)),
                ..Default::default()
            };
            client
                .get_channels(&filter)
                .await
                .context("get_channels failed")?
        }
        Command::AppDefinition { app_session_id } => client
            .get_app_definition(app_session_id)
            .await
            .context("get_app_definition failed")?,
    };
    Ok(value)
}
