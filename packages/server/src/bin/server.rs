//! Tamariba real-time presence and room messaging server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tamariba-server -- --config tamariba.toml
//! cargo run --bin tamariba-server -- --host 0.0.0.0 --port 3000 --typing-timeout-ms 5000
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tamariba_server::{
    config::AppConfig,
    infrastructure::message_pusher::WebSocketMessagePusher,
    ui::{AppState, Server},
};
use tamariba_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[derive(Parser, Debug)]
#[command(name = "tamariba-server")]
#[command(about = "Real-time presence and room messaging server", long_about = None)]
struct Args {
    /// Host address to bind the server to [default: 127.0.0.1]
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port number to bind the server to [default: 8080]
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// TOML file with server settings, users and rooms
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Idle window after which a typing indicator expires [default: 3000]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    typing_timeout_ms: Option<u64>,

    /// Maximum message body length in characters [default: 1000]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    max_message_length: Option<u64>,
}

impl Args {
    /// Config file values overridden by command line flags.
    fn resolve(self) -> Result<AppConfig, Box<dyn std::error::Error + Send + Sync>> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load_from(path)?,
            None => AppConfig::default(),
        };

        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(timeout) = self.typing_timeout_ms {
            config.realtime.typing_timeout_ms = timeout;
        }
        if let Some(max_length) = self.max_message_length {
            config.realtime.max_message_length = usize::try_from(max_length)?;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    if let Err(e) = run(Args::parse()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = args.resolve()?;
    if config.users.is_empty() {
        tracing::warn!("No users configured: every handshake will be rejected");
    }

    // 1. Collaborators (in-memory authenticator and room store)
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let authenticator = Arc::new(config.build_authenticator()?);
    let store = Arc::new(config.build_room_store(clock.clone()).await?);

    // 2. MessagePusher (WebSocket implementation)
    let message_pusher = Arc::new(WebSocketMessagePusher::new());

    // 3. UseCases + registries
    let state = AppState::new(
        authenticator,
        store.clone(),
        store,
        message_pusher,
        clock,
        config.settings(),
    );

    // 4. Server
    Server::new(state)
        .run(config.server.host, config.server.port)
        .await
}
