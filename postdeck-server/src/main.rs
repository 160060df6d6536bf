use std::net::SocketAddr;

use clap::Parser;
use libpostdeck::logging::LoggingConfig;
use libpostdeck::{Config, PostdeckService};
use postdeck_server::state::AppState;

/// Serve the postdeck review-and-publish API over HTTP
#[derive(Parser, Debug)]
#[command(name = "postdeck-server")]
#[command(version)]
struct Cli {
    /// Address to bind (overrides [server] host)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides [server] port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    LoggingConfig::from_env("info", cli.verbose).init();

    let mut config = Config::load()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let service = PostdeckService::from_config(config).await?;
    let app = postdeck_server::app(AppState::new(service));

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
