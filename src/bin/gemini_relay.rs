//! gemini-relay — 浏览器聊天界面到 Gemini API 的 HTTP 中继
//!
//! Usage:
//!   gemini-relay [--host <addr>] [--port <port>] [--model <id>]
//!
//! The API key is read from `GEMINI_API_KEY` (or `GOOGLE_API_KEY`); a `.env` file in the
//! working directory is loaded first if present.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gemini_relay::config::RelayConfig;

#[derive(Debug, Parser)]
#[command(name = "gemini-relay", version, about = "HTTP relay for the Gemini API")]
struct Args {
    /// Address to bind
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Model identifier, e.g. gemini-2.5-flash
    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gemini_relay=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = RelayConfig::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(model) = args.model {
        config = config.with_model(model);
    }

    gemini_relay::server::serve(config).await?;
    Ok(())
}
