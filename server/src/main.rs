use anyhow::Result;
use axum::Router;
use bisearch_server::build_app;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "serve")]
#[command(about = "Serve boolean search over HTTP", long_about = None)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    if let Err(err) = run(Args::parse()).await {
        tracing::error!(%err, "fatal");
        std::process::exit(2);
    }
}

async fn run(args: Args) -> Result<()> {
    let app: Router = build_app(&args.index)?;
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
