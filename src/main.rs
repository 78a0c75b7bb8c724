use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use intakemcp::{api, app::Services, config, logging, mcp::IntakeMcpServer};
use tokio::net::TcpListener;

/// Document intake MCP server.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address to bind (overrides SERVER_HOST).
    #[arg(long)]
    host: Option<String>,
    /// Port to bind (overrides SERVER_PORT).
    #[arg(long)]
    port: Option<u16>,
    /// Root directory for job folders (overrides JOBS_ROOT).
    #[arg(long)]
    jobs_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = config::load_config().context("Failed to load config from environment")?;
    logging::init_tracing();

    if let Some(host) = args.host {
        config.server_host = host;
    }
    if let Some(port) = args.port {
        config.server_port = Some(port);
    }
    if let Some(jobs_root) = args.jobs_root {
        config.jobs_root = jobs_root;
    }
    config::install_config(config);
    let config = config::get_config();

    let services = Services::from_config(config);
    let app = api::create_router(Arc::new(IntakeMcpServer::new(services)));

    let (listener, port) = bind_listener(config).await?;
    tracing::info!(
        jobs_root = %config.jobs_root.display(),
        "Listening on http://{}:{}/mcp",
        config.server_host,
        port
    );
    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}

async fn bind_listener(config: &config::Config) -> anyhow::Result<(TcpListener, u16)> {
    let host = config.server_host.as_str();
    if let Some(port) = config.server_port {
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to bind {host}:{port}"))?;
        return Ok((listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 3333..=3399;
    for port in PORT_RANGE {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err).with_context(|| format!("Failed to bind {host}:{port}")),
        }
    }

    anyhow::bail!("No available port found in range 3333-3399")
}
