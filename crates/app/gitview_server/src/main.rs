//! GitView web server binary.
//!
//! Reads configuration from the environment (and `.env`), then serves the
//! GitLab front end until interrupted. Sessions live in memory only.

use clap::Parser;
use tracing::info;

/// CLI arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "gitview_server", about = "GitView web server", version)]
struct Args {
    /// Address to bind, overriding `BIND_ADDR`.
    #[arg(long, env = "BIND_ADDR")]
    bind_addr: Option<String>,

    /// Port to listen on (0 = ephemeral). Overrides the port of the bind address.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gitview_api=debug,gitview_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = gitview_api::config::ApiConfig::from_env()?;
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(port) = args.port {
        let host = config
            .bind_addr
            .rsplit_once(':')
            .map_or(config.bind_addr.as_str(), |(host, _)| host);
        config.bind_addr = format!("{host}:{port}");
    }

    info!(
        gitlab_host = %config.gitlab.host,
        base_url = %config.base_url,
        refresh_threshold_secs = config.refresh_threshold_secs,
        "starting gitview_server"
    );

    let bind_addr = config.bind_addr.clone();
    let state = gitview_api::AppState::new(config)?;
    let app = gitview_api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down; in-memory sessions are discarded");
        })
        .await?;

    Ok(())
}
