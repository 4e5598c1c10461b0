//! fio runner agent.
//!
//! Accepts fio job descriptions over HTTP, dry-runs them, runs at most one
//! at a time and exports the periodic reports as Prometheus metrics.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use fiorunner_agent::{app_state, config, router};
use fiorunner_core::error::{FioRunnerError, Result};

#[derive(Debug, Parser)]
#[command(name = "fiorunner", about = "fio job runner and exporter")]
struct Cli {
    /// YAML config file; built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listen port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run(Cli::parse()).await {
        tracing::error!(error = %e, "fiorunner exited");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = match &cli.config {
        Some(path) => config::load_from_file(path)?,
        None => config::AgentConfig::default(),
    };

    let mut listen: SocketAddr = cfg
        .agent
        .listen
        .parse()
        .map_err(|e| FioRunnerError::Config(format!("agent.listen: {e}")))?;
    if let Some(port) = cli.port {
        listen.set_port(port);
        cfg.agent.listen = listen.to_string();
    }

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state);

    tracing::info!(%listen, "fiorunner starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| FioRunnerError::Internal(format!("bind {listen}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| FioRunnerError::Internal(format!("server: {e}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
