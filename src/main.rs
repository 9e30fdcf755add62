use clap::Parser; // for cli
use eyre::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use task_gateway::app::build_app;
use task_gateway::config::Args;
use task_gateway::executor::LogExecutor;
use task_gateway::scheduler::Scheduler;
use task_gateway::state::AppState;
use task_gateway::task_log::FileTaskLog;

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    // parse cli arguments
    let args = Args::parse();
    setup_logging(&args.log_level);

    let task_log = Arc::new(FileTaskLog::new(&args.task_log));
    let scheduler = Arc::new(Scheduler::new(
        args.scheduler_config(),
        Arc::new(LogExecutor),
        task_log,
    ));

    let state = Arc::new(AppState {
        scheduler: Arc::clone(&scheduler),
    });
    let app = build_app(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", addr))?;

    info!("Server is running on port {}", args.port);
    info!("Task log: {}", args.task_log.display());
    info!(
        "Rate limit: 1 task per {} ms, {} tasks per {} seconds",
        args.min_interval_ms, args.max_per_window, args.window_secs
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    scheduler.shutdown();
    Ok(())
}
