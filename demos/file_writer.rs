//! Creates one empty file per job under `./temp/` until interrupted.
//!
//! ```text
//! RUST_LOG=lanepool=debug cargo run --example file_writer
//! ```
//!
//! Submits 100 jobs into an engine with 50 lanes and an intake of 50, then
//! runs until SIGINT / SIGTERM / SIGQUIT (Ctrl-C on Windows) and drains.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use lanepool::{Engine, EngineConfig, HandlerFn, JobError, LogWriter};

const OUT_DIR: &str = "./temp";

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lanepool=info")),
        )
        .init();

    tokio::fs::create_dir_all(OUT_DIR).await?;

    let mut cfg = EngineConfig::with_capacity(50);
    cfg.lanes = 50;
    cfg.timeout = Duration::from_secs(5);

    let handler = HandlerFn::arc(|_ctx: CancellationToken, payload: String| async move {
        let path = PathBuf::from(OUT_DIR).join(format!("file_{payload}"));
        tokio::fs::File::create(&path)
            .await
            .map(drop)
            .map_err(|e| JobError::fail(format!("{}: {e}", path.display())))
    });

    let engine = Engine::builder(cfg, handler)
        .with_subscriber(Arc::new(LogWriter::new()))
        .build();

    let producer = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            for n in 0..100 {
                if engine
                    .submit(CancellationToken::new(), n.to_string())
                    .await
                    .is_err()
                {
                    break;
                }
            }
        })
    };

    let runner = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.start().await })
    };

    wait_for_shutdown_signal().await?;
    tracing::info!("signal received, stopping");
    engine.stop();

    runner.await??;
    producer.await?;

    let stats = engine.stats();
    tracing::info!(
        submitted = stats.submitted,
        completed = stats.completed,
        failed = stats.failed,
        drained = stats.drained,
        "engine finished"
    );
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
