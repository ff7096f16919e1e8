mod calc;
mod config;
mod error;
mod exchange;
mod gradebook;
mod grid;
mod ipc;
mod pattern;
mod publish;
mod results;
mod roster;
mod setup;

use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(log_json: bool) {
    // stdout carries IPC responses, so logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn write_responses(mut rx: mpsc::UnboundedReceiver<serde_json::Value>) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(resp) = rx.recv().await {
        let line = serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string());
        stdout.write_all(line.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = config::ServiceConfig::from_env()?;
    init_tracing(config.log_json);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        exams = ?config.exams,
        publish_delay_ms = config.publish_delay.as_millis() as u64,
        "resultsd starting"
    );

    let state = Arc::new(ipc::AppState::new(config));
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_responses(rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                warn!(error = %e, "unparseable request line");
                let _ = tx.send(json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                }));
                continue;
            }
        };

        match ipc::dispatch(&state, req).await {
            ipc::Dispatch::Reply(resp) => {
                let _ = tx.send(resp);
            }
            ipc::Dispatch::Publish { id, pending } => {
                let state = Arc::clone(&state);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let resp = ipc::finish_publish(&state, &id, pending).await;
                    let _ = tx.send(resp);
                });
            }
        }
    }

    // Pending publishes hold sender clones; the writer drains until they finish.
    drop(tx);
    writer.await??;
    info!("stdin closed, resultsd exiting");
    Ok(())
}
