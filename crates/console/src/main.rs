//! Line-oriented shell around the console loop.
//!
//! Reads one JSON [`Command`] per line from stdin and writes every
//! [`UiEvent`](daps_console::UiEvent) as one JSON line to stdout.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use daps_console::{telemetry, Command, Console, EventBus, View};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    telemetry::init_tracing();

    // --- Event stream ---
    let bus = EventBus::default();
    let mut events = bus.subscribe();
    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        loop {
            match events.recv().await {
                Ok(event) => {
                    let Ok(mut line) = serde_json::to_vec(&event) else {
                        continue;
                    };
                    line.push(b'\n');
                    if stdout.write_all(&line).await.is_err() {
                        break;
                    }
                    let _ = stdout.flush().await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // --- Console loop ---
    let console = Console::from_env(bus).context("Failed to start the console")?;
    console
        .send(Command::Navigate {
            view: View::module("main"),
        })
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Command>(line) {
            Ok(Command::Shutdown) => break,
            Ok(command) => console.send(command).await?,
            Err(e) => tracing::warn!(error = %e, "Ignoring malformed command"),
        }
    }

    // The loop owns the last bus sender, so the printer drains and exits.
    console.shutdown().await;
    if let Err(e) = printer.await {
        tracing::error!(error = %e, "Event printer panicked");
    }
    tracing::info!("Console shut down");
    Ok(())
}
