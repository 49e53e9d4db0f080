use std::{
    io::{self, BufRead},
    path::PathBuf,
    thread,
};

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::{bounded, unbounded, Sender};
use tracing_subscriber::EnvFilter;

mod backend_bridge;
mod config;
mod controller;
mod ui;

use backend_bridge::runtime::{self, BackendOptions};
use controller::events::UiEvent;
use ui::app::TrackerApp;

#[derive(Parser, Debug)]
#[command(about = "Track sleep sessions from the terminal")]
struct Args {
    /// Config file; defaults to ./tracker.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    database_url: Option<String>,
    #[arg(long)]
    log_filter: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut settings = config::load_settings(args.config.as_deref())?;
    if let Some(database_url) = args.database_url {
        settings.database_url = config::normalize_database_url(&database_url);
    }
    if let Some(log_filter) = args.log_filter {
        settings.log_filter = log_filter;
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .with_context(|| format!("invalid log filter '{}'", settings.log_filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    tracing::info!(database_url = %settings.database_url, "starting sleep tracker");

    let (cmd_tx, cmd_rx) = bounded(settings.command_queue_capacity.max(1));
    let (ui_tx, ui_rx) = unbounded::<UiEvent>();
    let backend = runtime::launch(
        cmd_rx,
        ui_tx.clone(),
        BackendOptions {
            database_url: settings.database_url.clone(),
            controller: settings.controller_config(),
        },
    );
    spawn_stdin_reader(ui_tx);

    println!("Sleep tracker. Type 'help' for commands.");
    let mut app = TrackerApp::new(io::stdout(), cmd_tx);
    while let Ok(event) = ui_rx.recv() {
        app.handle(event).context("failed to write to stdout")?;
        if app.should_exit() {
            break;
        }
    }

    // Dropping the app closes the command queue, which stops the backend.
    drop(app);
    if backend.join().is_err() {
        tracing::error!("backend worker panicked");
    }
    Ok(())
}

fn spawn_stdin_reader(ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let event = match line {
                Ok(line) => UiEvent::Input(line),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to read stdin");
                    break;
                }
            };
            if ui_tx.send(event).is_err() {
                return;
            }
        }
        let _ = ui_tx.send(UiEvent::InputClosed);
    });
}
