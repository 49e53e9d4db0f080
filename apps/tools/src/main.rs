use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use session_core::{HistoryFormatter, PlainHistoryFormatter, QualityRecorder, SessionStore};
use shared::domain::SessionId;
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/sleep.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every recorded session, newest first.
    List {
        #[arg(long)]
        json: bool,
    },
    Latest,
    /// Delete every recorded session.
    Clear,
    Rate {
        session_id: i64,
        quality: i32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::List { json } => {
            let sessions = storage.all().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
            } else if sessions.is_empty() {
                println!("no sessions recorded");
            } else {
                println!("{}", PlainHistoryFormatter::local().format_history(&sessions));
            }
        }
        Command::Latest => match storage.most_recent().await? {
            Some(session) => println!("{}", serde_json::to_string_pretty(&session)?),
            None => println!("no sessions recorded"),
        },
        Command::Clear => {
            let removed = storage.session_count().await?;
            storage.delete_all().await?;
            println!("deleted {removed} session(s)");
        }
        Command::Rate {
            session_id,
            quality,
        } => {
            let recorder = QualityRecorder::new(Arc::new(storage));
            let session = recorder
                .record(SessionId(session_id), quality)
                .await
                .with_context(|| format!("failed to rate session {session_id}"))?;
            println!(
                "rated session {} as {}",
                session.id,
                session.sleep_quality().map(|q| q.label()).unwrap_or("--")
            );
        }
    }

    Ok(())
}
