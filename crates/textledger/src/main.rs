//! `textledger` - unified SMS/MMS query tool
//!
//! Runs one message filter against a SQLite message store and prints
//! the matching messages as JSON on stdout.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use textledger_core::{MessageReader, RawMessageFilter};
use textledger_sqlite::SqliteMessageStore;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "textledger")]
#[command(about = "Query a unified SMS/MMS message ledger", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the SQLite message database (created if missing).
    #[arg(long, value_name = "FILE")]
    db: String,

    /// Whole filter as one JSON object with wire field names (minDate,
    /// indexFrom, ...); replaces the per-field flags.
    #[arg(long, value_name = "JSON", conflicts_with_all = [
        "id", "sender", "body", "min_date", "max_date", "index_from", "limit"
    ])]
    filter: Option<String>,

    /// Restrict to this message id (repeatable).
    #[arg(long = "id", value_name = "ID")]
    id: Vec<String>,

    /// Exact sender address to match.
    #[arg(long, value_name = "ADDR")]
    sender: Option<String>,

    /// Substring the message body must contain.
    #[arg(long, value_name = "TEXT")]
    body: Option<String>,

    /// Oldest date to include, epoch milliseconds or RFC 3339.
    #[arg(long, value_name = "DATE")]
    min_date: Option<String>,

    /// Newest date to include, epoch milliseconds or RFC 3339.
    #[arg(long, value_name = "DATE")]
    max_date: Option<String>,

    /// Number of merged messages to skip.
    #[arg(long, value_name = "N")]
    index_from: Option<i64>,

    /// Maximum number of messages to print.
    #[arg(long, value_name = "N")]
    limit: Option<i64>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Log to stderr; stdout carries the JSON result
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "textledger=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let store = SqliteMessageStore::open(&cli.db)
        .await
        .with_context(|| format!("open message store at {}", cli.db))?;
    let reader = MessageReader::new(store);

    let messages = match cli.filter.as_deref() {
        Some(raw) => {
            let value: serde_json::Value =
                serde_json::from_str(raw).context("--filter is not valid JSON")?;
            reader.get_messages_json(value).await?
        }
        None => reader.get_messages(build_raw_filter(&cli)?).await?,
    };

    info!("Matched {} messages", messages.len());

    let output = if cli.pretty {
        serde_json::to_string_pretty(&messages)?
    } else {
        serde_json::to_string(&messages)?
    };
    println!("{output}");

    Ok(())
}

/// Build the raw filter from the per-field flags.
fn build_raw_filter(cli: &Cli) -> Result<RawMessageFilter> {
    Ok(RawMessageFilter {
        ids: (!cli.id.is_empty()).then(|| cli.id.clone()),
        body: cli.body.clone(),
        sender: cli.sender.clone(),
        min_date: cli.min_date.as_deref().map(parse_date_arg).transpose()?,
        max_date: cli.max_date.as_deref().map(parse_date_arg).transpose()?,
        index_from: cli.index_from,
        limit: cli.limit,
    })
}

/// Parse a date flag as epoch milliseconds or an RFC 3339 timestamp.
fn parse_date_arg(value: &str) -> Result<i64> {
    if let Ok(millis) = value.parse::<i64>() {
        return Ok(millis);
    }
    let parsed = chrono::DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("date '{value}' is neither epoch milliseconds nor RFC 3339"))?;
    Ok(parsed.timestamp_millis())
}
