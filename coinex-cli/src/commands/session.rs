//! Session commands.
//!
//! Open both authenticated sessions and run round-trip checks over spot.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use coinex_gateway::CoinExWebSocket;
use tracing::info;

use super::load_config;

/// Arguments shared by the session commands
#[derive(Parser)]
pub struct SessionArgs {
    /// Seconds to wait for both sessions to authenticate
    #[arg(long, default_value = "30")]
    pub ready_timeout: u64,
}

/// Authenticates both sessions and reports their state.
///
/// # Errors
///
/// Returns error if the credentials are missing or the sessions do not
/// become ready in time.
pub async fn connect(config_path: &str, args: SessionArgs) -> Result<()> {
    let client = open(config_path, &args).await?;

    for session in [client.spot(), client.futures()] {
        println!(
            "{:<8} {:<14} offset {:>6} ms  attempts {}",
            session.segment().to_string(),
            session.state().to_string(),
            session.clock_offset_ms().unwrap_or_default(),
            session.connect_attempts()
        );
    }

    client.close();
    Ok(())
}

/// Sends `server.ping` and prints the reply payload.
///
/// # Errors
///
/// Returns error if the sessions cannot be opened or the ping fails.
pub async fn ping(config_path: &str, args: SessionArgs) -> Result<()> {
    let client = open(config_path, &args).await?;

    let reply = client.ping().await.context("server.ping failed")?;
    println!("{}", reply.data);

    client.close();
    Ok(())
}

/// Prints the server time and the local clock offset.
///
/// # Errors
///
/// Returns error if the sessions cannot be opened or the request fails.
pub async fn time(config_path: &str, args: SessionArgs) -> Result<()> {
    let client = open(config_path, &args).await?;

    let timestamp = client.server_time().await.context("server.time failed")?;
    println!("server time: {}", format_millis(timestamp));
    if let Some(offset) = client.spot().clock_offset_ms() {
        println!("local clock ahead by {offset} ms");
    }

    client.close();
    Ok(())
}

async fn open(config_path: &str, args: &SessionArgs) -> Result<CoinExWebSocket> {
    let mut config = load_config(config_path)?;
    config.auto_connect = false;

    let client = CoinExWebSocket::new(&config).context("Failed to create client")?;
    info!(timeout_secs = args.ready_timeout, "Connecting spot and futures sessions");

    let ready = tokio::time::timeout(Duration::from_secs(args.ready_timeout), client.connect()).await;
    match ready {
        Ok(result) => result.context("Session failed to authenticate")?,
        Err(_) => {
            client.close();
            anyhow::bail!("Sessions not ready after {}s", args.ready_timeout);
        }
    }

    Ok(client)
}

/// Formats Unix milliseconds as RFC 3339, falling back to the raw number.
pub fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map_or_else(|| millis.to_string(), |time| time.to_rfc3339())
}
