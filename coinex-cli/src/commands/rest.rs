//! REST commands.

use anyhow::{Context, Result};
use coinex_gateway::rest::RestClient;

use super::load_config;
use super::session::format_millis;

fn client(config_path: &str) -> Result<RestClient> {
    let config = load_config(config_path)?;
    RestClient::new(&config.rest, config.credentials().ok()).context("Failed to create REST client")
}

/// Prints the server time reported by `GET time`.
///
/// # Errors
///
/// Returns error if the request fails.
pub async fn time(config_path: &str) -> Result<()> {
    let time = client(config_path)?
        .system_time()
        .await
        .context("GET time failed")?;

    let local = chrono::Utc::now().timestamp_millis();
    println!("server time: {}", format_millis(time.timestamp));
    println!("local clock ahead by {} ms", local - time.timestamp);
    Ok(())
}

/// Lists maintenance windows and marks the ones in effect now.
///
/// # Errors
///
/// Returns error if the request fails.
pub async fn maintenance(config_path: &str) -> Result<()> {
    let windows = client(config_path)?
        .maintenance_info()
        .await
        .context("GET maintain/info failed")?;

    if windows.is_empty() {
        println!("No maintenance announced");
        return Ok(());
    }

    let now = chrono::Utc::now().timestamp_millis();
    for window in &windows {
        let status = if window.is_active_at(now) {
            "ACTIVE"
        } else if window.is_protected_at(now) {
            "PROTECTED"
        } else {
            "scheduled"
        };
        println!(
            "{status:<10} {:?} {} -> {}  {}",
            window.scope,
            format_millis(window.started_at),
            format_millis(window.ended_at),
            window.announce_url
        );
    }
    Ok(())
}
