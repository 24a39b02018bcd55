//! Stream watching command.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use coinex_core::Segment;
use coinex_gateway::streams::{Channel, DepthLimit, DepthSubscription, StreamSubscription, Streams};
use coinex_gateway::ws::{AuthenticatedSession, SessionConfig, SessionEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::load_config;

/// Arguments for the watch command
#[derive(Parser)]
pub struct WatchArgs {
    /// Market segment (spot, futures)
    #[arg(short, long, default_value = "spot")]
    pub segment: Segment,

    /// Channel name (state, depth, deals, index, bbo, order, stop, user_deals, balance, position)
    #[arg(long)]
    pub channel: Channel,

    /// Market, or currency for the balance channel; repeat for several.
    /// Public channels with no market watch every market.
    #[arg(short, long = "market")]
    pub markets: Vec<String>,

    /// Depth levels per side (5, 10, 20, 50)
    #[arg(long, default_value = "20")]
    pub depth_limit: u32,

    /// Seconds to wait for the session to authenticate
    #[arg(long, default_value = "30")]
    pub ready_timeout: u64,
}

/// Prints every push of the chosen channel until Ctrl-C.
///
/// Subscriptions are sent again after each reconnect.
///
/// # Errors
///
/// Returns error if the session cannot be opened or the channel is not
/// available on the segment.
pub async fn run(config_path: &str, args: WatchArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let credentials = config.credentials().context("Credentials required")?;

    let session = AuthenticatedSession::new(
        SessionConfig::from_settings(&config.ws, args.segment, config.auto_reconnect),
        credentials,
    );
    session.connect()?;
    tokio::time::timeout(Duration::from_secs(args.ready_timeout), session.wait_ready())
        .await
        .with_context(|| format!("{} session not ready after {}s", args.segment, args.ready_timeout))??;

    let streams = Streams::new(session.clone());
    let mut events = session.subscribe();
    let mut subscription = subscribe(&streams, &args)?;
    info!(
        segment = %args.segment,
        channel = %args.channel,
        markets = ?args.markets,
        "Watching, press Ctrl-C to stop"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(SessionEvent::Open) => {
                    info!("Session re-authenticated, subscribing again");
                    streams.unsubscribe(subscription, &args.markets);
                    subscription = subscribe(&streams, &args)?;
                }
                Ok(SessionEvent::Close) => warn!("Session closed"),
                Ok(SessionEvent::Error(e)) => warn!(error = %e, "Session error"),
                Ok(SessionEvent::Message(_)) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event receiver lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    streams.unsubscribe(subscription, &args.markets);
    session.close();
    info!("Stopped");
    Ok(())
}

fn subscribe(streams: &Streams, args: &WatchArgs) -> Result<StreamSubscription> {
    let print = |data: &serde_json::Value| println!("{data}");

    let subscription = if args.channel == Channel::Depth {
        let limit = DepthLimit::try_from(args.depth_limit)?;
        let markets: Vec<DepthSubscription> = args
            .markets
            .iter()
            .map(|market| DepthSubscription::new(market.as_str()).limit(limit))
            .collect();
        streams.subscribe_depth(&markets, print)?
    } else {
        streams.subscribe(args.channel, &args.markets, print)?
    };
    Ok(subscription)
}
