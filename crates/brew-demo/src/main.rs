//! # Brew Demo
//!
//! Example client with a few fake subscribers and simple publishers.
//!
//! Every second the boolean publisher `switch` toggles, the range and string
//! publishers `counter` count up, and `time` sends the current Unix time.
//! `echo-switch` and `echo-time` repeat what the matching subscribers
//! receive, and `smoothed` sends a low-pass filtered wave. Route publishers to
//! subscribers in the broker's admin to watch the values come back.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! brew-demo
//!
//! # Point at another broker
//! BREW_ADDRESS=ws://sandbox.spacebrew.cc:9000 brew-demo
//! ```

mod config;
mod metrics;

use anyhow::Result;
use brew_client::{
    BooleanPublisher, BrewClient, EventHandlers, MessageType, Publish, RangePublisher,
    StringPublisher,
};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Wave period in ticks.
const WAVE_PERIOD: f64 = 20.0;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brew_demo=info,brew_client=info,brew_transport=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    if config.metrics.enabled {
        metrics::start_metrics_server(config.metrics.port)?;
    }

    info!(
        "Starting {} against {}",
        config.client.name, config.client.address
    );

    let handlers = EventHandlers::new()
        .on_open(|| info!("Connection opened"))
        .on_close(|reason| info!("Connection closed ({})", reason))
        .on_error(|error| warn!("Connection error: {}", error));
    let client = BrewClient::new(config.client.clone(), handlers);

    register_subscribers(&client);

    let mut switch = BooleanPublisher::new(&client, "switch", false);
    let mut counter = RangePublisher::new(&client, "counter", 0);
    let mut counter_text = StringPublisher::new(&client, "counter", String::new());
    let mut time = StringPublisher::new(&client, "time", String::new());

    client.add_publisher("echo-switch", false);
    client.add_publisher("echo-time", "");

    let mut smoothed = RangePublisher::new(&client, "smoothed", 0);
    smoothed.set_input_range(0.0, 100.0);
    smoothed.enable_low_pass(0.2);

    client.connect()?;

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut tick: u64 = 0;
    let mut on = false;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }

        if !client.is_connected() {
            continue;
        }

        on = !on;
        let count = tick % 1024;
        let wave = 50.0 + 50.0 * (tick as f64 * std::f64::consts::TAU / WAVE_PERIOD).sin();
        tick += 1;

        let results = [
            switch.publish(on),
            counter.publish(count as f64),
            counter_text.publish(count.to_string()),
            time.publish(unix_time()),
            smoothed.publish(wave),
        ];
        for result in results {
            if let Err(e) = result {
                warn!("Publish failed: {}", e);
            }
        }
    }

    client.disconnect();
    // Give the close frame a moment to go out
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(())
}

fn register_subscribers(client: &BrewClient) {
    let echo = client.clone();
    client.subscribe_boolean("switch", move |on| {
        info!("The switch turns: {}", if on { "on" } else { "off" });
        if let Err(e) = echo.send("echo-switch", on) {
            warn!("Echo failed: {}", e);
        }
    });

    client.subscribe_range("counter", |value| info!("The counter counts to: {}", value));

    // Same name, different type
    client.subscribe_string("counter", |value| info!("The counter says: {}", value));

    let echo = client.clone();
    client.subscribe_string("time", move |value| {
        info!("The time is now: {}", value);
        if let Err(e) = echo.send("echo-time", value) {
            warn!("Echo failed: {}", e);
        }
    });

    // Routed to, but nothing handles it
    client.add_subscriber("unhandled", MessageType::Boolean);
}

fn unix_time() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_default()
}
