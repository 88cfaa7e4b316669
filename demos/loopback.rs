//! Loopback publisher demo
//!
//! Publishes a simulated steering wheel into the in-memory broker and
//! prints what the broker received.
//!
//! Run with: cargo run --example loopback [SECONDS]
//!
//! Examples:
//!   cargo run --example loopback        # runs for 5 seconds
//!   cargo run --example loopback 30     # runs for 30 seconds
//!
//! Use RUST_LOG=f1_publisher=debug to watch the provisioning and source
//! lifecycle in detail.

use std::sync::Arc;
use std::time::Duration;

use f1_publisher::feed::{ButtonMap, CarButton, ControlAxis, DeviceProfile, BUTTON_COUNT};
use f1_publisher::stats::MetricKind;
use f1_publisher::testing::MockBroker;
use f1_publisher::{Publisher, PublisherConfig};

/// Simulated driving wheel
struct SimulatedWheel {
    map: ButtonMap,
    tick: u64,
}

impl SimulatedWheel {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            map: ButtonMap::new(DeviceProfile::Driving, BUTTON_COUNT)?,
            tick: 0,
        })
    }

    fn poll(&mut self, publisher: &Publisher) -> f1_publisher::Result<()> {
        self.tick += 1;
        let t = self.tick as f64;
        let controls = &publisher.collaborators().controls;

        controls.set_axis(ControlAxis::Steering, (t / 20.0).sin());
        controls.set_axis(ControlAxis::Acceleration, ((t / 40.0).sin() + 1.0) / 2.0);
        controls.set_axis(ControlAxis::Braking, 0.0);

        // Tap shift-up for a few polls out of every hundred
        let mut raw = [false; BUTTON_COUNT];
        raw[CarButton::ShiftUp.index()] = self.tick % 100 < 3;
        controls.apply_raw_buttons(&self.map, &raw)?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let seconds: u64 = std::env::args()
        .nth(1)
        .map(|s| s.parse::<u64>())
        .transpose()?
        .unwrap_or(5);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("f1_publisher=info".parse()?)
                .add_directive("loopback=info".parse()?),
        )
        .init();

    let config = PublisherConfig::default();
    let root = config.root_path()?;
    let publisher = Publisher::new(config);
    let broker = MockBroker::auto();

    let mut events = publisher.on_connected(Arc::new(broker.clone()))?;
    while let Ok(event) = events.try_recv() {
        println!("Provisioning: {:?}", event);
    }
    println!("Activated {} update sources", broker.activate_all());

    let mut wheel = SimulatedWheel::new()?;
    println!("Publishing for {}s (Ctrl+C to stop)...", seconds);

    let shutdown = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => println!("\nShutting down..."),
            _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        }
    };
    publisher
        .run_until(shutdown, |_| wheel.poll(&publisher))
        .await?;

    for relative in ["Steering", "Gear", "RefreshInterval"] {
        let path = root.join(relative)?;
        println!(
            "{}: {} pushes, latest {:?}",
            path,
            broker.pushes_for(&path).len(),
            broker.latest(&path)
        );
    }

    let metrics = &publisher.collaborators().metrics;
    for kind in MetricKind::ALL {
        println!("{}: {}", kind, metrics.value(kind));
    }

    publisher.on_disconnected();
    Ok(())
}
