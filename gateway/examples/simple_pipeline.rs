//! Minimal pipeline demo: a channel-fed source, a logging observer, and a
//! few simulated sensor frames.
//!
//! Run with:
//! ```sh
//! RUST_LOG=info cargo run --example simple_pipeline
//! ```

use std::sync::Arc;

use bytes::Bytes;

use parkhub_gateway::{
    ChannelSource, Gateway, GatewayConfig, JsonDecoder, LogObserver, MemoryEventLog,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let log = Arc::new(MemoryEventLog::new());
    let pipeline = Gateway::new()
        .config(GatewayConfig::from_env()?)
        .event_log_arc(Arc::clone(&log) as _)
        .observer(LogObserver::new())
        .build()?;

    let (sender, source) = ChannelSource::new(64);
    let runner = pipeline.spawn_source(source, JsonDecoder::new());

    // A morning at the garage: two arrivals, one departure, one firmware
    // glitch that the pipeline drops at the boundary.
    let frames = [
        r#"{"identity":"spot4L2","occupied":true,"leftDistance":38.5,"rightDistance":41.0}"#,
        r#"{"identity":"spot2L3","occupied":true,"metalDetected":true}"#,
        r#"{"deviceId":"undefined","isCarParked":true}"#,
        r#"{"identity":"spot4L2","occupied":false}"#,
    ];
    for frame in frames {
        sender.send(Bytes::from(frame)).await?;
    }
    drop(sender);
    runner.await?;

    let snap = pipeline.snapshot();
    println!("\n== blocks ==");
    for block in &snap.blocks {
        println!(
            "  {}: {}/{} occupied, available={}",
            block.block, block.occupied_spots, block.total_spots, block.available
        );
    }
    println!("== spots ==");
    for spot in &snap.spots {
        println!("  {} [{}] occupied={}", spot.spot_id, spot.block, spot.occupied);
    }
    println!("== recent transitions (newest first) ==");
    for ev in pipeline.recent_events(10) {
        println!("  {} {} at {}", ev.spot_id, ev.direction, ev.timestamp);
    }

    pipeline.shutdown().await;
    println!("== durable log: {} transitions ==", log.len());
    Ok(())
}
