//! Tag presence monitoring example

use std::time::Duration;
use taglink::RfidReader;
use tokio::time::sleep;

#[tokio::main]
async fn main() -> taglink::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let ip = std::env::var("READER_IP").unwrap_or_else(|_| "192.168.1.98".to_string());

    let mut reader = RfidReader::new(&ip, 80);

    println!("Watching {} for tags...", reader.remote_addr());

    reader.register_event_callback(|event| {
        println!("[{}] {} {}", event.datetime(), event.kind, event.tag_id);
    });

    // Poll at roughly the reader's own field refresh rate.
    let refresh = reader.refresh_rate().await?.max(20);
    loop {
        reader.pump_events().await?;
        sleep(Duration::from_millis(u64::from(refresh))).await;
    }
}
