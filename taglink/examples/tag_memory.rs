//! Tag memory read/write example

use taglink::{AccessOptions, RfidReader};

#[tokio::main]
async fn main() -> taglink::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let ip = std::env::var("READER_IP").unwrap_or_else(|_| "192.168.1.98".to_string());

    let mut reader = RfidReader::new(&ip, 80);
    let options = AccessOptions::new();

    let tags = reader.list_tags().await?;
    if tags.is_empty() {
        println!("No tags in the field.");
        return Ok(());
    }

    for tag_id in &tags {
        let (status, info) = reader.get_tag_info(tag_id).await?;
        if !status.is_success() {
            eprintln!("{status}");
            continue;
        }
        println!("{info}");

        // Write into the first user block, then read it back.
        println!("Writing...");
        let status = reader
            .write_text(tag_id, info.first_block, "taglink!", &options)
            .await?;
        if !status.is_success() {
            eprintln!("{status}");
            continue;
        }

        let (status, text) = reader.read_text(tag_id, info.first_block, 8, &options).await?;
        if status.is_success() {
            println!("Read back: {text}");
        } else {
            eprintln!("{status}");
        }
    }

    println!("Done!");

    Ok(())
}
