//! End-to-end walkthrough against a live Vanish server.
//!
//! ```text
//! VANISH_BASE_URL=https://api.vanish.example VANISH_API_KEY=sk_live_123 \
//!     RUST_LOG=vanish_client=debug cargo run --example demo
//! ```
//!
//! Send an email to the printed address while the demo waits. Ctrl-C stops
//! the wait early.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use vanish_client::{Client, GenerateEmailOptions, PollOptions};

#[tokio::main]
async fn main() -> Result<(), vanish_client::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let base_url =
        std::env::var("VANISH_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let mut builder = Client::builder(base_url).timeout(Duration::from_secs(10));
    if let Ok(key) = std::env::var("VANISH_API_KEY") {
        builder = builder.api_key(key);
    }
    let client = builder.build()?;

    let domains = client.get_domains().await?;
    println!("Domains: {}", domains.join(", "));

    let mut opts = GenerateEmailOptions::new().prefix("demo");
    if let Some(domain) = domains.first() {
        opts = opts.domain(domain.clone());
    }
    let address = client.generate_email(Some(&opts)).await?;
    println!("Created: {address}");

    let baseline = client.list_emails(&address, None).await?.total;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    println!("Waiting up to two minutes for mail...");
    let poll = PollOptions::new(Duration::from_secs(120), Duration::from_secs(3))
        .initial_count(baseline);
    match client.poll_for_email(&address, &poll, &cancel).await {
        Ok(Some(summary)) => {
            let email = client.get_email(&summary.id).await?;
            println!("From: {}\nSubject: {}\n\n{}", email.from, email.subject, email.text);

            for meta in email.attachments() {
                let attachment = client.get_attachment(&email.id, &meta.id).await?;
                println!(
                    "Attachment {} ({} bytes, {})",
                    meta.name,
                    attachment.bytes.len(),
                    attachment.content_type().unwrap_or("unknown type")
                );
            }
        }
        Ok(None) => println!("No email arrived."),
        Err(err) if err.is_cancelled() => println!("Stopped waiting."),
        Err(err) => return Err(err),
    }

    let deleted = client.delete_mailbox(&address).await?;
    println!("Deleted {deleted} email(s) and the mailbox {address}");
    Ok(())
}
