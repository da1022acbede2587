//! # Vanish Client
//! Asynchronous wrapper around the Vanish temporary email HTTP API: generate disposable mailboxes, list and read emails, download attachments, delete mail, and wait for new arrivals using [`Client`] and [`ClientBuilder`].
//!
//! ## Audience and uses
//! For Rust developers who need throwaway addresses in integration tests, demos, or automation scripts: build a [`Client`], generate an address, wait for a message with [`Client::poll_for_email`], read it with [`Client::get_email`], then delete the mailbox.
//!
//! ## Runtime requirements
//! Async-only; run inside a Tokio (v1) runtime. HTTP calls use `reqwest`. Polling can be cancelled with a [`CancellationToken`](tokio_util::sync::CancellationToken); single calls are cancelled by dropping their future.
//!
//! ## Out of scope
//! No caching, retries, or rate limiting. Every method is one HTTP round-trip (polling is a sequence of them) and every failure is returned to the caller.
//!
//! ## Errors
//! [`Error`] separates three kinds, see [`Error::kind`]: local failures (building or sending the request, decoding the reply), API errors carrying the service's message and HTTP status ([`Error::Api`]), and cancellation ([`Error::Cancelled`]). The crate-wide [`Result`] alias wraps these errors.
//!
//! ## Logging
//! Requests and polling steps are reported as `tracing` debug events. No subscriber is installed by this crate.
//!
//! ## Example
//! ```no_run
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use vanish_client::{Client, PollOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), vanish_client::Error> {
//!     let client = Client::builder("https://api.vanish.example")
//!         .api_key("sk_live_123")
//!         .build()?;
//!     let address = client.generate_email(None).await?;
//!     println!("Created: {address}");
//!
//!     let opts = PollOptions::new(Duration::from_secs(120), Duration::from_secs(3));
//!     if let Some(summary) = client
//!         .poll_for_email(&address, &opts, &CancellationToken::new())
//!         .await?
//!     {
//!         let email = client.get_email(&summary.id).await?;
//!         println!("From: {}, Subject: {}", email.from, email.subject);
//!     }
//!
//!     client.delete_mailbox(&address).await?;
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod models;
mod poll;

pub use client::{Client, ClientBuilder, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use error::{Error, ErrorKind};
pub use models::{
    AttachmentContent, AttachmentMeta, EmailDetail, EmailSummary, GenerateEmailOptions,
    ListEmailsOptions, PaginatedEmailList,
};
pub use poll::{EmailSource, PollOptions, poll_for_email};

/// Result type alias for Vanish operations.
///
/// This is equivalent to `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
