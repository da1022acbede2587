//! Data models for the Vanish API wire format.

use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::{Deserialize, Deserializer, Serialize};

/// Metadata about an email attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    /// Attachment identifier, used with [`Client::get_attachment`](crate::Client::get_attachment).
    pub id: String,
    /// File name as sent by the original mailer.
    pub name: String,
    /// Declared media type.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
}

/// Short summary of an email in a mailbox listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSummary {
    /// Email identifier.
    pub id: String,
    /// Sender address.
    pub from: String,
    /// Subject line.
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: String,
    /// First characters of the plain-text body.
    #[serde(default, deserialize_with = "null_as_default")]
    pub text_preview: String,
    /// Time the service received the email.
    pub received_at: DateTime<Utc>,
    /// Whether the email carries attachments.
    pub has_attachments: bool,
}

/// Full email contents including attachment metadata.
///
/// `id`, `from` and `receivedAt` are required. Recipients, subject and bodies
/// decode as empty when the service sends them as `null` or leaves them out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailDetail {
    pub id: String,
    pub from: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub to: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: String,
    /// HTML body.
    #[serde(default, deserialize_with = "null_as_default")]
    pub html: String,
    /// Plain-text body.
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    pub received_at: DateTime<Utc>,
    pub has_attachments: bool,
    /// Attachment metadata; `None` when the service omitted the list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<AttachmentMeta>>,
}

impl EmailDetail {
    /// Attachment metadata, empty when the service sent none.
    pub fn attachments(&self) -> &[AttachmentMeta] {
        self.attachments.as_deref().unwrap_or_default()
    }
}

/// One page of a mailbox listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedEmailList {
    /// Emails on this page, newest first.
    pub data: Vec<EmailSummary>,
    /// Cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
    /// Number of emails in the mailbox at query time.
    pub total: u64,
}

/// Options for [`Client::generate_email`](crate::Client::generate_email).
///
/// Unset or empty fields are left out of the request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerateEmailOptions {
    #[serde(skip_serializing_if = "is_absent")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "is_absent")]
    pub prefix: Option<String>,
}

impl GenerateEmailOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an address on a specific domain (see [`Client::get_domains`](crate::Client::get_domains)).
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Request a specific local-part prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_absent(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(str::is_empty)
}

/// Options for [`Client::list_emails`](crate::Client::list_emails).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListEmailsOptions {
    /// Page size. `None` or `0` lets the service choose.
    pub limit: Option<u32>,
    /// Cursor returned by a previous page.
    pub cursor: Option<String>,
}

impl ListEmailsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Query pairs to send; absent, zero, and empty values are dropped.
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit.filter(|limit| *limit > 0) {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(cursor) = self.cursor.as_deref().filter(|cursor| !cursor.is_empty()) {
            pairs.push(("cursor", cursor.to_string()));
        }
        pairs
    }
}

/// A downloaded attachment.
#[derive(Debug, Clone)]
pub struct AttachmentContent {
    /// Raw response body.
    pub bytes: Vec<u8>,
    /// All response headers.
    pub headers: HeaderMap,
}

impl AttachmentContent {
    /// The `Content-Type` header, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DomainsResponse {
    pub domains: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateEmailResponse {
    pub email: String,
}

/// The `{"success": ...}` body is checked to be an object and otherwise ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct DeleteEmailResponse {}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteMailboxResponse {
    pub deleted: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub error: String,
}
