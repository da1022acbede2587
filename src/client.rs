//! Vanish async client implementation.

use crate::models::{
    AttachmentContent, DeleteEmailResponse, DeleteMailboxResponse, DomainsResponse,
    EmailDetail, ErrorResponse, GenerateEmailOptions, GenerateEmailResponse, ListEmailsOptions,
    PaginatedEmailList,
};
use crate::poll::{self, EmailSource, PollOptions};
use crate::{EmailSummary, Error, Result};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Per-request timeout used unless [`ClientBuilder::timeout`] overrides it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent unless [`ClientBuilder::user_agent`] overrides it.
pub const DEFAULT_USER_AGENT: &str = concat!("vanish-client/", env!("CARGO_PKG_VERSION"));

/// Characters escaped in a single path segment. Unreserved characters and
/// `$ & + : = @` stay literal; `/ ; , ?` are escaped.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

/// Async client for the Vanish temporary email service.
///
/// Use [`Client::new`] for defaults or [`Client::builder`] to set an API key,
/// a timeout, or your own `reqwest::Client`.
///
/// The client holds no mutable state. Share it across tasks by reference or
/// inside an `Arc`.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a builder for configuring the client.
    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    /// Create an unauthenticated client with default settings.
    ///
    /// # Examples
    /// ```no_run
    /// # use vanish_client::Client;
    /// # fn main() -> Result<(), vanish_client::Error> {
    /// let client = Client::new("https://api.vanish.example")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        ClientBuilder::new(base_url).build()
    }

    /// Base URL every request path is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Per-request timeout applied to every call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// List the domains new addresses can be generated on.
    pub async fn get_domains(&self) -> Result<Vec<String>> {
        let response: DomainsResponse = self
            .send_json(Method::GET, "/domains", &[], None::<&()>)
            .await?;
        Ok(response.domains)
    }

    /// Create a new temporary email address.
    ///
    /// With `None` the request carries no body and the service picks both
    /// domain and prefix.
    ///
    /// # Examples
    /// ```no_run
    /// # use vanish_client::{Client, GenerateEmailOptions};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), vanish_client::Error> {
    /// let client = Client::new("https://api.vanish.example")?;
    /// let opts = GenerateEmailOptions::new().prefix("signup");
    /// let address = client.generate_email(Some(&opts)).await?;
    /// println!("{address}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn generate_email(&self, options: Option<&GenerateEmailOptions>) -> Result<String> {
        let response: GenerateEmailResponse = self
            .send_json(Method::POST, "/mailbox", &[], options)
            .await?;
        Ok(response.email)
    }

    /// List emails in a mailbox, newest first.
    ///
    /// # Examples
    /// ```no_run
    /// # use vanish_client::{Client, ListEmailsOptions};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), vanish_client::Error> {
    /// let client = Client::new("https://api.vanish.example")?;
    /// let mut cursor = None;
    /// loop {
    ///     let mut opts = ListEmailsOptions::new().limit(50);
    ///     opts.cursor = cursor.take();
    ///     let page = client.list_emails("me@vanish.example", Some(&opts)).await?;
    ///     for email in &page.data {
    ///         println!("{}: {}", email.from, email.subject);
    ///     }
    ///     match page.next_cursor {
    ///         Some(next) => cursor = Some(next),
    ///         None => break,
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list_emails(
        &self,
        address: &str,
        options: Option<&ListEmailsOptions>,
    ) -> Result<PaginatedEmailList> {
        let path = format!("/mailbox/{}", escape_segment(address));
        let query = options.map(ListEmailsOptions::query_pairs).unwrap_or_default();
        self.send_json(Method::GET, &path, &query, None::<&()>).await
    }

    /// Fetch the full contents of an email.
    pub async fn get_email(&self, email_id: &str) -> Result<EmailDetail> {
        let path = format!("/email/{}", escape_segment(email_id));
        self.send_json(Method::GET, &path, &[], None::<&()>).await
    }

    /// Download an attachment.
    ///
    /// The body is returned as-is together with the response headers; check
    /// [`AttachmentContent::content_type`] for the media type the server sent.
    pub async fn get_attachment(
        &self,
        email_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentContent> {
        let path = format!(
            "/email/{}/attachments/{}",
            escape_segment(email_id),
            escape_segment(attachment_id)
        );
        let response = self.send(Method::GET, &path, &[], None::<&()>).await?;
        let response = check_status(response).await?;
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(Error::Body)?;

        Ok(AttachmentContent {
            bytes: bytes.to_vec(),
            headers,
        })
    }

    /// Delete a single email.
    pub async fn delete_email(&self, email_id: &str) -> Result<()> {
        let path = format!("/email/{}", escape_segment(email_id));
        let _: DeleteEmailResponse = self
            .send_json(Method::DELETE, &path, &[], None::<&()>)
            .await?;
        Ok(())
    }

    /// Delete every email in a mailbox and return how many were removed.
    pub async fn delete_mailbox(&self, address: &str) -> Result<u64> {
        let path = format!("/mailbox/{}", escape_segment(address));
        let response: DeleteMailboxResponse = self
            .send_json(Method::DELETE, &path, &[], None::<&()>)
            .await?;
        Ok(response.deleted)
    }

    /// Wait for a new email to arrive in `address`.
    ///
    /// Returns `Ok(Some(email))` with the newest email once the mailbox total
    /// exceeds `options.initial_count`, `Ok(None)` when `options.timeout`
    /// passes first, and `Err(Error::Cancelled)` if `cancel` fires. The first
    /// check happens one interval after the call starts.
    ///
    /// # Examples
    /// ```no_run
    /// # use std::time::Duration;
    /// # use tokio_util::sync::CancellationToken;
    /// # use vanish_client::{Client, PollOptions};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), vanish_client::Error> {
    /// let client = Client::new("https://api.vanish.example")?;
    /// let address = client.generate_email(None).await?;
    /// let opts = PollOptions::new(Duration::from_secs(60), Duration::from_secs(2));
    /// match client.poll_for_email(&address, &opts, &CancellationToken::new()).await? {
    ///     Some(email) => println!("got {}", email.subject),
    ///     None => println!("nothing yet"),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn poll_for_email(
        &self,
        address: &str,
        options: &PollOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<EmailSummary>> {
        poll::poll_for_email(self, address, options, cancel).await
    }

    /// Send a request and decode a JSON success body.
    async fn send_json<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(method, path, query, body).await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await.map_err(Error::Body)?;
        serde_json::from_slice(&bytes).map_err(Error::Decode)
    }

    /// Send a single request and return the raw response.
    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let request = self.build_request(method, path, query, body)?;
        debug!(method = %request.method(), url = %request.url(), "sending request");

        let response = self.http.execute(request).await.map_err(Error::Transport)?;
        debug!(status = response.status().as_u16(), path, "received response");
        Ok(response)
    }

    fn build_request<B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<reqwest::Request>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self
            .http
            .request(method, url)
            .timeout(self.timeout)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if !query.is_empty() {
            builder = builder.query(query);
        }

        if let Some(key) = self.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }

        if let Some(body) = body {
            let encoded = serde_json::to_vec(body).map_err(Error::Marshal)?;
            builder = builder.body(encoded);
        }

        builder.build().map_err(Error::Request)
    }
}

impl EmailSource for Client {
    fn list_emails(
        &self,
        address: &str,
        options: Option<&ListEmailsOptions>,
    ) -> impl Future<Output = Result<PaginatedEmailList>> + Send {
        Client::list_emails(self, address, options)
    }
}

/// Turn a status of 400 or above into [`Error::Api`], consuming the body.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.as_u16() < 400 {
        return Ok(response);
    }

    let message = response
        .bytes()
        .await
        .ok()
        .and_then(|body| serde_json::from_slice::<ErrorResponse>(&body).ok())
        .map(|body| body.error);
    Err(Error::api(status, message))
}

/// Percent-escape `value` for use as one URL path segment.
fn escape_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Builder for configuring a Vanish client.
///
/// Start with [`Client::builder`] to override defaults.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    http: Option<reqwest::Client>,
    proxy: Option<String>,
    user_agent: String,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    ///
    /// Defaults:
    /// - No API key (anonymous requests)
    /// - 30 second per-request timeout
    /// - A fresh `reqwest::Client`, no proxy
    /// - [`DEFAULT_USER_AGENT`]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            http: None,
            proxy: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Authenticate requests with `Authorization: Bearer <key>`.
    ///
    /// An empty key is treated as no key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.api_key = (!key.is_empty()).then_some(key);
        self
    }

    /// Override the per-request timeout (default: 30 seconds).
    ///
    /// Applied to every request, including those sent through a client
    /// passed to [`ClientBuilder::http_client`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send requests through an existing `reqwest::Client`.
    ///
    /// [`proxy`](Self::proxy) and [`user_agent`](Self::user_agent) are ignored
    /// when this is set; configure them on the supplied client instead.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Set a proxy URL (e.g., "socks5://127.0.0.1:9050").
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Override the default user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the client. No network request is made.
    ///
    /// # Examples
    /// ```no_run
    /// # use std::time::Duration;
    /// # use vanish_client::Client;
    /// # fn main() -> Result<(), vanish_client::Error> {
    /// let client = Client::builder("https://api.vanish.example")
    ///     .api_key("sk_live_123")
    ///     .timeout(Duration::from_secs(10))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn build(self) -> Result<Client> {
        let http = match self.http {
            Some(http) => http,
            None => {
                let mut builder = reqwest::Client::builder().user_agent(self.user_agent);
                if let Some(proxy_url) = &self.proxy {
                    let proxy = reqwest::Proxy::all(proxy_url).map_err(Error::HttpClient)?;
                    builder = builder.proxy(proxy);
                }
                builder.build().map_err(Error::HttpClient)?
            }
        };

        Ok(Client {
            http,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            api_key: self.api_key,
            timeout: self.timeout,
        })
    }
}
