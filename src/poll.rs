//! Polling a mailbox until a new email shows up.

use crate::{EmailSummary, Error, ListEmailsOptions, PaginatedEmailList, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Anything that can list a mailbox.
///
/// Implemented by [`Client`](crate::Client). [`poll_for_email`] only needs
/// this one operation, so tests and wrappers can supply their own.
pub trait EmailSource {
    /// List emails in `address`, newest first.
    fn list_emails(
        &self,
        address: &str,
        options: Option<&ListEmailsOptions>,
    ) -> impl Future<Output = Result<PaginatedEmailList>> + Send;
}

/// Timing and baseline for [`poll_for_email`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Give up once this much time has passed since polling started.
    pub timeout: Duration,
    /// Time between checks. The first check happens after one interval.
    pub interval: Duration,
    /// Number of emails already in the mailbox before polling began.
    pub initial_count: u64,
}

impl PollOptions {
    /// Poll with the given timeout and interval, counting from an empty mailbox.
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            initial_count: 0,
        }
    }

    /// Set the number of emails known to exist before polling began.
    pub fn initial_count(mut self, count: u64) -> Self {
        self.initial_count = count;
        self
    }
}

/// Wait until `address` holds more than `options.initial_count` emails.
///
/// - `Ok(Some(email))`: the newest email once the total grows.
/// - `Ok(None)`: the timeout passed without a new email.
/// - `Err(Error::Cancelled)`: `cancel` fired, even mid-request.
/// - Any other error: a listing call failed. No retry is attempted.
///
/// No check is made on entry; the first one runs after one full interval, so
/// an interval longer than the timeout returns `Ok(None)` without a request.
pub async fn poll_for_email<S>(
    source: &S,
    address: &str,
    options: &PollOptions,
    cancel: &CancellationToken,
) -> Result<Option<EmailSummary>>
where
    S: EmailSource,
{
    if options.interval.is_zero() {
        return Err(Error::InvalidArgument(
            "poll interval must be greater than zero".to_string(),
        ));
    }

    let start = Instant::now();
    // A deadline past the end of representable time means no deadline.
    let deadline = start.checked_add(options.timeout);
    let first_tick = start
        .checked_add(options.interval)
        .unwrap_or_else(|| far_future(start));
    let mut ticker = tokio::time::interval_at(first_tick, options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let list_options = ListEmailsOptions::new().limit(1);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(address, "polling cancelled");
                return Err(Error::Cancelled);
            }
            _ = ticker.tick() => {}
        }

        if deadline.is_some_and(|deadline| Instant::now() > deadline) {
            debug!(address, "polling timed out");
            return Ok(None);
        }

        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(address, "polling cancelled during check");
                return Err(Error::Cancelled);
            }
            page = source.list_emails(address, Some(&list_options)) => page?,
        };
        debug!(address, total = page.total, "checked mailbox");

        let grew = page.total > options.initial_count;
        if let Some(email) = page.data.into_iter().next().filter(|_| grew) {
            debug!(address, id = %email.id, "new email found");
            return Ok(Some(email));
        }
    }
}

/// Roughly 30 years out, the same horizon tokio uses for timers that never fire.
fn far_future(start: Instant) -> Instant {
    start + Duration::from_secs(86400 * 365 * 30)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use reqwest::StatusCode;
    use std::sync::Mutex;

    const TICK: Duration = Duration::from_secs(1);

    fn summary(id: &str) -> EmailSummary {
        EmailSummary {
            id: id.to_string(),
            from: "sender@example.com".to_string(),
            subject: "Verify your account".to_string(),
            text_preview: "Your code is 123456".to_string(),
            received_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
            has_attachments: false,
        }
    }

    /// Replays one scripted response per call and records when each call happened.
    struct ScriptedSource {
        responses: Mutex<Vec<Result<PaginatedEmailList>>>,
        calls: Mutex<Vec<(Instant, Option<ListEmailsOptions>)>>,
        delay: Duration,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<PaginatedEmailList>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
                calls: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().iter().map(|(at, _)| *at).collect()
        }
    }

    impl EmailSource for ScriptedSource {
        fn list_emails(
            &self,
            _address: &str,
            options: Option<&ListEmailsOptions>,
        ) -> impl Future<Output = Result<PaginatedEmailList>> + Send {
            self.calls
                .lock()
                .unwrap()
                .push((Instant::now(), options.cloned()));
            let response = self
                .responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(page(0, &[])));
            let delay = self.delay;
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                response
            }
        }
    }

    async fn poll(source: &ScriptedSource, options: PollOptions) -> Result<Option<EmailSummary>> {
        poll_for_email(source, "inbox@vanish.test", &options, &CancellationToken::new()).await
    }

    fn page(total: u64, ids: &[&str]) -> PaginatedEmailList {
        PaginatedEmailList {
            data: ids.iter().map(|id| summary(id)).collect(),
            next_cursor: None,
            total,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn finds_email_on_third_check() {
        let source = ScriptedSource::new(vec![
            Ok(page(0, &[])),
            Ok(page(0, &[])),
            Ok(page(1, &["em_new"])),
        ]);
        let start = Instant::now();
        let options = PollOptions::new(TICK * 3, TICK);

        let found = poll(&source, options).await.unwrap();

        assert_eq!(found.map(|email| email.id).as_deref(), Some("em_new"));
        let times = source.call_times();
        assert_eq!(times, vec![start + TICK, start + TICK * 2, start + TICK * 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_a_single_item_per_check() {
        let source = ScriptedSource::new(vec![Ok(page(1, &["em_1"]))]);
        let options = PollOptions::new(TICK * 5, TICK);

        poll(&source, options).await.unwrap();

        let calls = source.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, Some(ListEmailsOptions::new().limit(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn interval_longer_than_timeout_never_checks() {
        let source = ScriptedSource::new(vec![Ok(page(1, &["em_1"]))]);
        let start = Instant::now();
        let options = PollOptions::new(TICK, TICK * 5);

        let found = poll(&source, options).await.unwrap();

        assert!(found.is_none());
        assert!(source.call_times().is_empty());
        assert_eq!(Instant::now(), start + TICK * 5);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_count_never_grows() {
        let source = ScriptedSource::new(vec![]);
        let options = PollOptions::new(TICK * 3, TICK).initial_count(2);

        let found = poll(&source, options).await.unwrap();

        assert!(found.is_none());
        assert_eq!(source.call_times().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn total_at_baseline_is_not_new() {
        let source = ScriptedSource::new(vec![
            Ok(page(2, &["em_old"])),
            Ok(page(3, &["em_new"])),
        ]);
        let options = PollOptions::new(TICK * 10, TICK).initial_count(2);

        let found = poll(&source, options).await.unwrap();

        assert_eq!(found.unwrap().id, "em_new");
        assert_eq!(source.call_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn growing_total_with_empty_page_keeps_waiting() {
        let source = ScriptedSource::new(vec![Ok(page(1, &[])), Ok(page(1, &["em_1"]))]);
        let options = PollOptions::new(TICK * 10, TICK);

        let found = poll(&source, options).await.unwrap();

        assert_eq!(found.unwrap().id, "em_1");
        assert_eq!(source.call_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_before_first_tick_skips_listing() {
        let source = ScriptedSource::new(vec![Ok(page(1, &["em_1"]))]);
        let cancel = CancellationToken::new();
        let options = PollOptions::new(TICK * 10, TICK * 2);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(TICK).await;
            trigger.cancel();
        });

        let err = poll_for_email(&source, "inbox@vanish.test", &options, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(source.call_times().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn already_cancelled_token_returns_immediately() {
        let source = ScriptedSource::new(vec![]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let start = Instant::now();

        let options = PollOptions::new(TICK, TICK);

        let err = poll_for_email(&source, "inbox@vanish.test", &options, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_in_flight_check() {
        let source = ScriptedSource::new(vec![Ok(page(1, &["em_1"]))]).with_delay(TICK * 10);
        let cancel = CancellationToken::new();
        let options = PollOptions::new(TICK * 60, TICK);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(TICK * 2).await;
            trigger.cancel();
        });

        let err = poll_for_email(&source, "inbox@vanish.test", &options, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(source.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn listing_failure_ends_polling() {
        let source = ScriptedSource::new(vec![
            Ok(page(0, &[])),
            Err(Error::api(StatusCode::INTERNAL_SERVER_ERROR, None)),
            Ok(page(1, &["em_1"])),
        ]);
        let options = PollOptions::new(TICK * 10, TICK);

        let err = poll(&source, options).await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(source.call_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_check_does_not_burst_missed_ticks() {
        let source = ScriptedSource::new(vec![]).with_delay(TICK * 3 + TICK / 2);
        let start = Instant::now();
        let options = PollOptions::new(TICK * 6, TICK);

        let found = poll(&source, options).await.unwrap();

        assert!(found.is_none());
        // First check at 1s ends at 4.5s; the missed tick fires once, then the
        // schedule realigns to whole seconds.
        assert_eq!(
            source.call_times(),
            vec![start + TICK, start + TICK * 4 + TICK / 2]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_timeout_keeps_polling_until_found() {
        let source = ScriptedSource::new(vec![Ok(page(0, &[])), Ok(page(1, &["em_1"]))]);
        let start = Instant::now();
        let options = PollOptions::new(Duration::MAX, TICK);

        let found = poll(&source, options).await.unwrap();

        assert_eq!(found.unwrap().id, "em_1");
        assert_eq!(source.call_times(), vec![start + TICK, start + TICK * 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_timeout_still_honours_cancellation() {
        let source = ScriptedSource::new(vec![]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let options = PollOptions::new(Duration::MAX, TICK);

        let err = poll_for_email(&source, "inbox@vanish.test", &options, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(source.call_times().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn huge_interval_waits_without_checking() {
        let source = ScriptedSource::new(vec![Ok(page(1, &["em_1"]))]);
        let cancel = CancellationToken::new();
        let options = PollOptions::new(TICK, Duration::MAX);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(TICK * 5).await;
            trigger.cancel();
        });

        let err = poll_for_email(&source, "inbox@vanish.test", &options, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(source.call_times().is_empty());
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() {
        let source = ScriptedSource::new(vec![]);
        let options = PollOptions::new(TICK, Duration::ZERO);

        let err = poll(&source, options).await.unwrap_err();

        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(source.call_times().is_empty());
    }
}
