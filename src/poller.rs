//! Bounded-retry polling of remote operations
//!
//! The custody backend processes transactions and signatures asynchronously.
//! Callers observe completion by repeatedly reading the operation's status
//! until it is terminal. The attempt count is the only timeout: there is no
//! wall-clock deadline independent of it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Kind of remote operation being tracked, used in timeout errors and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Transaction,
    Signature,
    Action,
    DelegatedSigner,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Transaction => "transaction",
            OperationKind::Signature => "signature",
            OperationKind::Action => "action",
            OperationKind::DelegatedSigner => "delegated signer",
        })
    }
}

/// Poll interval and attempt budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollOptions {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Transactions settle on-chain, so they are polled less eagerly
    pub fn transaction() -> Self {
        Self::new(Duration::from_millis(3_000), Self::DEFAULT_MAX_ATTEMPTS)
    }

    pub fn signature() -> Self {
        Self::new(Duration::from_millis(1_000), Self::DEFAULT_MAX_ATTEMPTS)
    }

    pub fn action() -> Self {
        Self::new(Duration::from_millis(1_000), Self::DEFAULT_MAX_ATTEMPTS)
    }
}

impl Default for PollOptions {
    fn default() -> Self {
        Self::signature()
    }
}

/// Poll `fetch` until `is_terminal` holds for the returned snapshot.
///
/// `fetch` runs at most `options.max_attempts` times with `options.interval`
/// between attempts. A fetch error aborts the loop immediately. A terminal
/// snapshot is returned as a value regardless of whether it represents success
/// or failure.
pub async fn poll_until<T, F, Fut, P>(
    kind: OperationKind,
    id: &str,
    options: PollOptions,
    mut fetch: F,
    is_terminal: P,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&T) -> bool,
{
    for attempt in 1..=options.max_attempts {
        let snapshot = fetch().await?;

        if is_terminal(&snapshot) {
            tracing::debug!(%kind, id, attempt, "Operation reached terminal state");
            return Ok(snapshot);
        }

        tracing::trace!(%kind, id, attempt, "Operation not terminal yet");

        if attempt < options.max_attempts {
            tokio::time::sleep(options.interval).await;
        }
    }

    tracing::warn!(
        %kind,
        id,
        attempts = options.max_attempts,
        "Gave up waiting for operation"
    );

    Err(Error::PollTimeout {
        kind,
        id: id.to_string(),
        attempts: options.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum Status {
        Pending,
        Success,
        Failed,
    }

    fn terminal(s: &Status) -> bool {
        matches!(s, Status::Success | Status::Failed)
    }

    fn opts(max_attempts: u32) -> PollOptions {
        PollOptions::new(Duration::from_millis(1_000), max_attempts)
    }

    #[tokio::test(start_paused = true)]
    async fn returns_success_after_n_plus_one_calls() {
        let calls = AtomicUsize::new(0);
        let calls_ref = &calls;
        let pending_for = 3;

        let result = poll_until(
            OperationKind::Transaction,
            "tx1",
            opts(30),
            move || async move {
                let n = calls_ref.fetch_add(1, Ordering::SeqCst);
                Ok(if n < pending_for {
                    Status::Pending
                } else {
                    Status::Success
                })
            },
            terminal,
        )
        .await
        .unwrap();

        assert_eq!(result, Status::Success);
        assert_eq!(calls.load(Ordering::SeqCst), pending_for + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_exactly_max_attempts() {
        let calls = AtomicUsize::new(0);
        let calls_ref = &calls;

        let err = poll_until(
            OperationKind::Signature,
            "sig-9",
            opts(2),
            move || async move {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                Ok(Status::Pending)
            },
            terminal,
        )
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        match err {
            Error::PollTimeout { kind, id, attempts } => {
                assert_eq!(kind, OperationKind::Signature);
                assert_eq!(id, "sig-9");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_is_returned_as_value_and_stops_polling() {
        let calls = AtomicUsize::new(0);
        let calls_ref = &calls;

        let result = poll_until(
            OperationKind::Transaction,
            "tx1",
            opts(10),
            move || async move {
                let n = calls_ref.fetch_add(1, Ordering::SeqCst);
                Ok(if n == 0 { Status::Pending } else { Status::Failed })
            },
            terminal,
        )
        .await
        .unwrap();

        assert_eq!(result, Status::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_propagates_immediately() {
        let calls = AtomicUsize::new(0);
        let calls_ref = &calls;

        let err = poll_until(
            OperationKind::Action,
            "act-1",
            opts(5),
            move || async move {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                Err::<Status, _>(Error::remote_api(500, r#"{"error":"boom"}"#))
            },
            terminal,
        )
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.remote_status(), Some(500));
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_attempts_but_not_after_last() {
        let start = tokio::time::Instant::now();

        let _ = poll_until(
            OperationKind::Transaction,
            "tx1",
            opts(3),
            || async { Ok(Status::Pending) },
            terminal,
        )
        .await;

        assert_eq!(start.elapsed(), Duration::from_millis(2_000));
    }

    #[tokio::test]
    async fn zero_attempts_never_fetches() {
        let calls = AtomicUsize::new(0);
        let calls_ref = &calls;

        let err = poll_until(
            OperationKind::Transaction,
            "tx1",
            opts(0),
            move || async move {
                calls_ref.fetch_add(1, Ordering::SeqCst);
                Ok(Status::Success)
            },
            terminal,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::PollTimeout { attempts: 0, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
