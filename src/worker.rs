//! Bounded execution of store work.
//!
//! Every data-access handler hands its store interaction to [`run_bounded`], which runs it on
//! a separate task and races the outcome against the response deadline. Whichever of
//! success, failure or timeout resolves first decides the response. A timed-out task is not
//! cancelled: it keeps running until the store deadline and its result is discarded.

use std::{future::Future, time::Duration};

use tokio::sync::oneshot;
use tracing::{debug, warn, Instrument};

use crate::{
    config::WorkerConfig,
    error::{ApiError, ApiResult},
};

/// The pair of deadlines applied to one call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    /// How long the caller waits for a resolution.
    pub response: Duration,
    /// How long the spawned work may run against the store.
    pub store: Duration,
}

impl Deadlines {
    /// Writes and unfiltered reads.
    pub fn write(cfg: &WorkerConfig) -> Self {
        Self {
            response: Duration::from_secs(cfg.request_timeout_secs),
            store: Duration::from_secs(cfg.store_timeout_secs),
        }
    }

    /// Filtered, limited queries.
    pub fn query(cfg: &WorkerConfig) -> Self {
        Self {
            response: Duration::from_secs(cfg.request_timeout_secs),
            store: Duration::from_secs(cfg.query_timeout_secs),
        }
    }
}

/// How a bounded unit of work resolved.
#[derive(Debug)]
pub enum Resolution<T> {
    Completed(T),
    Failed(ApiError),
    TimedOut,
}

impl<T> Resolution<T> {
    pub fn into_result(self) -> ApiResult<T> {
        match self {
            Self::Completed(v) => Ok(v),
            Self::Failed(e) => Err(e),
            Self::TimedOut => Err(ApiError::Timeout),
        }
    }
}

/// Runs `work` on its own task and waits at most `deadlines.response` for it.
pub async fn run_bounded<T, F>(deadlines: Deadlines, work: F) -> Resolution<T>
where
    T: Send + 'static,
    F: Future<Output = ApiResult<T>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel::<ApiResult<T>>();
    let store_deadline = deadlines.store;

    tokio::spawn(
        async move {
            let outcome = match tokio::time::timeout(store_deadline, work).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(deadline = ?store_deadline, "store operation exceeded its deadline");
                    Err(ApiError::Persistence(anyhow::anyhow!(
                        "store operation exceeded {:?}",
                        store_deadline
                    )))
                }
            };
            // The caller may have stopped waiting already.
            if tx.send(outcome).is_err() {
                debug!("worker result discarded after response deadline");
            }
        }
        .in_current_span(),
    );

    match tokio::time::timeout(deadlines.response, rx).await {
        Ok(Ok(Ok(value))) => Resolution::Completed(value),
        Ok(Ok(Err(e))) => Resolution::Failed(e),
        Ok(Err(_)) => Resolution::Failed(ApiError::internal("worker ended without a result")),
        Err(_) => {
            warn!(deadline = ?deadlines.response, "request timed out waiting for worker");
            Resolution::TimedOut
        }
    }
}
