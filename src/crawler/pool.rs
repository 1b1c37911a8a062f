//! Bounded-concurrency fetch pool with timeout retries
//!
//! Runs one fetch per input with at most `limit` in flight, preserving input
//! order within a pass. Inputs whose fetch timed out are collected and given
//! up to `retries` further passes; anything still timing out after that is
//! dropped with a warning. Other failures are logged and dropped at once.
//! A cancellation aborts the whole pool.

use crate::fetch::FetchError;
use futures::stream::{self, StreamExt};
use std::fmt;
use std::future::Future;

/// Results of a pool run
#[derive(Debug)]
pub struct PoolOutcome<R, T> {
    /// Successful fetches, append-only across retry passes
    pub fetched: Vec<(R, T)>,
    /// Inputs that failed for good (timeouts after all retries, other errors)
    pub dropped: Vec<R>,
}

impl<R, T> Default for PoolOutcome<R, T> {
    fn default() -> Self {
        Self {
            fetched: Vec::new(),
            dropped: Vec::new(),
        }
    }
}

/// Fetches every input with bounded concurrency and timeout retries
///
/// # Arguments
///
/// * `inputs` - Work items, fetched in this order
/// * `limit` - Maximum number of fetches in flight
/// * `retries` - Extra passes granted to timed-out inputs
/// * `fetch` - Produces the fetch future for one input
///
/// # Returns
///
/// * `Ok(PoolOutcome)` - All inputs were attempted
/// * `Err(FetchError::Cancelled)` - A fetch was cancelled; remaining work is dropped
pub async fn fetch_bounded<R, T, F, Fut>(
    inputs: Vec<R>,
    limit: usize,
    retries: u32,
    fetch: F,
) -> Result<PoolOutcome<R, T>, FetchError>
where
    R: Clone + fmt::Display,
    F: Fn(R) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let limit = limit.max(1);
    let mut outcome = PoolOutcome::default();
    let mut pending = inputs;

    for pass in 0..=retries {
        if pending.is_empty() {
            break;
        }
        if pass > 0 {
            tracing::info!(
                "Retrying {} timed out fetches (retry {}/{})",
                pending.len(),
                pass,
                retries
            );
        }

        let mut timed_out = Vec::new();
        let mut results = stream::iter(pending.into_iter().map(|input| {
            let request = fetch(input.clone());
            async move { (input, request.await) }
        }))
        .buffered(limit);

        while let Some((input, result)) = results.next().await {
            match result {
                Ok(value) => outcome.fetched.push((input, value)),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) if e.is_timeout() => {
                    tracing::debug!("Fetch timed out, queued for retry: {}", input);
                    timed_out.push(input);
                }
                Err(e) => {
                    tracing::error!("Failed fetching {}: {}", input, e);
                    outcome.dropped.push(input);
                }
            }
        }

        pending = timed_out;
    }

    for input in pending {
        tracing::warn!(
            "Dropping {} after {} timed out retries",
            input,
            retries
        );
        outcome.dropped.push(input);
    }

    Ok(outcome)
}
