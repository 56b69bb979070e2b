//! Bounded retry over transport failures.
//!
//! # Responsibilities
//! - Execute an outbound send up to `max_attempts` times
//! - Classify each attempt as succeeded or transport-failed
//! - Aggregate the last failure cause on exhaustion
//!
//! # Design Decisions
//! - Each attempt is a fresh send; nothing is reused across attempts
//! - Retries are immediate (no backoff delay between attempts)
//! - A received response is never an attempt failure here: the caller's
//!   attempt future only errors on transport-level problems

use std::future::Future;

/// Outcome of a single send attempt.
#[derive(Debug)]
pub enum Attempt<T, E> {
    /// A response was obtained, however it is coded. Final.
    Succeeded(T),
    /// The transport failed before any response arrived.
    TransportFailure(E),
}

/// Run `attempt` up to `max_attempts` times, retrying only when the failure
/// is classified as retryable by `is_retryable`.
///
/// Returns the first success, or the last failure once attempts are
/// exhausted. Non-retryable failures terminate immediately.
pub async fn retry_transport<T, E, F, Fut, P>(
    max_attempts: u32,
    is_retryable: P,
    mut attempt: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = max_attempts.max(1);
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt().await {
            Attempt::Succeeded(value) => return Ok(value),
            Attempt::TransportFailure(cause) => {
                if tries < max_attempts && is_retryable(&cause) {
                    tracing::debug!(attempt = tries, max_attempts, "Retrying after transport failure");
                    continue;
                }
                return Err(cause);
            }
        }
    }
}
