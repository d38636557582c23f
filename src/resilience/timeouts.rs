//! Timeout enforcement.
//!
//! Timeout errors are distinct from other errors so callers can tell an
//! unanswered request from a refused one.

use std::future::Future;
use std::time::Duration;

/// The bounded future did not finish in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed(pub Duration);

impl std::fmt::Display for Elapsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "deadline of {:?} elapsed", self.0)
    }
}

impl std::error::Error for Elapsed {}

/// Run `fut` with an upper bound of `limit`.
pub async fn bounded<F>(limit: Duration, fut: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    tokio::time::timeout(limit, fut).await.map_err(|_| Elapsed(limit))
}
