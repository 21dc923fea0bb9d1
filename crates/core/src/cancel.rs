//! Cooperative cancellation of network calls
//!
//! Every call into a backend is raced against a [`CancellationToken`]. The CLI
//! cancels the token once when the process receives an interrupt.

use std::future::Future;

pub use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Run `operation` unless `token` fires first
///
/// An already-cancelled token short-circuits without polling `operation`.
pub async fn cancellable<T, F>(token: &CancellationToken, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if token.is_cancelled() {
        return Err(Error::Cancelled);
    }

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::Cancelled),
        result = operation => result,
    }
}
