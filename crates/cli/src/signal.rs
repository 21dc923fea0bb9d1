//! Interrupt handling
//!
//! Ctrl+C or SIGTERM cancels the run's token once. In-flight network calls
//! observe the token and return [`mlink_core::Error::Cancelled`].

use mlink_core::CancellationToken;
use tokio::task::JoinHandle;

/// Wait for Ctrl+C, or SIGTERM on unix
async fn interrupted() -> &'static str {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "interrupt",
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                "terminate"
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        name = ctrl_c => name,
        name = terminate => name,
    }
}

/// Spawn the supervisor that cancels `token` on the first signal
///
/// Abort the returned handle once the command has finished.
pub fn supervise(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            signal = interrupted() => {
                tracing::debug!(signal, "received signal, cancelling");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}
