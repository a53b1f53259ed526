//! Process shutdown signals.

use std::fmt;
use std::future::pending;

use tracing::warn;

/// Which signal ended the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Interrupt,
    Terminate,
}

impl fmt::Display for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => f.write_str("SIGINT"),
            Self::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Resolves on SIGINT or SIGTERM. A handler that cannot be installed never fires.
pub async fn shutdown_signal() -> Shutdown {
    let interrupt = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "Failed to install Ctrl+C handler");
            pending::<()>().await;
        }
        Shutdown::Interrupt
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                warn!(error = %error, "Failed to install SIGTERM handler");
                pending::<()>().await;
            }
        }
        Shutdown::Terminate
    };

    #[cfg(not(unix))]
    let terminate = pending::<Shutdown>();

    tokio::select! {
        reason = interrupt => reason,
        reason = terminate => reason,
    }
}
