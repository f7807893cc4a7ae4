//! Process shutdown signals for long-running commands

use std::io;
use tokio::signal;

/// Listens for SIGINT (Ctrl-C) and, on Unix, SIGTERM.
///
/// Handlers are registered by [`ShutdownSignals::install`], so a signal that
/// arrives before [`ShutdownSignals::recv`] is polled is still observed
/// instead of terminating the process.
#[derive(Debug)]
pub struct ShutdownSignals {
    #[cfg(unix)]
    terminate: signal::unix::Signal,
}

impl ShutdownSignals {
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: signal::unix::signal(signal::unix::SignalKind::terminate())?,
        })
    }

    /// Waits for the first shutdown signal and returns its name.
    pub async fn recv(&mut self) -> io::Result<&'static str> {
        #[cfg(unix)]
        {
            tokio::select! {
                result = signal::ctrl_c() => result.map(|()| "SIGINT"),
                _ = self.terminate.recv() => Ok("SIGTERM"),
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await.map(|()| "Ctrl-C")
        }
    }
}
