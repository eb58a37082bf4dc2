//! OS signal handling.
//!
//! SIGINT (Ctrl-C) and, on Unix, SIGTERM both request a graceful shutdown.
//! No other signals are handled.

use std::fmt;
use std::io;

/// Which termination request arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => f.write_str("interrupt"),
            ShutdownSignal::Terminate => f.write_str("terminated"),
        }
    }
}

/// Registered termination handlers.
///
/// Handlers are in place from [`TerminationSignals::install`] onward, so a
/// signal that arrives before anything awaits [`TerminationSignals::recv`]
/// is buffered rather than killing the process.
pub struct TerminationSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl TerminationSignals {
    /// Register the SIGINT and SIGTERM handlers. Must run inside a tokio runtime.
    pub fn install() -> io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }

        #[cfg(windows)]
        {
            Ok(Self {
                ctrl_c: tokio::signal::windows::ctrl_c()?,
            })
        }
    }

    /// Wait for the first termination request.
    pub async fn recv(mut self) -> io::Result<ShutdownSignal> {
        #[cfg(unix)]
        let received = tokio::select! {
            r = self.interrupt.recv() => r.map(|_| ShutdownSignal::Interrupt),
            r = self.terminate.recv() => r.map(|_| ShutdownSignal::Terminate),
        };

        #[cfg(windows)]
        let received = self.ctrl_c.recv().await.map(|_| ShutdownSignal::Interrupt);

        received.ok_or_else(|| io::Error::other("signal stream closed"))
    }
}
