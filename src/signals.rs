//! Termination requests that must trigger forced cleanup.
//!
//! Listening replaces the default "kill the process" action, so the program
//! decides when to exit: after every buffer is erased and every pending
//! clipboard clearance has run.

use tracing::{info, warn};

use crate::defaults::Defaults;

pub const SIGHUP: i32 = 1;
pub const SIGINT: i32 = 2;
pub const SIGTERM: i32 = 15;

/// Conventional shell exit status for death by `signal`.
pub fn exit_code(signal: i32) -> i32 {
    Defaults::SIGNAL_EXIT_BASE + signal
}

/// Listeners for interrupt, termination and hangup (terminal window
/// closed). The OS handlers are registered in [`install`](Self::install), so
/// a request that arrives before anyone awaits [`recv`](Self::recv) is kept.
pub struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: Option<tokio::signal::unix::Signal>,
    #[cfg(unix)]
    terminate: Option<tokio::signal::unix::Signal>,
    #[cfg(unix)]
    hangup: Option<tokio::signal::unix::Signal>,
    #[cfg(windows)]
    ctrl_c: Option<tokio::signal::windows::CtrlC>,
}

impl ShutdownSignals {
    /// Must be called from within a Tokio runtime. A listener that cannot be
    /// installed is logged and never fires.
    #[cfg(unix)]
    pub fn install() -> Self {
        use tokio::signal::unix::{signal, SignalKind};

        let listen = |kind: SignalKind, name: &str| match signal(kind) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(signal = name, error = %e, "could not install signal listener");
                None
            }
        };
        Self {
            interrupt: listen(SignalKind::interrupt(), "SIGINT"),
            terminate: listen(SignalKind::terminate(), "SIGTERM"),
            hangup: listen(SignalKind::hangup(), "SIGHUP"),
        }
    }

    #[cfg(windows)]
    pub fn install() -> Self {
        let ctrl_c = match tokio::signal::windows::ctrl_c() {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(error = %e, "could not listen for Ctrl+C");
                None
            }
        };
        Self { ctrl_c }
    }

    /// Resolves with the signal number of the first request.
    pub async fn recv(&mut self) -> i32 {
        let signal = self.wait().await;
        info!(signal, "shutdown requested");
        signal
    }

    #[cfg(unix)]
    async fn wait(&mut self) -> i32 {
        async fn next(listener: &mut Option<tokio::signal::unix::Signal>) {
            if let Some(s) = listener {
                if s.recv().await.is_some() {
                    return;
                }
            }
            std::future::pending::<()>().await
        }

        tokio::select! {
            _ = next(&mut self.interrupt) => SIGINT,
            _ = next(&mut self.terminate) => SIGTERM,
            _ = next(&mut self.hangup) => SIGHUP,
        }
    }

    #[cfg(windows)]
    async fn wait(&mut self) -> i32 {
        if let Some(s) = self.ctrl_c.as_mut() {
            if s.recv().await.is_some() {
                return SIGINT;
            }
        }
        std::future::pending().await
    }
}

/// Install the listeners and wait for the first request.
pub async fn shutdown_signal() -> i32 {
    ShutdownSignals::install().recv().await
}
