//! Stop the watch loop and the web server on SIGINT, SIGTERM or SIGHUP.
//!
//! The first signal cancels the returned token: no new run starts, and an
//! album write already in progress finishes. The second one exits at once.

use std::sync::atomic::{AtomicU32, Ordering};

use tokio_util::sync::CancellationToken;

/// Exit status used when a second signal forces the process down.
const FORCED_EXIT_CODE: i32 = 130;

#[derive(Debug, PartialEq, Eq)]
enum Escalation {
    Graceful,
    Forced,
}

/// Counts delivered signals and decides what each one means.
#[derive(Debug, Default)]
struct SignalCounter(AtomicU32);

impl SignalCounter {
    fn record(&self, token: &CancellationToken) -> Escalation {
        if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
            token.cancel();
            Escalation::Graceful
        } else {
            Escalation::Forced
        }
    }
}

#[cfg(unix)]
struct Signals {
    terminate: Option<tokio::signal::unix::Signal>,
    hangup: Option<tokio::signal::unix::Signal>,
}

#[cfg(unix)]
impl Signals {
    fn register() -> Self {
        use tokio::signal::unix::{signal, SignalKind};

        let listen = |kind: SignalKind, name: &str| match signal(kind) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!("Cannot listen for {}: {}", name, e);
                None
            }
        };
        Self {
            terminate: listen(SignalKind::terminate(), "SIGTERM"),
            hangup: listen(SignalKind::hangup(), "SIGHUP"),
        }
    }

    async fn next(&mut self) {
        async fn recv(signal: &mut Option<tokio::signal::unix::Signal>) {
            match signal {
                Some(s) => {
                    s.recv().await;
                }
                None => std::future::pending().await,
            }
        }
        tokio::select! {
            _ = ctrl_c() => {}
            _ = recv(&mut self.terminate) => {}
            _ = recv(&mut self.hangup) => {}
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn register() -> Self {
        Self
    }

    async fn next(&mut self) {
        ctrl_c().await;
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Spawn the signal listener and hand back the token it cancels.
pub(crate) fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let handler_token = token.clone();

    tokio::spawn(async move {
        let mut signals = Signals::register();
        let counter = SignalCounter::default();
        loop {
            signals.next().await;
            match counter.record(&handler_token) {
                Escalation::Graceful => {
                    tracing::info!("Received shutdown signal, finishing current run...");
                    tracing::info!("Press Ctrl+C again to force exit");
                }
                Escalation::Forced => {
                    tracing::warn!("Force exit requested");
                    std::process::exit(FORCED_EXIT_CODE);
                }
            }
        }
    });

    token
}
