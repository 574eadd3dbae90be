//! Reconnect watchdog.
//!
//! # Responsibilities
//! - Wait for the transport to report a disconnect
//! - Re-run the connect routine with exponential backoff
//! - Stop for good once reconnection is suspended, the attempt budget is
//!   spent, or shutdown is signalled
//!
//! # Design Decisions
//! - Suspension is one-way; the node core only ever sets it
//! - The flag is checked before every attempt and after every backoff sleep,
//!   so an intentional close never races a reconnect that already slept

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Notify};

use crate::config::ReconnectConfig;
use crate::error::TransportError;
use crate::resilience::backoff::backoff_delay;
use crate::transport::SuspendReconnect;

/// Why the watchdog loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogExit {
    Suspended,
    GaveUp { attempts: u32 },
    Shutdown,
}

enum Attempt {
    Connected,
    Stopped(WatchdogExit),
}

#[derive(Debug)]
pub struct ConnectionWatchdog {
    config: ReconnectConfig,
    reconnect_suspended: AtomicBool,
    attempts: AtomicU32,
    disconnected: Notify,
}

impl ConnectionWatchdog {
    pub fn new(config: ReconnectConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            reconnect_suspended: AtomicBool::new(false),
            attempts: AtomicU32::new(0),
            disconnected: Notify::new(),
        })
    }

    /// Attempts made since the last successful connect.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Report a transport disconnect. Wakes the reconnect loop.
    pub fn notify_disconnected(&self) {
        self.disconnected.notify_one();
    }

    /// Drive reconnects until suspended, exhausted or shut down.
    pub async fn run<F, Fut>(
        self: Arc<Self>,
        mut connect: F,
        mut shutdown: broadcast::Receiver<()>,
    ) -> WatchdogExit
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), TransportError>>,
    {
        loop {
            tokio::select! {
                _ = self.disconnected.notified() => {}
                _ = shutdown.recv() => return WatchdogExit::Shutdown,
            }

            match self.reconnect(&mut connect, &mut shutdown).await {
                Attempt::Connected => continue,
                Attempt::Stopped(exit) => {
                    tracing::info!(reason = ?exit, "Reconnect watchdog stopped");
                    return exit;
                }
            }
        }
    }

    async fn reconnect<F, Fut>(
        &self,
        connect: &mut F,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Attempt
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), TransportError>>,
    {
        loop {
            if self.is_reconnect_suspended() {
                return Attempt::Stopped(WatchdogExit::Suspended);
            }

            let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
            let delay = backoff_delay(attempt, self.config.base_delay_ms, self.config.max_delay_ms);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.recv() => return Attempt::Stopped(WatchdogExit::Shutdown),
            }

            if self.is_reconnect_suspended() {
                return Attempt::Stopped(WatchdogExit::Suspended);
            }

            match connect().await {
                Ok(()) => {
                    tracing::debug!(attempt, "Reconnected");
                    self.attempts.store(0, Ordering::Relaxed);
                    return Attempt::Connected;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Reconnect attempt failed");
                    if self.config.max_attempts > 0 && attempt >= self.config.max_attempts {
                        return Attempt::Stopped(WatchdogExit::GaveUp { attempts: attempt });
                    }
                }
            }
        }
    }
}

impl SuspendReconnect for ConnectionWatchdog {
    fn suspend_reconnect(&self) {
        self.reconnect_suspended.store(true, Ordering::Release);
        // Wake a loop parked on `notified` so it observes the flag promptly.
        self.disconnected.notify_one();
    }

    fn is_reconnect_suspended(&self) -> bool {
        self.reconnect_suspended.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn fast() -> ReconnectConfig {
        ReconnectConfig {
            base_delay_ms: 1,
            max_delay_ms: 5,
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn test_reconnects_after_disconnect() {
        let watchdog = ConnectionWatchdog::new(fast());
        let (tx, rx) = broadcast::channel(1);
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        let task = tokio::spawn(watchdog.clone().run(
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), TransportError>(())
                }
            },
            rx,
        ));

        watchdog.notify_disconnected();
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        tx.send(()).unwrap();
        assert_eq!(task.await.unwrap(), WatchdogExit::Shutdown);
        assert_eq!(watchdog.attempts(), 0);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let watchdog = ConnectionWatchdog::new(fast());
        let (_tx, rx) = broadcast::channel(1);
        watchdog.notify_disconnected();

        let exit = watchdog
            .clone()
            .run(
                || async { Err::<(), _>(TransportError::Connect("refused".into())) },
                rx,
            )
            .await;
        assert_eq!(exit, WatchdogExit::GaveUp { attempts: 3 });
    }

    #[tokio::test]
    async fn test_suspension_stops_loop_without_connecting() {
        let watchdog = ConnectionWatchdog::new(fast());
        let (_tx, rx) = broadcast::channel(1);
        watchdog.suspend_reconnect();
        watchdog.suspend_reconnect();
        assert!(watchdog.is_reconnect_suspended());

        let calls = AtomicUsize::new(0);
        let exit = watchdog
            .clone()
            .run(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok::<(), TransportError>(()) }
                },
                rx,
            )
            .await;
        assert_eq!(exit, WatchdogExit::Suspended);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
