// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Graceful shutdown coordination.
//!
//! The coordinator turns OS signals (SIGINT, SIGTERM, SIGQUIT on Unix; Ctrl+C
//! elsewhere) or a programmatic request into a single shutdown notification.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tracing::{info, warn};

// =============================================================================
// ShutdownCoordinator
// =============================================================================

/// What started the shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// An OS signal, by name.
    Signal(&'static str),
    /// [`ShutdownCoordinator::initiate_shutdown`] was called.
    Requested,
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownTrigger::Signal(name) => f.write_str(name),
            ShutdownTrigger::Requested => f.write_str("request"),
        }
    }
}

/// Coordinates graceful shutdown across components.
///
/// # Example
///
/// ```no_run
/// use softplc_bin::shutdown::ShutdownCoordinator;
///
/// # async fn example() {
/// let coordinator = ShutdownCoordinator::new();
/// let token = coordinator.token();
///
/// tokio::spawn(async move {
///     token.cancelled().await;
///     println!("Shutdown received!");
/// });
///
/// coordinator.wait_for_shutdown().await;
/// # }
/// ```
#[derive(Clone)]
pub struct ShutdownCoordinator {
    notify: broadcast::Sender<()>,
    stopping: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Creates a new shutdown coordinator.
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(1);
        Self {
            notify,
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribes to shutdown notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.notify.subscribe()
    }

    /// Returns a token for components that only need to observe shutdown.
    pub fn token(&self) -> ShutdownToken {
        ShutdownToken {
            notify: self.notify.clone(),
            stopping: Arc::clone(&self.stopping),
        }
    }

    /// Initiates shutdown. Only the first call notifies subscribers.
    pub fn initiate_shutdown(&self) {
        if self
            .stopping
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("Shutdown initiated");
            let _ = self.notify.send(());
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Waits for an OS signal or a programmatic request.
    ///
    /// A signal initiates shutdown before this returns.
    pub async fn wait_for_shutdown(&self) -> ShutdownTrigger {
        // Subscribe before checking the flag so a concurrent request is not missed.
        let mut receiver = self.notify.subscribe();
        if self.is_shutdown_initiated() {
            return ShutdownTrigger::Requested;
        }

        tokio::select! {
            name = os_signal() => {
                info!(signal = name, "Received signal");
                self.initiate_shutdown();
                ShutdownTrigger::Signal(name)
            }
            _ = receiver.recv() => ShutdownTrigger::Requested,
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("shutdown_initiated", &self.is_shutdown_initiated())
            .finish()
    }
}

#[cfg(unix)]
async fn os_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
        signal(SignalKind::quit()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint), Ok(mut sigquit)) => tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
            _ = sigquit.recv() => "SIGQUIT",
        },
        _ => {
            warn!("Cannot register Unix signal handlers, falling back to Ctrl+C");
            ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn os_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl+C; only programmatic shutdown is possible");
        std::future::pending::<()>().await;
    }
    "Ctrl+C"
}

// =============================================================================
// ShutdownToken
// =============================================================================

/// A cloneable handle for observing shutdown.
#[derive(Clone)]
pub struct ShutdownToken {
    notify: broadcast::Sender<()>,
    stopping: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Returns true if shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has been requested.
    pub async fn cancelled(&self) {
        let mut receiver = self.notify.subscribe();
        if self.is_shutdown_requested() {
            return;
        }
        let _ = receiver.recv().await;
    }
}

impl fmt::Debug for ShutdownToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownToken")
            .field("shutdown_requested", &self.is_shutdown_requested())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_initiate_notifies_subscribers_once() {
        let coordinator = ShutdownCoordinator::new();
        let mut first = coordinator.subscribe();
        let mut second = coordinator.clone().subscribe();
        assert!(!coordinator.is_shutdown_initiated());

        coordinator.initiate_shutdown();
        coordinator.clone().initiate_shutdown();

        assert!(coordinator.is_shutdown_initiated());
        assert!(first.recv().await.is_ok());
        assert!(second.recv().await.is_ok());
        assert!(first.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_wait_reports_request() {
        let coordinator = ShutdownCoordinator::new();
        let requester = coordinator.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            requester.initiate_shutdown();
        });

        let trigger = tokio::time::timeout(Duration::from_secs(1), coordinator.wait_for_shutdown())
            .await
            .expect("request should end the wait");
        assert_eq!(trigger, ShutdownTrigger::Requested);
        assert_eq!(trigger.to_string(), "request");
    }

    #[tokio::test]
    async fn test_wait_after_request_is_immediate() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.initiate_shutdown();
        assert_eq!(coordinator.wait_for_shutdown().await, ShutdownTrigger::Requested);
    }

    #[tokio::test]
    async fn test_tokens_follow_coordinator() {
        let coordinator = ShutdownCoordinator::new();
        let tokens: Vec<ShutdownToken> = (0..3).map(|_| coordinator.token()).collect();
        assert!(tokens.iter().all(|t| !t.is_shutdown_requested()));

        let waiters: Vec<_> = tokens
            .iter()
            .cloned()
            .map(|token| tokio::spawn(async move { token.cancelled().await }))
            .collect();

        coordinator.initiate_shutdown();
        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("every token should resolve")
                .unwrap();
        }
        assert!(tokens.iter().all(ShutdownToken::is_shutdown_requested));

        // A token taken after shutdown resolves at once.
        coordinator.token().cancelled().await;
    }

    #[test]
    fn test_signal_trigger_display() {
        assert_eq!(ShutdownTrigger::Signal("SIGTERM").to_string(), "SIGTERM");
    }
}
