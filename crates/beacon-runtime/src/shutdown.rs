use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

/// Future returned by a stop hook.
pub type StopFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Stop callback registered by a lifecycle participant.
pub type StopHook = Box<dyn Fn() -> StopFuture + Send + Sync>;

/// Shutdown coordinator configuration.
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Exit the process after stop hooks ran because of an OS signal.
    pub exit_on_signal: bool,
    /// Exit code used when `exit_on_signal` is set.
    pub exit_code: i32,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            exit_on_signal: true,
            exit_code: 1,
        }
    }
}

/// What triggered a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// Explicit call to [`ShutdownCoordinator::shutdown`].
    Requested,
}

/// Process lifecycle controller owned by the host application.
///
/// Components register stop hooks instead of touching process-wide signal
/// state. The coordinator owns OS signal handling and runs every hook when
/// a signal arrives or shutdown is requested.
pub struct ShutdownCoordinator {
    config: ShutdownConfig,
    hooks: Mutex<Vec<(String, Arc<StopHook>)>>,
    listening: AtomicBool,
    stopped_tx: watch::Sender<Option<ShutdownReason>>,
}

impl ShutdownCoordinator {
    /// Create a new coordinator.
    pub fn new(config: ShutdownConfig) -> Arc<Self> {
        let (stopped_tx, _) = watch::channel(None);
        Arc::new(Self {
            config,
            hooks: Mutex::new(Vec::new()),
            listening: AtomicBool::new(false),
            stopped_tx,
        })
    }

    /// Register a stop hook.
    pub fn on_stop(&self, name: impl Into<String>, hook: StopHook) {
        let name = name.into();
        tracing::debug!("Registered stop hook: {}", name);
        self.hooks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((name, Arc::new(hook)));
    }

    /// Remove a stop hook by name. Returns whether one was removed.
    pub fn remove_hook(&self, name: &str) -> bool {
        let mut hooks = self
            .hooks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = hooks.len();
        hooks.retain(|(hook_name, _)| hook_name != name);
        let removed = hooks.len() != before;
        if removed {
            tracing::debug!("Removed stop hook: {}", name);
        }
        removed
    }

    /// Number of registered stop hooks.
    pub fn hook_count(&self) -> usize {
        self.hooks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Install SIGINT/SIGTERM handling. Only the first call has an effect.
    pub fn listen_for_signals(self: &Arc<Self>) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let reason = wait_for_signal().await;
            tracing::info!("Received shutdown signal: {:?}", reason);
            coordinator.run_hooks(reason).await;

            if coordinator.config.exit_on_signal {
                std::process::exit(coordinator.config.exit_code);
            }
        });
    }

    /// Run all stop hooks now.
    pub async fn shutdown(&self) {
        self.run_hooks(ShutdownReason::Requested).await;
    }

    /// Wait until a shutdown has completed.
    pub async fn stopped(&self) -> ShutdownReason {
        let mut rx = self.stopped_tx.subscribe();
        loop {
            let current = *rx.borrow_and_update();
            if let Some(reason) = current {
                return reason;
            }
            if rx.changed().await.is_err() {
                return ShutdownReason::Requested;
            }
        }
    }

    async fn run_hooks(&self, reason: ShutdownReason) {
        let hooks: Vec<(String, Arc<StopHook>)> = self
            .hooks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        for (name, hook) in hooks {
            tracing::debug!("Running stop hook: {}", name);
            (**hook)().await;
        }

        self.stopped_tx.send_replace(Some(reason));
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> ShutdownReason {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            return ctrl_c().await;
        }
    };

    tokio::select! {
        reason = ctrl_c() => reason,
        _ = terminate.recv() => ShutdownReason::Terminate,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> ShutdownReason {
    ctrl_c().await
}

async fn ctrl_c() -> ShutdownReason {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    ShutdownReason::Interrupt
}
