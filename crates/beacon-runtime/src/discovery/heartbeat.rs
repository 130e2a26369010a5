use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use beacon_core::error::{BeaconError, Result};
use beacon_core::model::Instance;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::registry::RegistryApi;

/// Heartbeat loop configuration.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between heartbeats.
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

/// Periodic lease renewal for one registration session.
pub struct HeartbeatLoop {
    registry: Arc<RegistryApi>,
    instance: Arc<Instance>,
    config: HeartbeatConfig,
    running: Arc<AtomicBool>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl HeartbeatLoop {
    /// Create a new heartbeat loop. The interval must be non-zero.
    pub fn new(
        registry: Arc<RegistryApi>,
        instance: Arc<Instance>,
        config: HeartbeatConfig,
        shutdown_rx: mpsc::Receiver<()>,
    ) -> Result<Self> {
        if config.interval.is_zero() {
            return Err(BeaconError::Config(
                "heartbeat interval must be greater than zero".into(),
            ));
        }

        Ok(Self {
            registry,
            instance,
            config,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_rx,
        })
    }

    /// Shared flag, true while the loop runs.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Run until a shutdown signal arrives.
    ///
    /// The first heartbeat is sent one interval after start. A tick that is
    /// in flight when the signal arrives completes before the loop exits.
    pub async fn run(mut self) {
        let _running = RunningGuard::set(self.running.clone());
        tracing::info!("starting heartbeat....");

        let mut ticker = interval_at(Instant::now() + self.config.interval, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    break;
                }
                _ = ticker.tick() => {
                    tracing::debug!("sending heartbeat...");
                    self.beat().await;
                }
            }
        }

        tracing::info!("shutting down heartbeat service");
    }

    async fn beat(&self) {
        match self.registry.send_heartbeat(&self.instance).await {
            Ok(()) => {}
            Err(BeaconError::Evicted { .. }) => {
                tracing::info!("App not found, re-registering...");
                if let Err(e) = self.registry.register(&self.instance).await {
                    tracing::error!("Re-registration after eviction failed: {}", e);
                }
            }
            Err(e) => {
                tracing::error!("Heartbeat failed: {}", e);
            }
        }
    }
}

/// Clears the running flag however the loop ends, unwinding included.
struct RunningGuard(Arc<AtomicBool>);

impl RunningGuard {
    fn set(flag: Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::selector::ServiceUrlSelector;
    use beacon_core::assert_err_variant;
    use beacon_core::testing::{MockHttp, MockResponse};
    use beacon_core::transport::Method;

    fn setup(mock: &MockHttp) -> (Arc<RegistryApi>, Arc<Instance>) {
        let selector = ServiceUrlSelector::new(vec!["http://registry:8761".into()]).unwrap();
        let registry = Arc::new(RegistryApi::new(Arc::new(mock.clone()), selector));
        let instance = Arc::new(Instance {
            instance_id: "svc:1".to_string(),
            app_name: "svc".to_string(),
            ..Default::default()
        });
        (registry, instance)
    }

    fn config() -> HeartbeatConfig {
        HeartbeatConfig {
            interval: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_heartbeat_config_default() {
        assert_eq!(HeartbeatConfig::default().interval, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_interval() {
        let mock = MockHttp::new();
        mock.mock_response(Method::Put, "*/apps/svc/svc:1", MockResponse::ok());
        let (registry, instance) = setup(&mock);
        let (tx, rx) = mpsc::channel(2);

        let start = Instant::now();
        let heartbeat = HeartbeatLoop::new(registry, instance, config(), rx).unwrap();
        let handle = tokio::spawn(heartbeat.run());

        tokio::time::sleep(Duration::from_secs(35)).await;
        tx.try_send(()).unwrap();
        handle.await.unwrap();

        let beats = mock.requests_to(Method::Put, "*/apps/svc/svc:1");
        assert_eq!(beats.len(), 3);
        assert_eq!(beats[0].at - start, Duration::from_secs(10));
        assert_eq!(beats[2].at - start, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_triggers_single_reregistration() {
        let mock = MockHttp::new();
        mock.mock_sequence(
            Method::Put,
            "*/apps/svc/svc:1",
            vec![MockResponse::not_found(), MockResponse::ok()],
        );
        mock.mock_response(Method::Post, "*/apps/svc", MockResponse::status(500));
        let (registry, instance) = setup(&mock);
        let (tx, rx) = mpsc::channel(2);

        let heartbeat = HeartbeatLoop::new(registry, instance, config(), rx).unwrap();
        let running = heartbeat.running_flag();
        let handle = tokio::spawn(heartbeat.run());

        tokio::time::sleep(Duration::from_secs(15)).await;
        mock.assert_method_called_times(Method::Post, "*/apps/svc", 1);
        assert!(running.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(10)).await;
        mock.assert_method_called_times(Method::Put, "*/apps/svc/svc:1", 2);
        mock.assert_method_called_times(Method::Post, "*/apps/svc", 1);

        tx.try_send(()).unwrap();
        handle.await.unwrap();
        assert!(!running.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_do_not_stop_loop() {
        let mock = MockHttp::new();
        mock.mock_response(
            Method::Put,
            "*/apps/svc/svc:1",
            MockResponse::unreachable("connection refused"),
        );
        let (registry, instance) = setup(&mock);
        let (tx, rx) = mpsc::channel(2);

        let heartbeat = HeartbeatLoop::new(registry, instance, config(), rx).unwrap();
        let handle = tokio::spawn(heartbeat.run());

        tokio::time::sleep(Duration::from_secs(45)).await;
        mock.assert_method_called_times(Method::Put, "*/apps/svc/svc:1", 4);
        mock.assert_not_called("*/apps/svc");

        tx.try_send(()).unwrap();
        handle.await.unwrap();
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mock = MockHttp::new();
        let (registry, instance) = setup(&mock);
        let (_tx, rx) = mpsc::channel(2);

        let result = HeartbeatLoop::new(
            registry,
            instance,
            HeartbeatConfig {
                interval: Duration::ZERO,
            },
            rx,
        )
        .map(|_| ());
        assert_err_variant!(result, BeaconError::Config(_));
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_flag_cleared_when_task_aborted() {
        let mock = MockHttp::new();
        mock.mock_response(Method::Put, "*/apps/svc/svc:1", MockResponse::ok());
        let (registry, instance) = setup(&mock);
        let (_tx, rx) = mpsc::channel(2);

        let heartbeat = HeartbeatLoop::new(registry, instance, config(), rx).unwrap();
        let running = heartbeat.running_flag();
        let handle = tokio::spawn(heartbeat.run());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(running.load(Ordering::SeqCst));

        handle.abort();
        let _ = handle.await;
        assert!(!running.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_before_first_tick() {
        let mock = MockHttp::new();
        let (registry, instance) = setup(&mock);
        let (tx, rx) = mpsc::channel(2);

        tx.try_send(()).unwrap();
        HeartbeatLoop::new(registry, instance, config(), rx).unwrap().run().await;

        assert!(mock.requests().is_empty());
    }
}
