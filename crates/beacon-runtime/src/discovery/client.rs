use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use beacon_core::config::BeaconConfig;
use beacon_core::error::{BeaconError, Result};
use beacon_core::model::{build_instance, Application, Instance};
use beacon_core::transport::HttpTransport;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::backoff::{retry_notify, MaxAttemptBackoff};
use super::heartbeat::{HeartbeatConfig, HeartbeatLoop};
use super::registry::RegistryApi;
use super::selector::ServiceUrlSelector;
use crate::shutdown::{ShutdownCoordinator, StopFuture};

/// Room for a stop signal even when the heartbeat already exited or never started.
const SHUTDOWN_CHANNEL_CAPACITY: usize = 2;

/// One registration session: an instance plus the signal that stops its heartbeat.
struct Session {
    instance: Arc<Instance>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: Mutex<Option<mpsc::Receiver<()>>>,
    heartbeat_running: Mutex<Option<Arc<AtomicBool>>>,
    armed: AtomicBool,
    deregistered: AtomicBool,
    span: tracing::Span,
}

impl Session {
    fn new(instance: Instance) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(SHUTDOWN_CHANNEL_CAPACITY);
        let span = tracing::info_span!(
            "discovery",
            app = %instance.app_name,
            instance_id = %instance.instance_id
        );

        Self {
            instance: Arc::new(instance),
            shutdown_tx,
            shutdown_rx: Mutex::new(Some(shutdown_rx)),
            heartbeat_running: Mutex::new(None),
            armed: AtomicBool::new(false),
            deregistered: AtomicBool::new(false),
            span,
        }
    }

    /// Never blocks; a full or closed channel means the loop is already stopping.
    fn signal_stop(&self) {
        let _ = self.shutdown_tx.try_send(());
    }

    fn hook_name(&self) -> String {
        format!("discovery:{}", self.instance.instance_id)
    }
}

struct ClientInner {
    config: BeaconConfig,
    registry: Arc<RegistryApi>,
    lifecycle: OnceLock<Arc<ShutdownCoordinator>>,
    session: Mutex<Option<Arc<Session>>>,
}

impl ClientInner {
    fn current_session(&self) -> Option<Arc<Session>> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn open_session(&self) -> Result<Arc<Session>> {
        let instance = build_instance(&self.config.instance)?;
        let session = Arc::new(Session::new(instance));

        let previous = self
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(session.clone());

        if let Some(previous) = previous {
            tracing::warn!(
                "Replacing active registration {} with {}",
                previous.instance.instance_id,
                session.instance.instance_id
            );
            previous.signal_stop();
            if let Some(lifecycle) = self.lifecycle.get() {
                lifecycle.remove_hook(&previous.hook_name());
            }
        }

        Ok(session)
    }

    /// Single registration attempt with no backoff.
    async fn re_register(&self, instance: &Instance) -> Result<()> {
        self.registry.register(instance).await
    }

    async fn complete_registration(self: Arc<Self>, session: Arc<Session>) -> Result<()> {
        let client = &self.config.client;
        let mut backoff = MaxAttemptBackoff::new(client.retry_interval(), client.retries);
        let instance = &session.instance;

        retry_notify(
            &mut backoff,
            || self.re_register(instance),
            |err, delay| {
                tracing::warn!("Registration failed, retrying in {:?}: {}", delay, err);
            },
        )
        .await?;

        tracing::info!("Registered instance {}", instance.instance_id);
        self.arm_heartbeat(&session);
        Ok(())
    }

    fn arm_heartbeat(self: &Arc<Self>, session: &Arc<Session>) {
        if session.armed.swap(true, Ordering::SeqCst) {
            return;
        }

        let is_current = self
            .current_session()
            .is_some_and(|current| Arc::ptr_eq(&current, session));
        if !is_current {
            tracing::debug!("Session replaced before its heartbeat was armed");
            return;
        }

        if let Some(lifecycle) = self.lifecycle.get() {
            let client = Arc::downgrade(self);
            let target = Arc::downgrade(session);
            lifecycle.on_stop(
                session.hook_name(),
                Box::new(move || -> StopFuture {
                    let client = client.clone();
                    let target = target.clone();
                    Box::pin(async move {
                        if let (Some(client), Some(session)) = (client.upgrade(), target.upgrade())
                        {
                            client.deregister_session(&session).await;
                        }
                    })
                }),
            );
        }

        if !self.config.client.register_with_registry {
            tracing::info!("Heartbeat disabled by configuration");
            return;
        }

        let shutdown_rx = session
            .shutdown_rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(shutdown_rx) = shutdown_rx else {
            return;
        };

        let heartbeat = match HeartbeatLoop::new(
            self.registry.clone(),
            session.instance.clone(),
            HeartbeatConfig {
                interval: self.config.client.poll_interval(),
            },
            shutdown_rx,
        ) {
            Ok(heartbeat) => heartbeat,
            Err(e) => {
                tracing::error!("Heartbeat not started: {}", e);
                return;
            }
        };
        *session
            .heartbeat_running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(heartbeat.running_flag());

        tokio::spawn(heartbeat.run().instrument(session.span.clone()));
    }

    async fn deregister_session(&self, session: &Session) {
        session.signal_stop();

        if session.deregistered.swap(true, Ordering::SeqCst) {
            tracing::debug!("Instance {} already deregistered", session.instance.instance_id);
            return;
        }

        match self.registry.deregister(&session.instance).await {
            Ok(status) => tracing::info!(
                "Deregistered instance {} with status {}",
                session.instance.instance_id,
                status
            ),
            Err(e) => tracing::error!(
                "Failed to deregister instance {}: {}",
                session.instance.instance_id,
                e
            ),
        }
    }
}

/// Handle to a registration running in the background.
pub struct RegistrationTask {
    handle: JoinHandle<Result<()>>,
}

impl RegistrationTask {
    /// Wait for the retry sequence to conclude.
    pub async fn wait(self) -> Result<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(BeaconError::Cancelled("registration".into())),
            Err(e) => Err(BeaconError::Transport(format!("registration task failed: {}", e))),
        }
    }

    /// Stop retrying. A heartbeat that was already armed keeps running.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Registers this process with the registry and keeps the lease alive.
///
/// Each `register` call builds a fresh [`Instance`] and opens a new session.
/// When a [`ShutdownCoordinator`] is attached the client registers a stop
/// hook that deregisters the session; signal handling stays with the host.
#[derive(Clone)]
pub struct DiscoveryClient {
    inner: Arc<ClientInner>,
}

impl DiscoveryClient {
    /// Create a client with a randomly selecting URL selector.
    pub fn new(config: BeaconConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let selector = ServiceUrlSelector::new(config.client.service_urls.clone())?;
        Self::with_selector(config, transport, selector)
    }

    /// Create a client with a caller-provided selector.
    pub fn with_selector(
        config: BeaconConfig,
        transport: Arc<dyn HttpTransport>,
        selector: ServiceUrlSelector,
    ) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(RegistryApi::new(transport, selector));
        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                registry,
                lifecycle: OnceLock::new(),
                session: Mutex::new(None),
            }),
        })
    }

    /// Attach the host's lifecycle controller. Only the first one is kept.
    pub fn with_lifecycle(self, lifecycle: Arc<ShutdownCoordinator>) -> Self {
        if self.inner.lifecycle.set(lifecycle).is_err() {
            tracing::warn!("Discovery client already has a lifecycle controller");
        }
        self
    }

    pub fn config(&self) -> &BeaconConfig {
        &self.inner.config
    }

    /// Register the instance.
    ///
    /// With `blocking` the call waits for the retry sequence and returns
    /// its final error. Otherwise it returns immediately and a failure is
    /// only logged; use [`spawn_registration`](Self::spawn_registration)
    /// to observe the outcome instead.
    pub async fn register(&self, blocking: bool) -> Result<()> {
        let session = self.inner.open_session()?;

        if blocking {
            let span = session.span.clone();
            self.inner
                .clone()
                .complete_registration(session)
                .instrument(span)
                .await
        } else {
            drop(self.spawn_session(session));
            Ok(())
        }
    }

    /// Register in the background and hand back the task.
    pub fn spawn_registration(&self) -> Result<RegistrationTask> {
        let session = self.inner.open_session()?;
        Ok(self.spawn_session(session))
    }

    fn spawn_session(&self, session: Arc<Session>) -> RegistrationTask {
        let inner = self.inner.clone();
        let span = session.span.clone();

        let handle = tokio::spawn(
            async move {
                let result = inner.complete_registration(session).await;
                if let Err(e) = &result {
                    tracing::error!("Background registration failed: {}", e);
                }
                result
            }
            .instrument(span),
        );

        RegistrationTask { handle }
    }

    /// One registration attempt for the current session, without backoff.
    pub async fn re_register(&self) -> Result<()> {
        let session = self.require_session()?;
        self.inner.re_register(&session.instance).await
    }

    /// Stop the heartbeat and deregister the current session.
    ///
    /// Safe to call repeatedly: the DELETE goes out once per session.
    pub async fn unregister(&self) {
        match self.inner.current_session() {
            Some(session) => {
                let span = session.span.clone();
                self.inner.deregister_session(&session).instrument(span).await;
            }
            None => tracing::warn!("Unregister called without an active registration"),
        }
    }

    /// The instance of the current session.
    pub fn instance(&self) -> Option<Arc<Instance>> {
        self.inner
            .current_session()
            .map(|session| session.instance.clone())
    }

    /// Whether the current session's heartbeat loop is running.
    pub fn heartbeat_running(&self) -> bool {
        self.inner
            .current_session()
            .and_then(|session| {
                session
                    .heartbeat_running
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .clone()
            })
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// The registry's view of this instance.
    pub async fn get_current_instance(&self) -> Result<Instance> {
        let session = self.require_session()?;
        let instance = &session.instance;
        self.get_instance(&instance.app_name, &instance.instance_id)
            .await
    }

    pub async fn get_instance(&self, app: &str, id: &str) -> Result<Instance> {
        self.inner.registry.get_instance(app, id).await
    }

    pub async fn get_application(&self, name: &str) -> Result<Application> {
        self.inner.registry.get_application(name).await
    }

    pub async fn get_applications(&self) -> Result<HashMap<String, Application>> {
        self.inner.registry.get_applications().await
    }

    fn require_session(&self) -> Result<Arc<Session>> {
        self.inner
            .current_session()
            .ok_or_else(|| BeaconError::NotRegistered(self.inner.config.instance.app_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::ShutdownConfig;
    use beacon_core::testing::{error_contains, MockHttp, MockResponse};
    use beacon_core::transport::Method;
    use beacon_core::{assert_err_variant, assert_http_called, assert_http_not_called, assert_ok};
    use std::time::Duration;
    use tokio::time::Instant;

    const REGISTER: &str = "*/apps/svc";
    const INSTANCE: &str = "*/apps/svc/svc:*";

    fn config() -> BeaconConfig {
        let mut config =
            BeaconConfig::from_args("svc", "10.0.0.5", 8080, ["http://registry:8761/eureka"]);
        config.client.poll_interval_seconds = 10;
        config
    }

    fn client(mock: &MockHttp, config: BeaconConfig) -> DiscoveryClient {
        DiscoveryClient::new(config, Arc::new(mock.clone())).unwrap()
    }

    #[test]
    fn test_new_rejects_empty_service_urls() {
        let mut config = config();
        config.client.service_urls.clear();
        let result = DiscoveryClient::new(config, Arc::new(MockHttp::new())).map(|_| ());
        assert_err_variant!(result, BeaconError::Config(_));
    }

    #[test]
    fn test_with_selector_rejects_zero_poll_interval() {
        let mut config = config();
        config.client.poll_interval_seconds = 0;
        let selector = ServiceUrlSelector::round_robin(config.client.service_urls.clone()).unwrap();

        let result =
            DiscoveryClient::with_selector(config, Arc::new(MockHttp::new()), selector).map(|_| ());
        assert_err_variant!(result, BeaconError::Config(_));
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_succeeds_with_single_call() {
        let mock = MockHttp::new();
        mock.mock_response(Method::Post, REGISTER, MockResponse::no_content());
        let client = client(&mock, config());

        assert_ok!(client.register(true).await);

        assert_http_called!(mock, REGISTER);
        mock.assert_method_called_times(Method::Post, REGISTER, 1);
        let instance = client.instance().unwrap();
        assert!(instance.instance_id.starts_with("svc:"));
        assert_eq!(instance.home_page_url, "http://10.0.0.5:8080/");
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_retries_at_interval() {
        let mock = MockHttp::new();
        mock.mock_sequence(
            Method::Post,
            REGISTER,
            vec![
                MockResponse::status(500),
                MockResponse::status(500),
                MockResponse::no_content(),
            ],
        );
        let client = client(&mock, config());

        let start = Instant::now();
        client.register(true).await.unwrap();

        let posts = mock.requests_to(Method::Post, REGISTER);
        assert_eq!(posts.len(), 3);
        assert_eq!(posts[0].at - start, Duration::ZERO);
        assert_eq!(posts[1].at - posts[0].at, Duration::from_secs(2));
        assert_eq!(posts[2].at - posts[1].at, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_exhaustion_returns_last_error() {
        let mock = MockHttp::new();
        mock.mock_response(Method::Post, REGISTER, MockResponse::error(500, "registry down"));
        let client = client(&mock, config());

        let err = client.register(true).await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(error_contains(&err, "registry down"));
        mock.assert_method_called_times(Method::Post, REGISTER, 3);

        tokio::time::sleep(Duration::from_secs(60)).await;
        mock.assert_method_called_times(Method::Put, INSTANCE, 0);
        assert!(!client.heartbeat_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_blocking_register_returns_immediately() {
        let mock = MockHttp::new();
        mock.mock_response(Method::Post, REGISTER, MockResponse::status(500));
        let client = client(&mock, config());

        client.register(false).await.unwrap();
        assert!(mock.requests().is_empty());

        tokio::time::sleep(Duration::from_secs(10)).await;
        mock.assert_method_called_times(Method::Post, REGISTER, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_registration_reports_result() {
        let mock = MockHttp::new();
        mock.mock_sequence(
            Method::Post,
            REGISTER,
            vec![MockResponse::status(503), MockResponse::no_content()],
        );
        let client = client(&mock, config());

        let task = client.spawn_registration().unwrap();
        task.wait().await.unwrap();

        mock.assert_method_called_times(Method::Post, REGISTER, 2);
        tokio::task::yield_now().await;
        assert!(client.heartbeat_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_registration_can_be_aborted() {
        let mock = MockHttp::new();
        mock.mock_response(Method::Post, REGISTER, MockResponse::status(500));
        let client = client(&mock, config());

        let task = client.spawn_registration().unwrap();
        task.abort();

        assert!(matches!(task.wait().await, Err(BeaconError::Cancelled(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_runs_after_registration() {
        let mock = MockHttp::new();
        mock.mock_response(Method::Post, REGISTER, MockResponse::no_content());
        mock.mock_response(Method::Put, INSTANCE, MockResponse::ok());
        let client = client(&mock, config());

        client.register(true).await.unwrap();
        tokio::time::sleep(Duration::from_secs(35)).await;

        mock.assert_method_called_times(Method::Put, INSTANCE, 3);
        assert!(client.heartbeat_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_reregisters_once() {
        let mock = MockHttp::new();
        mock.mock_response(Method::Post, REGISTER, MockResponse::no_content());
        mock.mock_sequence(
            Method::Put,
            INSTANCE,
            vec![MockResponse::not_found(), MockResponse::ok()],
        );
        let client = client(&mock, config());

        client.register(true).await.unwrap();
        tokio::time::sleep(Duration::from_secs(15)).await;
        mock.assert_method_called_times(Method::Post, REGISTER, 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        mock.assert_method_called_times(Method::Put, INSTANCE, 2);
        mock.assert_method_called_times(Method::Post, REGISTER, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_disabled_by_flag() {
        let mock = MockHttp::new();
        mock.mock_response(Method::Post, REGISTER, MockResponse::no_content());
        let mut config = config();
        config.client.register_with_registry = false;
        let client = client(&mock, config);

        client.register(true).await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        mock.assert_method_called_times(Method::Put, INSTANCE, 0);
        assert!(!client.heartbeat_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unregister_twice_sends_single_delete() {
        let mock = MockHttp::new();
        mock.mock_response(Method::Post, REGISTER, MockResponse::no_content());
        mock.mock_response(Method::Delete, INSTANCE, MockResponse::ok());
        let client = client(&mock, config());

        client.register(true).await.unwrap();
        client.unregister().await;
        client.unregister().await;

        mock.assert_method_called_times(Method::Delete, INSTANCE, 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        mock.assert_method_called_times(Method::Put, INSTANCE, 0);
        assert!(!client.heartbeat_running());
    }

    #[tokio::test]
    async fn test_unregister_without_session_is_noop() {
        let mock = MockHttp::new();
        let client = client(&mock, config());

        client.unregister().await;

        assert_http_not_called!(mock, "*");
        assert_err_variant!(
            client.get_current_instance().await,
            BeaconError::NotRegistered(_)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_hook_deregisters() {
        let mock = MockHttp::new();
        mock.mock_response(Method::Post, REGISTER, MockResponse::no_content());
        mock.mock_response(Method::Delete, INSTANCE, MockResponse::ok());
        let coordinator = ShutdownCoordinator::new(ShutdownConfig {
            exit_on_signal: false,
            exit_code: 0,
        });
        let client = client(&mock, config()).with_lifecycle(coordinator.clone());

        client.register(true).await.unwrap();
        assert_eq!(coordinator.hook_count(), 1);

        coordinator.shutdown().await;
        mock.assert_method_called_times(Method::Delete, INSTANCE, 1);

        client.unregister().await;
        mock.assert_method_called_times(Method::Delete, INSTANCE, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_current_instance() {
        let mock = MockHttp::new();
        mock.mock_response(Method::Post, REGISTER, MockResponse::no_content());
        mock.mock(Method::Get, INSTANCE, |request| {
            let id = request.url.rsplit('/').next().unwrap_or_default().to_string();
            MockResponse::json(serde_json::json!({
                "instance": {"instanceId": id, "app": "SVC", "status": "UP"}
            }))
        });
        let client = client(&mock, config());

        client.register(true).await.unwrap();
        let found = client.get_current_instance().await.unwrap();

        assert_eq!(found.instance_id, client.instance().unwrap().instance_id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_session_replaces_stop_hook() {
        let mock = MockHttp::new();
        mock.mock_response(Method::Post, REGISTER, MockResponse::no_content());
        mock.mock_response(Method::Delete, INSTANCE, MockResponse::ok());
        let coordinator = ShutdownCoordinator::new(ShutdownConfig {
            exit_on_signal: false,
            exit_code: 0,
        });
        let client = client(&mock, config()).with_lifecycle(coordinator.clone());

        assert_ok!(client.register(true).await);
        let first = client.instance().unwrap();
        assert_ok!(client.register(true).await);
        let second = client.instance().unwrap();
        assert_eq!(coordinator.hook_count(), 1);

        coordinator.shutdown().await;

        let deletes = mock.requests_to(Method::Delete, INSTANCE);
        assert_eq!(deletes.len(), 1);
        assert!(deletes[0].url.ends_with(&second.instance_id));
        assert!(!deletes[0].url.ends_with(&first.instance_id));
    }
}
