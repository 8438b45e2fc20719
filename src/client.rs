//! The gNMI client handle and its connection lifecycle.

use crate::backoff::BackoffPolicy;
use crate::config::ClientConfig;
use crate::connection::{ConnectionState, SharedState};
use crate::context::CallContext;
use crate::error::{ConfigError, GnmiError, GnmiResult, TransportError};
use crate::transport::{Session, TargetConfig, Transport};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// A resilient client for one gNMI target.
///
/// The constructor performs no I/O: the physical connection is established
/// lazily on the first operation and re-established transparently after
/// [`Client::disconnect`] or a broken transport. The client is safe to
/// share across tasks; Get and Capabilities run concurrently while Set is
/// exclusive.
///
/// # Example
///
/// ```ignore
/// use gnmi_client::{CallContext, CallOptions, Client, ClientConfig};
///
/// let config = ClientConfig::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .max_retries(5);
/// let client = Client::new(config, transport)?;
///
/// let ctx = CallContext::background();
/// let res = client
///     .get(&ctx, vec!["/system/config/hostname".into()], CallOptions::default())
///     .await?;
/// ```
pub struct Client {
    pub(crate) config: ClientConfig,
    pub(crate) target: TargetConfig,
    pub(crate) backoff: BackoffPolicy,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) state: RwLock<SharedState>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("target", &self.config.target)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client from a validated configuration.
    ///
    /// Fails only for configuration errors; no connection is attempted.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        config.validate()?;

        let target = TargetConfig {
            address: config.address(),
            username: config.username.clone(),
            password: config.password.clone(),
            tls_cert: config.tls_cert.clone(),
            tls_key: config.tls_key.clone(),
            tls_ca: config.tls_ca.clone(),
            use_tls: config.use_tls,
            verify_certificate: config.verify_certificate,
            connect_timeout: config.connect_timeout,
        };
        let backoff = BackoffPolicy {
            min_delay: config.backoff_min_delay,
            max_delay: config.backoff_max_delay,
            factor: config.backoff_factor,
        };

        Ok(Self {
            config,
            target,
            backoff,
            transport,
            state: RwLock::new(SharedState::new()),
        })
    }

    /// Dial the target, bounded by the connect timeout.
    async fn dial(&self) -> Result<Arc<dyn Session>, TransportError> {
        let connect = self.transport.connect(&self.target);
        match tokio::time::timeout(self.config.connect_timeout, connect).await {
            Ok(Ok(session)) => Ok(Arc::from(session)),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(TransportError::connect(format!(
                "connect to {} timed out after {:?}",
                self.target.address, self.config.connect_timeout
            ))),
        }
    }

    /// Establish the lazy connection if none exists yet.
    ///
    /// Always takes exclusive access for the actual dial, even when called
    /// from a read-class operation, since it mutates shared state. A closed
    /// client fails with a not-connected classification instead of dialing.
    pub(crate) async fn ensure_connected(&self, operation: &'static str) -> GnmiResult<()> {
        {
            let state = self.state.read().await;
            if state.is_connected() {
                return Ok(());
            }
            if state.is_closed() {
                return Err(GnmiError::not_connected(operation));
            }
        }

        let mut state = self.state.write().await;
        // Re-check: another caller may have won the race to connect.
        if state.is_connected() {
            return Ok(());
        }
        if state.is_closed() {
            return Err(GnmiError::not_connected(operation));
        }

        let session = self
            .dial()
            .await
            .map_err(|err| GnmiError::connect_failed(operation, &err))?;
        state.install(session);
        info!(target = %self.config.target, "gNMI connection established");
        Ok(())
    }

    /// Replace a broken session with a fresh one.
    ///
    /// Caller must hold exclusive access for the whole duration. When the
    /// observed generation is stale and a live session exists, a concurrent
    /// caller already repaired the connection and this is a no-op. Teardown
    /// errors on the old session are ignored; it is presumed broken.
    pub(crate) async fn reconnect_locked(
        &self,
        state: &mut SharedState,
        observed_generation: u64,
    ) -> Result<(), TransportError> {
        if state.generation != observed_generation && state.is_connected() {
            debug!(
                target = %self.config.target,
                "connection already repaired by a concurrent caller"
            );
            return Ok(());
        }
        if state.is_closed() {
            return Err(TransportError::connect("client closed"));
        }

        warn!(target = %self.config.target, reason = "transport error", "gNMI reconnecting");
        if let Some(old) = state.take_session(ConnectionState::Upgrading) {
            let _ = old.close().await;
        }

        match self.dial().await {
            Ok(session) => {
                state.install(session);
                info!(target = %self.config.target, "gNMI reconnected");
                Ok(())
            }
            Err(err) => {
                state.conn = ConnectionState::Disconnected;
                error!(target = %self.config.target, error = %err, "gNMI reconnection failed");
                Err(err)
            }
        }
    }

    /// Tear down the physical connection, keeping the configuration.
    ///
    /// Idempotent; a later operation transparently reconnects. A closed
    /// client stays closed.
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        let mut state = self.state.write().await;
        if state.is_closed() {
            return Ok(());
        }
        let session = state.take_session(ConnectionState::Disconnected);
        if let Some(session) = session {
            session.close().await?;
            info!(target = %self.config.target, "gNMI connection closed");
        }
        Ok(())
    }

    /// Close the client for good.
    ///
    /// Idempotent and safe to call concurrently; the session is taken out
    /// of the state cell before teardown so it can never be closed twice.
    /// Subsequent operations fail with a not-connected classification.
    pub async fn close(&self) -> Result<(), TransportError> {
        let mut state = self.state.write().await;
        let session = state.take_session(ConnectionState::Closed);
        if let Some(session) = session {
            session.close().await?;
            info!(target = %self.config.target, "gNMI connection closed");
        }
        Ok(())
    }

    /// Force connection establishment and verify reachability.
    ///
    /// Simply a Capabilities exchange; the capability cache is refreshed as
    /// a side effect like any other Capabilities call.
    pub async fn ping(&self, ctx: &CallContext) -> GnmiResult<()> {
        self.capabilities(ctx, crate::request::CallOptions::default())
            .await
            .map(|_| ())
    }

    /// Whether the server reported a specific capability.
    pub async fn has_capability(&self, capability: &str) -> bool {
        let state = self.state.read().await;
        state.capabilities.iter().any(|c| c == capability)
    }

    /// Capabilities reported by the server, as a copy.
    pub async fn server_capabilities(&self) -> Vec<String> {
        self.state.read().await.capabilities.clone()
    }

    /// Whether any credential material is configured, without exposing it.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.config.has_credentials()
    }
}
