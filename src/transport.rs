//! Transport abstraction.
//!
//! The wire protocol is consumed through the [`Transport`] and [`Session`]
//! traits; the client never interprets wire bytes, only the status code on
//! a returned failure. A production implementation wraps a gRPC channel;
//! tests use the scripted in-memory transport from [`testing`].

use crate::encoding::Encoding;
use crate::error::TransportError;
use crate::request::SetOperation;
use crate::response::{ModelInfo, Notification, UpdateResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// Connection parameters handed to [`Transport::connect`].
///
/// Built once by the client constructor from the validated configuration.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    /// Target address including port.
    pub address: String,
    /// Username for authentication.
    pub username: Option<String>,
    /// Password for authentication.
    pub password: Option<String>,
    /// Path to the TLS client certificate.
    pub tls_cert: Option<PathBuf>,
    /// Path to the TLS client key.
    pub tls_key: Option<PathBuf>,
    /// Path to the TLS CA bundle.
    pub tls_ca: Option<PathBuf>,
    /// Whether to use TLS.
    pub use_tls: bool,
    /// Whether to verify the server certificate.
    pub verify_certificate: bool,
    /// Timeout for establishing the physical connection.
    pub connect_timeout: Duration,
}

/// A Get request as seen by the transport.
#[derive(Debug, Clone)]
pub struct GetRequest {
    /// Paths to read.
    pub paths: Vec<String>,
    /// Requested value encoding.
    pub encoding: Encoding,
}

/// A Set request as seen by the transport.
#[derive(Debug, Clone)]
pub struct SetRequest {
    /// Ordered update, replace and delete operations.
    pub operations: Vec<SetOperation>,
}

/// A Capabilities request. Carries no parameters today.
#[derive(Debug, Clone, Default)]
pub struct CapabilitiesRequest;

/// Payload of a successful Get call.
#[derive(Debug, Clone)]
pub struct GetPayload {
    /// Notifications returned by the device.
    pub notifications: Vec<Notification>,
}

/// Payload of a successful Set call.
#[derive(Debug, Clone)]
pub struct SetPayload {
    /// Per-operation results in request order.
    pub results: Vec<UpdateResult>,
}

/// Payload of a successful Capabilities call.
#[derive(Debug, Clone)]
pub struct CapabilitiesPayload {
    /// gNMI service version.
    pub version: String,
    /// Supported capabilities, typically encodings.
    pub capabilities: Vec<String>,
    /// Supported data models.
    pub models: Vec<ModelInfo>,
}

/// Opens physical connections to a target.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish a connection and return a live session.
    async fn connect(&self, target: &TargetConfig) -> Result<Box<dyn Session>, TransportError>;
}

/// A live connection able to execute single remote calls.
///
/// Deadlines are enforced by the caller, which drops the call future when
/// the per-attempt timer or the operation budget expires.
#[async_trait]
pub trait Session: Send + Sync {
    /// Execute a Capabilities call.
    async fn capabilities(
        &self,
        request: &CapabilitiesRequest,
    ) -> Result<CapabilitiesPayload, TransportError>;

    /// Execute a Get call.
    async fn get(&self, request: &GetRequest) -> Result<GetPayload, TransportError>;

    /// Execute a Set call.
    async fn set(&self, request: &SetRequest) -> Result<SetPayload, TransportError>;

    /// Close the connection. Idempotent.
    async fn close(&self) -> Result<(), TransportError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory transport for tests.

    use super::*;
    use crate::error::StatusCode;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    /// One recorded transport call.
    #[derive(Debug, Clone)]
    pub struct CallSpan {
        pub kind: &'static str,
        pub started: Instant,
        pub finished: Instant,
    }

    #[derive(Debug, Default)]
    struct ScriptState {
        /// Outcomes consumed front to back; empty means success.
        script: VecDeque<Option<StatusCode>>,
        /// When set, every call fails with this code regardless of script.
        always: Option<StatusCode>,
        /// Remaining connect attempts that must fail.
        failing_connects: u32,
        spans: Vec<CallSpan>,
    }

    #[derive(Debug, Default)]
    struct Inner {
        state: Mutex<ScriptState>,
        connects: AtomicU32,
        closes: AtomicU32,
        calls: AtomicU32,
        connect_delay: Mutex<Duration>,
        call_delay: Mutex<Duration>,
    }

    impl Inner {
        async fn run_call(&self, kind: &'static str) -> Result<(), TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let started = Instant::now();
            let delay = *self.call_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let mut state = self.state.lock().unwrap();
            let outcome = state.always.or_else(|| state.script.pop_front().flatten());
            state.spans.push(CallSpan {
                kind,
                started,
                finished: Instant::now(),
            });
            match outcome {
                Some(code) => Err(TransportError::status(code, format!("scripted {kind} failure"))),
                None => Ok(()),
            }
        }
    }

    /// Transport double whose call outcomes follow a script.
    ///
    /// Clones share state, so a test can keep a handle for assertions
    /// after moving a clone into the client. Records connect/close counts
    /// and per-call entry/exit timestamps so exclusion properties can be
    /// asserted.
    #[derive(Debug, Clone, Default)]
    pub struct ScriptedTransport {
        inner: Arc<Inner>,
    }

    impl ScriptedTransport {
        /// A transport whose calls always succeed.
        pub fn healthy() -> Self {
            Self::default()
        }

        /// Queue `n` failures with `code` before the script continues.
        pub fn fail_times(self, code: StatusCode, n: u32) -> Self {
            {
                let mut state = self.inner.state.lock().unwrap();
                for _ in 0..n {
                    state.script.push_back(Some(code));
                }
            }
            self
        }

        /// Make every call fail with `code`.
        pub fn always_fail(self, code: StatusCode) -> Self {
            self.inner.state.lock().unwrap().always = Some(code);
            self
        }

        /// Make the next `n` connect attempts fail.
        pub fn fail_connects(self, n: u32) -> Self {
            self.inner.state.lock().unwrap().failing_connects = n;
            self
        }

        /// Delay every connect by `delay`.
        pub fn connect_delay(self, delay: Duration) -> Self {
            *self.inner.connect_delay.lock().unwrap() = delay;
            self
        }

        /// Delay every call by `delay`.
        pub fn call_delay(self, delay: Duration) -> Self {
            *self.inner.call_delay.lock().unwrap() = delay;
            self
        }

        pub fn connect_count(&self) -> u32 {
            self.inner.connects.load(Ordering::SeqCst)
        }

        pub fn close_count(&self) -> u32 {
            self.inner.closes.load(Ordering::SeqCst)
        }

        pub fn call_count(&self) -> u32 {
            self.inner.calls.load(Ordering::SeqCst)
        }

        pub fn call_spans(&self) -> Vec<CallSpan> {
            self.inner.state.lock().unwrap().spans.clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn connect(
            &self,
            target: &TargetConfig,
        ) -> Result<Box<dyn Session>, TransportError> {
            let delay = *self.inner.connect_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            {
                let mut state = self.inner.state.lock().unwrap();
                if state.failing_connects > 0 {
                    state.failing_connects -= 1;
                    return Err(TransportError::connect(format!(
                        "scripted connect failure to {}",
                        target.address
                    )));
                }
            }
            self.inner.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedSession {
                inner: Arc::clone(&self.inner),
            }))
        }
    }

    struct ScriptedSession {
        inner: Arc<Inner>,
    }

    #[async_trait]
    impl Session for ScriptedSession {
        async fn capabilities(
            &self,
            _request: &CapabilitiesRequest,
        ) -> Result<CapabilitiesPayload, TransportError> {
            self.inner.run_call("capabilities").await?;
            Ok(CapabilitiesPayload {
                version: "0.10.0".to_string(),
                capabilities: vec!["json_ietf".to_string(), "proto".to_string()],
                models: vec![ModelInfo {
                    name: "openconfig-interfaces".to_string(),
                    organization: "OpenConfig working group".to_string(),
                    version: "3.0.0".to_string(),
                }],
            })
        }

        async fn get(&self, request: &GetRequest) -> Result<GetPayload, TransportError> {
            self.inner.run_call("get").await?;
            let updates = request
                .paths
                .iter()
                .map(|path| crate::response::Update {
                    path: path.clone(),
                    value: serde_json::json!({"value": "scripted"}),
                })
                .collect();
            Ok(GetPayload {
                notifications: vec![Notification {
                    timestamp: 1,
                    prefix: None,
                    updates,
                    deletes: Vec::new(),
                }],
            })
        }

        async fn set(&self, request: &SetRequest) -> Result<SetPayload, TransportError> {
            self.inner.run_call("set").await?;
            let results = request
                .operations
                .iter()
                .map(|op| UpdateResult {
                    path: op.path.clone(),
                    op: op.kind,
                })
                .collect();
            Ok(SetPayload { results })
        }

        async fn close(&self) -> Result<(), TransportError> {
            self.inner.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
