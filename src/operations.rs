//! The Get/Set/Capabilities operations and their shared retry engine.
//!
//! Every operation funnels through [`Client::run_with_retries`]: validate
//! inputs, ensure the lazy connection, acquire class-appropriate access
//! (shared for Get and Capabilities, exclusive for Set), then drive the
//! attempt loop under the total-operation budget. Transient failures back
//! off exponentially with jitter; failures that break the transport tear
//! the session down and dial a replacement before the next attempt.

use crate::client::Client;
use crate::connection::SharedState;
use crate::context::CallContext;
use crate::error::{GnmiError, GnmiResult, TransportError};
use crate::redact::prepare_json_for_logging;
use crate::request::{CallOptions, SetOperation, SetOperationKind};
use crate::response::{CapabilitiesResponse, GetResponse, SetResponse};
use crate::timeout::{self, AttemptDeadline};
use crate::transport::{CapabilitiesRequest, GetRequest, Session, SetRequest};
use crate::validate;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::{RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, warn};

/// Concurrency class of an operation.
///
/// Read-class operations share the connection; write-class operations hold
/// it exclusively so overlapping configuration changes cannot interleave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpClass {
    Read,
    Write,
}

/// Access to the shared state for the duration of one operation.
enum StateGuard<'a> {
    Shared(RwLockReadGuard<'a, SharedState>),
    Exclusive(RwLockWriteGuard<'a, SharedState>),
}

impl StateGuard<'_> {
    fn state(&self) -> &SharedState {
        match self {
            Self::Shared(guard) => guard,
            Self::Exclusive(guard) => guard,
        }
    }
}

/// A successful call plus the retries it consumed.
struct Retried<T> {
    value: T,
    retries: u32,
}

fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

impl Client {
    async fn acquire(&self, class: OpClass) -> StateGuard<'_> {
        match class {
            OpClass::Read => StateGuard::Shared(self.state.read().await),
            OpClass::Write => StateGuard::Exclusive(self.state.write().await),
        }
    }

    /// Replace the broken session while keeping the operation's access
    /// class intact.
    ///
    /// A write-class caller already holds exclusive access and reconnects
    /// in place. A read-class caller must upgrade: drop the shared guard,
    /// take the exclusive lock for the dial, then downgrade back to shared
    /// access. The lock is fair, so readers arriving during the upgrade
    /// queue behind it and never observe the torn-down session.
    async fn reconnect_for_retry<'a>(
        &'a self,
        guard: StateGuard<'a>,
        operation: &'static str,
        observed_generation: u64,
        cause: &TransportError,
    ) -> GnmiResult<StateGuard<'a>> {
        match guard {
            StateGuard::Exclusive(mut state) => {
                self.reconnect_locked(&mut state, observed_generation)
                    .await
                    .map_err(|failure| GnmiError::reconnect_failed(operation, cause, &failure))?;
                Ok(StateGuard::Exclusive(state))
            }
            StateGuard::Shared(state) => {
                drop(state);
                {
                    let mut exclusive = self.state.write().await;
                    self.reconnect_locked(&mut exclusive, observed_generation)
                        .await
                        .map_err(|failure| {
                            GnmiError::reconnect_failed(operation, cause, &failure)
                        })?;
                }
                Ok(StateGuard::Shared(self.state.read().await))
            }
        }
    }

    /// Drive one logical operation through the attempt loop.
    ///
    /// The closure is invoked once per attempt with the current session;
    /// it must own everything it needs so the attempt future can be
    /// dropped the instant a deadline or cancellation fires.
    async fn run_with_retries<T, F>(
        &self,
        operation: &'static str,
        class: OpClass,
        ctx: &CallContext,
        options: &CallOptions,
        call: F,
    ) -> GnmiResult<Retried<T>>
    where
        F: Fn(Arc<dyn Session>) -> BoxFuture<'static, Result<T, TransportError>>,
    {
        // An already-invalid scope performs zero network activity.
        ctx.check()
            .map_err(|cause| GnmiError::cancelled(operation, cause))?;

        self.ensure_connected(operation).await?;
        let mut guard = self.acquire(class).await;

        let budget =
            timeout::total_budget(self.config.operation_timeout, self.config.max_retries, &self.backoff);
        debug!(
            operation,
            total_budget = ?budget,
            operation_timeout = ?self.config.operation_timeout,
            max_retries = self.config.max_retries,
            target = %self.config.target,
            "applying total operation budget"
        );
        let ctx = ctx.bounded(budget);

        let mut attempt: u32 = 0;
        loop {
            if let Err(cause) = ctx.check() {
                debug!(operation, attempt, %cause, "operation cancelled");
                return Err(GnmiError::cancelled(operation, cause));
            }

            let Some((session, generation)) = guard.state().session() else {
                return Err(GnmiError::not_connected(operation));
            };

            let outcome = match timeout::attempt_deadline(options, &ctx, self.config.operation_timeout)
            {
                AttemptDeadline::Bounded(limit) => {
                    match ctx.run_until(tokio::time::timeout(limit, call(session))).await {
                        Ok(Ok(result)) => result,
                        Ok(Err(_elapsed)) => Err(TransportError::attempt_deadline(limit)),
                        Err(cause) => return Err(GnmiError::cancelled(operation, cause)),
                    }
                }
                AttemptDeadline::Inherited => match ctx.run_until(call(session)).await {
                    Ok(result) => result,
                    Err(cause) => return Err(GnmiError::cancelled(operation, cause)),
                },
            };

            let err = match outcome {
                Ok(value) => {
                    return Ok(Retried {
                        value,
                        retries: attempt,
                    })
                }
                Err(err) => err,
            };

            let class_of = err.classify();
            if !class_of.transient || attempt >= self.config.max_retries {
                error!(
                    operation,
                    target = %self.config.target,
                    attempt,
                    transient = class_of.transient,
                    error = %err,
                    "operation failed"
                );
                return Err(GnmiError::remote(operation, &err, attempt));
            }

            if class_of.transport_broken {
                guard = self
                    .reconnect_for_retry(guard, operation, generation, &err)
                    .await?;
            }

            let delay = self.backoff.delay(attempt);
            warn!(
                operation,
                target = %self.config.target,
                attempt = attempt + 1,
                max_retries = self.config.max_retries,
                backoff = ?delay,
                error = %err,
                "transient failure, retrying"
            );
            if let Err(cause) = ctx.sleep(delay).await {
                debug!(operation, %cause, "cancelled while backing off");
                return Err(GnmiError::cancelled_during_backoff(operation, cause));
            }
            attempt += 1;
        }
    }

    /// Retrieve configuration or state at the given paths.
    ///
    /// Runs under shared access, so concurrent Get and Capabilities calls
    /// proceed in parallel.
    pub async fn get(
        &self,
        ctx: &CallContext,
        paths: Vec<String>,
        options: CallOptions,
    ) -> GnmiResult<GetResponse> {
        validate::validate_paths(&paths).map_err(|err| GnmiError::validation("get", err))?;

        let encoding = options.encoding.unwrap_or_default();
        debug!(
            target = %self.config.target,
            paths = paths.len(),
            %encoding,
            "gNMI get"
        );
        for (index, path) in paths.iter().enumerate() {
            debug!(index, path = %path, "get path");
        }

        let request = GetRequest { paths, encoding };
        let outcome = self
            .run_with_retries("get", OpClass::Read, ctx, &options, move |session| {
                let request = request.clone();
                Box::pin(async move { session.get(&request).await })
            })
            .await?;

        let payload = outcome.value;
        debug!(
            target = %self.config.target,
            notifications = payload.notifications.len(),
            retries = outcome.retries,
            "gNMI get complete"
        );
        for (index, notification) in payload.notifications.iter().enumerate() {
            if let Ok(json) = serde_json::to_string(notification) {
                debug!(
                    index,
                    notification = %prepare_json_for_logging(&json, self.config.pretty_print_logs),
                    "get notification"
                );
            }
        }

        Ok(GetResponse {
            notifications: payload.notifications,
            timestamp: now_nanos(),
            ok: true,
            retries: outcome.retries,
        })
    }

    /// Apply an ordered list of update, replace and delete operations.
    ///
    /// Runs under exclusive access: two Set calls on the same client never
    /// overlap, and a Set never overlaps a Get.
    pub async fn set(
        &self,
        ctx: &CallContext,
        operations: Vec<SetOperation>,
        options: CallOptions,
    ) -> GnmiResult<SetResponse> {
        validate::validate_set_operations(&operations)
            .map_err(|err| GnmiError::validation("set", err))?;

        debug!(
            target = %self.config.target,
            operations = operations.len(),
            "gNMI set"
        );
        for (index, op) in operations.iter().enumerate() {
            if op.kind == SetOperationKind::Delete {
                debug!(index, op = %op.kind, path = %op.path, "set operation");
            } else {
                debug!(
                    index,
                    op = %op.kind,
                    path = %op.path,
                    value = %prepare_json_for_logging(&op.value, self.config.pretty_print_logs),
                    "set operation"
                );
            }
        }

        let request = SetRequest { operations };
        let outcome = self
            .run_with_retries("set", OpClass::Write, ctx, &options, move |session| {
                let request = request.clone();
                Box::pin(async move { session.set(&request).await })
            })
            .await?;

        let payload = outcome.value;
        debug!(
            target = %self.config.target,
            results = payload.results.len(),
            retries = outcome.retries,
            "gNMI set complete"
        );

        Ok(SetResponse {
            results: payload.results,
            timestamp: now_nanos(),
            ok: true,
            retries: outcome.retries,
        })
    }

    /// Query the capabilities the server advertises.
    ///
    /// Refreshes the cache behind [`Client::has_capability`] on success.
    pub async fn capabilities(
        &self,
        ctx: &CallContext,
        options: CallOptions,
    ) -> GnmiResult<CapabilitiesResponse> {
        debug!(target = %self.config.target, "gNMI capabilities");

        let outcome = self
            .run_with_retries(
                "capabilities",
                OpClass::Read,
                ctx,
                &options,
                move |session| Box::pin(async move { session.capabilities(&CapabilitiesRequest).await }),
            )
            .await?;

        let payload = outcome.value;
        debug!(
            target = %self.config.target,
            version = %payload.version,
            capabilities = payload.capabilities.len(),
            models = payload.models.len(),
            retries = outcome.retries,
            "gNMI capabilities complete"
        );

        {
            let mut state = self.state.write().await;
            state.capabilities = payload.capabilities.clone();
        }

        Ok(CapabilitiesResponse {
            version: payload.version,
            capabilities: payload.capabilities,
            models: payload.models,
            ok: true,
            retries: outcome.retries,
        })
    }
}
