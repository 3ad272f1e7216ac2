//! Call admission, in-flight accounting and graceful shutdown.
//!
//! The [`Dispatcher`] is the entry point a transport uses to open calls. It
//! owns the [`Registry`] of advertised operations and a shutdown
//! [`CancellationToken`]; every call context it opens holds a child of that
//! token, so cancelling it reaches every in-flight call at once.

use super::context::CallContext;
use super::registry::{MethodDescriptor, Registry, ServiceDescriptor};
use crate::{Error, Result};
use core::time::Duration;
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;

/// Decrements the in-flight counter when the last handle of a call is
/// dropped.
pub(crate) struct InflightGuard {
    inflight: Arc<AtomicUsize>,
}

impl InflightGuard {
    fn new(inflight: Arc<AtomicUsize>) -> Self {
        inflight.fetch_add(1, Ordering::AcqRel);
        Self { inflight }
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.inflight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Opens calls for registered operations and coordinates shutdown.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Registry,
    default_timeout: Option<Duration>,
    drain_timeout: Duration,
    inflight: Arc<AtomicUsize>,
    refusing: AtomicBool,
    shutdown_token: CancellationToken,
}

impl Dispatcher {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            default_timeout: None,
            drain_timeout: Duration::from_secs(3),
            inflight: Arc::new(AtomicUsize::new(0)),
            refusing: AtomicBool::new(false),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Deadline applied to calls whose caller supplied none.
    pub fn with_default_timeout(mut self, default_timeout: Option<Duration>) -> Self {
        self.default_timeout = default_timeout;
        self
    }

    /// How long [`shutdown`](Self::shutdown) waits for in-flight calls before
    /// cancelling them.
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn services(&self) -> impl Iterator<Item = &'static ServiceDescriptor> + '_ {
        self.registry.services()
    }

    /// Number of calls whose context is still alive.
    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::Acquire)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.refusing.load(Ordering::Acquire)
    }

    /// Opens a call for `method`, timing its deadline from now.
    ///
    /// # Errors
    ///
    /// See [`open_since`](Self::open_since).
    pub fn open(
        &self,
        method: &'static MethodDescriptor,
        timeout: Option<Duration>,
    ) -> Result<CallContext> {
        self.open_since(method, timeout, Instant::now())
    }

    /// Opens a call for `method` that arrived at `arrived`.
    ///
    /// The deadline is `timeout` after `arrived` when the caller supplied
    /// one, the dispatcher's default otherwise, or none. A caller whose
    /// budget ran out before the call was opened gets a context that is
    /// already past its deadline.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceShutdown`] once shutdown has begun.
    /// - [`Error::Unimplemented`] if `method` is not registered.
    pub fn open_since(
        &self,
        method: &'static MethodDescriptor,
        timeout: Option<Duration>,
        arrived: Instant,
    ) -> Result<CallContext> {
        if self.is_shutting_down() {
            return Err(Error::ServiceShutdown);
        }
        if !self.registry.contains(method) {
            tracing::warn!("Refusing call to unregistered method {method}");
            return Err(Error::unimplemented(method.to_string()));
        }

        let deadline = timeout
            .or(self.default_timeout)
            .map(|timeout| arrived + timeout);

        tracing::trace!(
            "Opening {} call {method} (deadline in {:?})",
            method.shape,
            deadline.map(|d| d.saturating_duration_since(Instant::now()))
        );

        Ok(CallContext::build(
            Some(method),
            deadline,
            self.shutdown_token.child_token(),
            Some(InflightGuard::new(Arc::clone(&self.inflight))),
        ))
    }

    /// Gracefully shuts down.
    ///
    /// - Stops admitting new calls.
    /// - Waits up to the drain timeout for in-flight calls to finish.
    /// - Cancels whatever is still running; those calls observe
    ///   [`Error::ServiceShutdown`] at their next blocking operation.
    pub async fn shutdown(&self) {
        // === Phase 0: Stop accepting new calls ===
        tracing::info!("Refusing new calls");
        self.refusing.store(true, Ordering::Release);

        // === Phase 1: Wait for in-flight calls to drain ===
        tracing::info!("Draining in-flight calls ({} active)", self.inflight());
        let drain_result = timeout(self.drain_timeout, async {
            while self.inflight() > 0 {
                sleep(Duration::from_millis(100)).await;
            }
        })
        .await;

        match drain_result {
            Ok(()) => tracing::debug!("All in-flight calls drained successfully"),
            Err(_) => tracing::warn!(
                "Graceful drain timed out ({} calls still active)",
                self.inflight()
            ),
        }

        // === Phase 2: Cancel any remaining calls ===
        tracing::debug!("Cancelling remaining calls via shutdown token");
        self.shutdown_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Shape;

    static SLOW: MethodDescriptor = MethodDescriptor::new("test.Slow", "Wait", Shape::Unary);
    static OTHER: MethodDescriptor = MethodDescriptor::new("test.Slow", "Other", Shape::Unary);
    static SERVICE: ServiceDescriptor = ServiceDescriptor {
        name: "test.Slow",
        methods: &[&SLOW],
    };

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Registry::new().with(&SERVICE))
            .with_drain_timeout(Duration::from_millis(500))
    }

    #[tokio::test]
    async fn tracks_calls_until_every_handle_is_dropped() {
        let dispatcher = dispatcher();

        let ctx = dispatcher.open(&SLOW, None).unwrap();
        let clone = ctx.clone();
        assert_eq!(dispatcher.inflight(), 1);

        drop(ctx);
        assert_eq!(dispatcher.inflight(), 1);
        drop(clone);
        assert_eq!(dispatcher.inflight(), 0);
    }

    #[tokio::test]
    async fn rejects_unregistered_methods() {
        let err = dispatcher().open(&OTHER, None).unwrap_err();
        assert_eq!(err.code(), crate::Code::Unimplemented);
    }

    #[tokio::test(start_paused = true)]
    async fn applies_the_default_timeout() {
        let dispatcher = dispatcher().with_default_timeout(Some(Duration::from_secs(2)));

        let defaulted = dispatcher.open(&SLOW, None).unwrap();
        let explicit = dispatcher
            .open(&SLOW, Some(Duration::from_millis(10)))
            .unwrap();

        assert_eq!(defaulted.remaining(), Some(Duration::from_secs(2)));
        assert_eq!(explicit.remaining(), Some(Duration::from_millis(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_counts_from_arrival() {
        let dispatcher = dispatcher();
        let arrived = Instant::now();
        sleep(Duration::from_millis(30)).await;

        let ctx = dispatcher
            .open_since(&SLOW, Some(Duration::from_millis(100)), arrived)
            .unwrap();
        assert_eq!(ctx.remaining(), Some(Duration::from_millis(70)));

        let spent = dispatcher
            .open_since(&SLOW, Some(Duration::from_millis(10)), arrived)
            .unwrap();
        assert_eq!(spent.check(), Err(Error::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_refuses_new_calls_and_cancels_stragglers() {
        let dispatcher = dispatcher();
        let straggler = dispatcher.open(&SLOW, None).unwrap();

        dispatcher.shutdown().await;

        assert_eq!(
            dispatcher.open(&SLOW, None).unwrap_err(),
            Error::ServiceShutdown
        );
        assert_eq!(straggler.check(), Err(Error::ServiceShutdown));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_calls_to_finish() {
        let dispatcher = Arc::new(dispatcher());
        let ctx = dispatcher.open(&SLOW, None).unwrap();

        let worker = tokio::spawn(async move {
            sleep(Duration::from_millis(150)).await;
            drop(ctx);
        });
        dispatcher.shutdown().await;

        worker.await.unwrap();
        assert_eq!(dispatcher.inflight(), 0);
    }
}
