//! The dispatch resolver
//!
//! [`DelayedDispatch`] inspects every submitted action and picks one of four
//! paths, first match wins:
//!
//! 1. **Standard** actions go straight to `next`.
//! 2. **Deferred** actions are awaited; the settled action (or the rejection)
//!    is re-dispatched from the top of the pipeline.
//! 3. **Thunks** are called with `dispatch` and `get_state`.
//! 4. **Promise-carrying** actions announce a request action via `next`,
//!    run their computation, then forward a success or failure action via
//!    `next`. Anything else is forwarded unchanged.
//!
//! # Example
//!
//! ```ignore
//! use delayed_dispatch_core::prelude::*;
//! use serde_json::json;
//!
//! let resolver = DelayedDispatch::new(api, next, ());
//!
//! // next sees LOAD_REQUEST now, LOAD_SUCCESS once the computation settles
//! resolver
//!     .resolve(PromiseAction::new(
//!         ActionTypes::new("LOAD_REQUEST", "LOAD_SUCCESS", "LOAD_FAILURE"),
//!         |_: ()| async { Ok(json!({ "rows": 3 })) },
//!     ))
//!     .await?;
//! ```

use std::fmt;
use std::future::{self, Future};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::action::{ActionType, FluxAction};
use crate::config::DelayedDispatchConfig;
use crate::dispatchable::{
    ActionKind, ActionTypes, Deferred, Dispatchable, Producer, PromiseAction, Settlement,
};
use crate::error::{ResolveError, Result};
use crate::host::{Dispatch, MiddlewareApi, Next};

/// The outcome of resolving one action.
///
/// Always awaitable. Standard, plain and callable actions produce an
/// already-completed resolution; deferred and promise-carrying actions settle
/// on a spawned Tokio task.
///
/// Dropping a pending resolution does not stop the settlement: the outcome
/// action is still forwarded.
pub struct Resolution<R> {
    inner: Inner<R>,
}

enum Inner<R> {
    Ready(future::Ready<Result<R>>),
    Pending(JoinHandle<Result<R>>),
}

impl<R> Resolution<R> {
    /// A resolution that completed synchronously.
    pub fn ready(value: R) -> Self {
        Self {
            inner: Inner::Ready(future::ready(Ok(value))),
        }
    }

    /// A resolution that failed before any settlement was scheduled.
    pub fn failed(error: ResolveError) -> Self {
        Self {
            inner: Inner::Ready(future::ready(Err(error))),
        }
    }

    fn pending(handle: JoinHandle<Result<R>>) -> Self {
        Self {
            inner: Inner::Pending(handle),
        }
    }

    /// True when the value was produced without suspending.
    pub fn is_ready(&self) -> bool {
        matches!(self.inner, Inner::Ready(_))
    }

    /// True when the value depends on a spawned settlement.
    pub fn is_pending(&self) -> bool {
        !self.is_ready()
    }
}

impl<R> Future for Resolution<R> {
    type Output = Result<R>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            Inner::Ready(ready) => Pin::new(ready).poll(cx),
            Inner::Pending(handle) => Pin::new(handle)
                .poll(cx)
                .map(|joined| joined.map_err(ResolveError::from).and_then(|res| res)),
        }
    }
}

impl<R> fmt::Debug for Resolution<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_ready() { "ready" } else { "pending" };
        f.debug_struct("Resolution").field("state", &state).finish()
    }
}

/// Async action middleware.
///
/// Sits between action producers and the next pipeline stage. Holds no
/// state between calls: each [`resolve`](Self::resolve) is independent.
///
/// # Type Parameters
///
/// - `S`: Store state returned by `get_state`
/// - `R`: Value returned by the next stage
/// - `Src`: Source handed (cloned) to every promise producer
pub struct DelayedDispatch<S, R, Src = ()> {
    api: MiddlewareApi<S, R, Src>,
    next: Next<R>,
    source: Src,
    config: DelayedDispatchConfig,
}

impl<S, R, Src> DelayedDispatch<S, R, Src>
where
    S: 'static,
    R: Send + 'static,
    Src: Clone + Send + Sync + 'static,
{
    /// Create a resolver with the default configuration.
    pub fn new(api: MiddlewareApi<S, R, Src>, next: Next<R>, source: Src) -> Self {
        Self {
            api,
            next,
            source,
            config: DelayedDispatchConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: DelayedDispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &DelayedDispatchConfig {
        &self.config
    }

    /// Get the source handed to promise producers.
    pub fn source(&self) -> &Src {
        &self.source
    }

    /// Resolve one action.
    ///
    /// The request action of a promise-carrying action is forwarded before
    /// this returns and before the producer is invoked.
    ///
    /// # Errors
    ///
    /// Deferred and promise-carrying actions need a Tokio runtime; without
    /// one the resolution fails with [`ResolveError::NoRuntime`] and nothing
    /// is forwarded.
    pub fn resolve(&self, action: impl Into<Dispatchable<S, R, Src>>) -> Resolution<R> {
        let action = action.into();
        let kind = action.kind();
        if self.config.logging.should_log(action.log_name()) {
            tracing::debug!(action = %action.log_name(), kind = %kind, "Resolving action");
        }

        match action {
            Dispatchable::Standard(action) => Resolution::ready(self.next.call(action)),
            Dispatchable::Deferred(deferred) => self.resolve_deferred(deferred),
            Dispatchable::Thunk(thunk) => {
                thunk(self.api.dispatch.clone(), self.api.get_state.clone())
            }
            Dispatchable::PromiseCarrying(PromiseAction {
                promise: Some(promise),
                types,
                rest,
            }) if !types.is_empty() => self.resolve_promise(promise, types, rest),
            Dispatchable::PromiseCarrying(action) => {
                Resolution::ready(self.next.call(action.into_plain()))
            }
        }
    }

    fn resolve_deferred(&self, deferred: Deferred) -> Resolution<R> {
        let Ok(runtime) = Handle::try_current() else {
            return Resolution::failed(ResolveError::NoRuntime(ActionKind::Awaitable));
        };

        let dispatch = self.api.dispatch.clone();
        let rejection_type = self.config.rejection_type.clone();
        let handle = runtime.spawn(async move {
            let settled = settle(deferred.await, rejection_type);
            dispatch.call(settled).await
        });
        Resolution::pending(handle)
    }

    fn resolve_promise(
        &self,
        promise: Producer<Src>,
        types: ActionTypes,
        rest: FluxAction,
    ) -> Resolution<R> {
        let Ok(runtime) = Handle::try_current() else {
            return Resolution::failed(ResolveError::NoRuntime(ActionKind::PromiseCarrying));
        };

        let request = derive(&rest, types.request);
        self.log_forward(&request);
        self.next.call(request);

        let pending = promise(self.source.clone());
        let next = self.next.clone();
        let logging = self.config.logging.clone();
        let handle = runtime.spawn(async move {
            let outcome = match pending.await {
                Ok(payload) => {
                    let mut action = derive(&rest, types.success);
                    action.payload = Some(payload);
                    action
                }
                Err(error) => {
                    let mut action = derive(&rest, types.failure);
                    action.error = Some(error);
                    action
                }
            };
            if logging.should_log(crate::Action::name(&outcome)) {
                tracing::debug!(
                    action = %crate::Action::name(&outcome),
                    error = outcome.is_error(),
                    "Computation settled"
                );
            }
            Ok(next.call(outcome))
        });
        Resolution::pending(handle)
    }

    fn log_forward(&self, action: &FluxAction) {
        let name = crate::Action::name(action);
        if self.config.logging.should_log(name) {
            tracing::debug!(action = %name, "Forwarding request action");
        }
    }

    /// The host's dispatch capability.
    pub fn dispatch(&self) -> &Dispatch<S, R, Src> {
        &self.api.dispatch
    }
}

impl<S, R, Src: fmt::Debug> fmt::Debug for DelayedDispatch<S, R, Src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayedDispatch")
            .field("source", &self.source)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// `rest` with its `type` replaced; every other property carried over.
fn derive(rest: &FluxAction, kind: Option<ActionType>) -> FluxAction {
    rest.clone().with_kind(kind)
}

/// Reduce a deferred settlement to the action that gets re-dispatched.
///
/// Success keeps `{type, payload}`; rejection keeps `{type, error}`, with
/// `rejection_type` standing in for a missing `type`.
fn settle(settlement: Settlement, rejection_type: ActionType) -> FluxAction {
    match settlement {
        Ok(action) => FluxAction {
            kind: action.kind,
            payload: action.payload,
            ..FluxAction::default()
        },
        Err(rejection) => {
            let kind = rejection.kind.unwrap_or_else(|| {
                tracing::warn!(
                    fallback = %rejection_type,
                    "Deferred action rejected without a type"
                );
                rejection_type
            });
            FluxAction {
                kind: Some(kind),
                error: rejection.error,
                ..FluxAction::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatchable::ActionTypes;
    use crate::host::GetState;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<FluxAction>>>;

    fn recorder() -> (Log, Next<usize>) {
        let log: Log = Arc::default();
        let sink = Arc::clone(&log);
        let next = Next::new(move |action| {
            let mut log = sink.lock().unwrap();
            log.push(action);
            log.len()
        });
        (log, next)
    }

    fn resolver(next: Next<usize>) -> (Log, DelayedDispatch<u32, usize>) {
        let dispatched: Log = Arc::default();
        let sink = Arc::clone(&dispatched);
        let dispatch = Dispatch::new(move |action| match action {
            Dispatchable::Standard(action) => {
                sink.lock().unwrap().push(action);
                Resolution::ready(0)
            }
            _ => Resolution::ready(usize::MAX),
        });
        let api = MiddlewareApi::new(dispatch, GetState::new(|| 7));
        (dispatched, DelayedDispatch::new(api, next, ()))
    }

    fn taken(log: &Log) -> Vec<FluxAction> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    #[test]
    fn test_standard_action_forwarded_synchronously() {
        let (forwarded, next) = recorder();
        let (dispatched, resolver) = resolver(next);

        let resolution = resolver.resolve(FluxAction::new("TEST"));

        assert!(resolution.is_ready());
        assert_eq!(taken(&forwarded), vec![FluxAction::new("TEST")]);
        assert!(taken(&dispatched).is_empty());
    }

    #[tokio::test]
    async fn test_standard_action_returns_next_value() {
        let (_forwarded, next) = recorder();
        let (_, resolver) = resolver(next);

        assert_eq!(resolver.resolve(FluxAction::new("A")).await.unwrap(), 1);
        assert_eq!(resolver.resolve(FluxAction::new("B")).await.unwrap(), 2);
    }

    #[test]
    fn test_plain_action_forwarded_unchanged() {
        let (forwarded, next) = recorder();
        let (_, resolver) = resolver(next);

        let action = FluxAction::untyped()
            .with_payload(json!(1))
            .with_extra("id", json!("x"));
        assert!(resolver.resolve(action.clone()).is_ready());
        assert_eq!(taken(&forwarded), vec![action]);
    }

    #[test]
    fn test_thunk_receives_dispatch_and_state() {
        let (forwarded, next) = recorder();
        let (dispatched, resolver) = resolver(next);

        let thunk: Dispatchable<u32, usize> = Dispatchable::thunk(|dispatch, get_state| {
            let state = get_state.get();
            dispatch.call(FluxAction::new("FROM_THUNK").with_payload(json!(state)));
            Resolution::ready(state as usize * 10)
        });
        let resolution = resolver.resolve(thunk);

        assert!(resolution.is_ready());
        assert!(taken(&forwarded).is_empty());
        assert_eq!(
            taken(&dispatched),
            vec![FluxAction::new("FROM_THUNK").with_payload(json!(7))]
        );
    }

    #[tokio::test]
    async fn test_thunk_result_returned_directly() {
        let (_forwarded, next) = recorder();
        let (_, resolver) = resolver(next);

        let thunk: Dispatchable<u32, usize> =
            Dispatchable::thunk(|_, get_state| Resolution::ready(get_state.get() as usize + 1));
        let value = resolver.resolve(thunk).await.unwrap();
        assert_eq!(value, 8);
    }

    #[tokio::test]
    async fn test_promise_success() {
        let (forwarded, next) = recorder();
        let (dispatched, resolver) = resolver(next);

        let action = PromiseAction::new([Some("START"), Some("OK"), None], |_: ()| async {
            Ok(json!("test data"))
        });
        let resolution = resolver.resolve(action);

        assert!(resolution.is_pending());
        assert_eq!(taken(&forwarded), vec![FluxAction::new("START")]);

        assert_eq!(resolution.await.unwrap(), 1);
        assert_eq!(
            taken(&forwarded),
            vec![FluxAction::new("OK").with_payload(json!("test data"))]
        );
        assert!(taken(&dispatched).is_empty());
    }

    #[tokio::test]
    async fn test_promise_failure() {
        let (forwarded, next) = recorder();
        let (_, resolver) = resolver(next);

        let action = PromiseAction::new([Some("START"), None, Some("ERR")], |_: ()| async {
            Err(json!("test error"))
        });
        resolver.resolve(action).await.unwrap();

        assert_eq!(
            taken(&forwarded),
            vec![
                FluxAction::new("START"),
                FluxAction::new("ERR").with_error(json!("test error")),
            ]
        );
    }

    #[tokio::test]
    async fn test_promise_empty_slot_forwards_null_type() {
        let (forwarded, next) = recorder();
        let (_, resolver) = resolver(next);

        let action = PromiseAction::new([Some("START"), Some("OK"), None], |_: ()| async {
            Err(json!({ "code": 500 }))
        });
        resolver.resolve(action).await.unwrap();

        let forwarded = taken(&forwarded);
        assert_eq!(forwarded.len(), 2);
        assert_eq!(forwarded[1].kind, None);
        assert_eq!(forwarded[1].error, Some(json!({ "code": 500 })));
    }

    #[tokio::test]
    async fn test_promise_extra_fields_reach_every_derived_action() {
        let (forwarded, next) = recorder();
        let (_, resolver) = resolver(next);

        let action = PromiseAction::new(ActionTypes::new("REQ", "OK", "FAIL"), |_: ()| async {
            Ok(json!([1, 2]))
        })
        .with_type("IGNORED")
        .with_extra("page", json!(3));
        resolver.resolve(action).await.unwrap();

        assert_eq!(
            taken(&forwarded),
            vec![
                FluxAction::new("REQ").with_extra("page", json!(3)),
                FluxAction::new("OK")
                    .with_extra("page", json!(3))
                    .with_payload(json!([1, 2])),
            ]
        );
    }

    #[tokio::test]
    async fn test_promise_extra_fields_reach_failure_action() {
        let (forwarded, next) = recorder();
        let (_, resolver) = resolver(next);

        let action = PromiseAction::new(ActionTypes::new("REQ", "OK", "FAIL"), |_: ()| async {
            Err(json!("new"))
        })
        .with_extra("page", json!(3))
        .with_extra("error", json!("old"));
        resolver.resolve(action).await.unwrap();

        assert_eq!(
            taken(&forwarded),
            vec![
                FluxAction::new("REQ")
                    .with_extra("page", json!(3))
                    .with_error(json!("old")),
                FluxAction::new("FAIL")
                    .with_extra("page", json!(3))
                    .with_error(json!("new")),
            ]
        );
    }

    #[tokio::test]
    async fn test_promise_keys_stripped_from_derived_actions() {
        let (forwarded, next) = recorder();
        let (_, resolver) = resolver(next);

        let action = PromiseAction::new(ActionTypes::new("REQ", "OK", "FAIL"), |_: ()| async {
            Ok(json!(1))
        })
        .with_extra("types", json!("x"))
        .with_extra("promise", json!("y"));
        resolver.resolve(action).await.unwrap();

        let forwarded = taken(&forwarded);
        assert_eq!(
            serde_json::to_value(&forwarded[0]).unwrap(),
            json!({ "type": "REQ" })
        );
        assert_eq!(
            serde_json::to_value(&forwarded[1]).unwrap(),
            json!({ "type": "OK", "payload": 1 })
        );
    }

    #[tokio::test]
    async fn test_synthesized_fields_win_over_rest() {
        let (forwarded, next) = recorder();
        let (_, resolver) = resolver(next);

        let action = PromiseAction::new(ActionTypes::new("REQ", "OK", "FAIL"), |_: ()| async {
            Ok(json!("fresh"))
        })
        .with_payload(json!("stale"));
        resolver.resolve(action).await.unwrap();

        let forwarded = taken(&forwarded);
        assert_eq!(forwarded[0].payload, Some(json!("stale")));
        assert_eq!(forwarded[1].payload, Some(json!("fresh")));
    }

    #[tokio::test]
    async fn test_request_forwarded_before_producer_runs() {
        let (forwarded, next) = recorder();
        let (_, resolver) = resolver(next);

        let seen_at_start = Arc::new(Mutex::new(None));
        let probe = Arc::clone(&seen_at_start);
        let log = Arc::clone(&forwarded);
        let action = PromiseAction::new(ActionTypes::new("REQ", "OK", "FAIL"), move |_: ()| {
            *probe.lock().unwrap() = Some(log.lock().unwrap().len());
            async { Ok(json!(null)) }
        });
        resolver.resolve(action).await.unwrap();

        assert_eq!(*seen_at_start.lock().unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_producer_receives_source() {
        let (forwarded, next) = recorder();
        let api = MiddlewareApi::new(
            Dispatch::new(|_| Resolution::ready(0)),
            GetState::new(|| ()),
        );
        let resolver = DelayedDispatch::new(api, next, String::from("db://test"))
            .with_config(DelayedDispatchConfig::default().with_rejection_type("DB_ERROR"));
        assert_eq!(resolver.source(), "db://test");
        assert_eq!(resolver.config().rejection_type, "DB_ERROR");

        let action = PromiseAction::new(ActionTypes::new("REQ", "OK", "FAIL"), |source: String| {
            async move { Ok(json!(source)) }
        });
        resolver.resolve(action).await.unwrap();

        assert_eq!(
            taken(&forwarded)[1],
            FluxAction::new("OK").with_payload(json!("db://test"))
        );
    }

    #[tokio::test]
    async fn test_promise_without_types_forwarded_unchanged() {
        let (forwarded, next) = recorder();
        let (_, resolver) = resolver(next);

        let action = PromiseAction::new([None::<&str>, None, None], |_: ()| async { Ok(json!(1)) })
            .with_type("PLAIN");
        assert!(resolver.resolve(action).is_ready());
        assert_eq!(taken(&forwarded), vec![FluxAction::new("PLAIN")]);
    }

    #[tokio::test]
    async fn test_deferred_success_dispatches_type_and_payload() {
        let (forwarded, next) = recorder();
        let (dispatched, resolver) = resolver(next);

        let resolution = resolver.resolve(Dispatchable::deferred(async {
            Ok(FluxAction::new("PROMISE_CHECK")
                .with_payload(json!("test"))
                .with_extra("dropped", json!(true)))
        }));
        assert_eq!(resolution.await.unwrap(), 0);

        assert!(taken(&forwarded).is_empty());
        assert_eq!(
            taken(&dispatched),
            vec![FluxAction::new("PROMISE_CHECK").with_payload(json!("test"))]
        );
    }

    #[tokio::test]
    async fn test_deferred_rejection_dispatches_type_and_error() {
        let (_forwarded, next) = recorder();
        let (dispatched, resolver) = resolver(next);

        resolver
            .resolve(Dispatchable::deferred(async {
                Err(FluxAction::new("PROMISE_CHECK").with_error(json!("test error")))
            }))
            .await
            .unwrap();

        assert_eq!(
            taken(&dispatched),
            vec![FluxAction::new("PROMISE_CHECK").with_error(json!("test error"))]
        );
    }

    #[tokio::test]
    async fn test_untyped_rejection_uses_fallback_type() {
        let (_forwarded, next) = recorder();
        let (dispatched, resolver) = resolver(next);
        let resolver = resolver
            .with_config(DelayedDispatchConfig::default().with_rejection_type("ASYNC_ERROR"));

        resolver
            .resolve(Dispatchable::deferred(async {
                Err(FluxAction::untyped().with_error(json!("boom")))
            }))
            .await
            .unwrap();

        assert_eq!(
            taken(&dispatched),
            vec![FluxAction::new("ASYNC_ERROR").with_error(json!("boom"))]
        );
    }

    #[tokio::test]
    async fn test_resolving_twice_runs_computation_twice() {
        let (forwarded, next) = recorder();
        let (_, resolver) = resolver(next);

        let runs = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&runs);
        let action = PromiseAction::new(ActionTypes::new("REQ", "OK", "FAIL"), move |_: ()| {
            *counter.lock().unwrap() += 1;
            async { Ok(json!(1)) }
        });

        resolver.resolve(action.clone()).await.unwrap();
        resolver.resolve(action).await.unwrap();

        assert_eq!(*runs.lock().unwrap(), 2);
        assert_eq!(taken(&forwarded).len(), 4);
    }

    #[tokio::test]
    async fn test_dropped_resolution_still_delivers() {
        let (forwarded, next) = recorder();
        let (_, resolver) = resolver(next);

        let action = PromiseAction::new(ActionTypes::new("REQ", "OK", "FAIL"), |_: ()| async {
            tokio::task::yield_now().await;
            Ok(json!("late"))
        });
        drop(resolver.resolve(action));

        for _ in 0..100 {
            if forwarded.lock().unwrap().len() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(
            taken(&forwarded),
            vec![
                FluxAction::new("REQ"),
                FluxAction::new("OK").with_payload(json!("late")),
            ]
        );
    }

    #[test]
    fn test_async_paths_require_runtime() {
        let (forwarded, next) = recorder();
        let (_, resolver) = resolver(next);

        let resolution = resolver.resolve(PromiseAction::new(
            ActionTypes::new("REQ", "OK", "FAIL"),
            |_: ()| async { Ok(json!(1)) },
        ));
        assert!(resolution.is_ready());
        assert!(taken(&forwarded).is_empty());

        let resolution =
            resolver.resolve(Dispatchable::deferred(async { Ok(FluxAction::new("X")) }));
        assert!(resolution.is_ready());
    }

    #[tokio::test]
    async fn test_no_runtime_error_surfaces_on_await() {
        let (_forwarded, next) = recorder();
        let (_, resolver) = resolver(next);
        let resolution = std::thread::spawn(move || {
            resolver.resolve(Dispatchable::deferred(async { Ok(FluxAction::new("X")) }))
        })
        .join()
        .unwrap();

        assert!(matches!(
            resolution.await,
            Err(ResolveError::NoRuntime(ActionKind::Awaitable))
        ));
    }
}
