//! Test utilities for delayed-dispatch
//!
//! - [`TestHost`]: plays the store around a resolver and records every
//!   action handed to `next` and `dispatch`
//! - Assertion macros for verifying forwarded actions by type
//!
//! # Example
//!
//! ```
//! use delayed_dispatch_core::testing::TestHost;
//! use delayed_dispatch_core::{assert_forwarded, FluxAction};
//!
//! let mut host = TestHost::new(0u32);
//! let resolver = host.resolver();
//!
//! let _ = resolver.resolve(FluxAction::new("TEST"));
//!
//! let forwarded = host.drain_forwarded();
//! assert_forwarded!(forwarded, "TEST");
//! assert_eq!(forwarded, vec![FluxAction::new("TEST")]);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::action::FluxAction;
use crate::dispatchable::Dispatchable;
use crate::host::{Dispatch, GetState, MiddlewareApi, Next};
use crate::pipeline::Pipeline;
use crate::resolver::{DelayedDispatch, Resolution};

/// Records what a resolver forwards and dispatches.
///
/// Provides:
/// - Shared state read by `get_state`
/// - A recording `next` stage
/// - A recording `dispatch` that does not re-enter the resolver
///
/// Use [`pipeline`](Self::pipeline) instead when dispatched actions should
/// run through the resolver again.
pub struct TestHost<S> {
    state: Arc<Mutex<S>>,
    forwarded_tx: mpsc::UnboundedSender<FluxAction>,
    forwarded_rx: mpsc::UnboundedReceiver<FluxAction>,
    dispatched_tx: mpsc::UnboundedSender<FluxAction>,
    dispatched_rx: mpsc::UnboundedReceiver<FluxAction>,
    dispatch_calls: Arc<AtomicUsize>,
}

impl<S: Clone + Send + 'static> TestHost<S> {
    /// Create a new host with the given initial state.
    pub fn new(state: S) -> Self {
        let (forwarded_tx, forwarded_rx) = mpsc::unbounded_channel();
        let (dispatched_tx, dispatched_rx) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(Mutex::new(state)),
            forwarded_tx,
            forwarded_rx,
            dispatched_tx,
            dispatched_rx,
            dispatch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the state seen by `get_state`.
    pub fn set_state(&self, state: S) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// A state accessor over the shared state.
    pub fn get_state(&self) -> GetState<S> {
        let state = Arc::clone(&self.state);
        GetState::new(move || match state.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        })
    }

    /// A `next` stage that records each action.
    pub fn next(&self) -> Next<()> {
        let tx = self.forwarded_tx.clone();
        Next::new(move |action| {
            let _ = tx.send(action);
        })
    }

    /// A `dispatch` that records standard and plain actions.
    ///
    /// Every call is counted; only plain action objects are recorded.
    pub fn dispatch<Src>(&self) -> Dispatch<S, (), Src> {
        let tx = self.dispatched_tx.clone();
        let calls = Arc::clone(&self.dispatch_calls);
        Dispatch::new(move |action| {
            calls.fetch_add(1, Ordering::SeqCst);
            if let Dispatchable::Standard(action) = action {
                let _ = tx.send(action);
            }
            Resolution::ready(())
        })
    }

    /// The store capabilities, with a recording `dispatch`.
    pub fn api<Src>(&self) -> MiddlewareApi<S, (), Src> {
        MiddlewareApi::new(self.dispatch(), self.get_state())
    }

    /// A resolver wired to this host.
    pub fn resolver(&self) -> DelayedDispatch<S, ()> {
        self.resolver_with_source(())
    }

    /// A resolver wired to this host, handing `source` to producers.
    pub fn resolver_with_source<Src>(&self, source: Src) -> DelayedDispatch<S, (), Src>
    where
        Src: Clone + Send + Sync + 'static,
    {
        DelayedDispatch::new(self.api(), self.next(), source)
    }

    /// A re-entrant pipeline whose final stage records into this host.
    ///
    /// Dispatched actions go through the resolver again, so they show up in
    /// [`drain_forwarded`](Self::drain_forwarded), not in
    /// [`drain_dispatched`](Self::drain_dispatched).
    pub fn pipeline(&self) -> Pipeline<S, ()> {
        Pipeline::new(self.next(), self.get_state(), ())
    }

    /// Drain all actions forwarded to `next`.
    pub fn drain_forwarded(&mut self) -> Vec<FluxAction> {
        let mut actions = Vec::new();
        while let Ok(action) = self.forwarded_rx.try_recv() {
            actions.push(action);
        }
        actions
    }

    /// Drain all plain actions passed to `dispatch`.
    pub fn drain_dispatched(&mut self) -> Vec<FluxAction> {
        let mut actions = Vec::new();
        while let Ok(action) = self.dispatched_rx.try_recv() {
            actions.push(action);
        }
        actions
    }

    /// Number of `dispatch` calls so far, whatever was dispatched.
    pub fn dispatch_count(&self) -> usize {
        self.dispatch_calls.load(Ordering::SeqCst)
    }

    /// Wait for the next forwarded action.
    ///
    /// Returns `None` if nothing arrives within `timeout`.
    pub async fn next_forwarded(&mut self, timeout: Duration) -> Option<FluxAction> {
        tokio::time::timeout(timeout, self.forwarded_rx.recv())
            .await
            .ok()
            .flatten()
    }
}

impl<S: Clone + Send + Default + 'static> Default for TestHost<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

/// Assert that an action with the given type was forwarded.
///
/// # Example
///
/// ```ignore
/// let forwarded = host.drain_forwarded();
/// assert_forwarded!(forwarded, "FETCH_REQUEST");
/// ```
#[macro_export]
macro_rules! assert_forwarded {
    ($actions:expr, $kind:expr) => {
        assert!(
            $actions.iter().any(|a| a.kind_str() == Some($kind)),
            "Expected action `{}` to be forwarded, but got: {:?}",
            $kind,
            $actions
        );
    };
}

/// Assert that no action with the given type was forwarded.
///
/// # Example
///
/// ```ignore
/// let forwarded = host.drain_forwarded();
/// assert_not_forwarded!(forwarded, "FETCH_FAILURE");
/// ```
#[macro_export]
macro_rules! assert_not_forwarded {
    ($actions:expr, $kind:expr) => {
        assert!(
            !$actions.iter().any(|a| a.kind_str() == Some($kind)),
            "Expected action `{}` NOT to be forwarded, but it was: {:?}",
            $kind,
            $actions
        );
    };
}

/// Count how many forwarded actions have the given type.
///
/// # Example
///
/// ```ignore
/// let forwarded = host.drain_forwarded();
/// assert_eq!(count_forwarded!(forwarded, "TICK"), 3);
/// ```
#[macro_export]
macro_rules! count_forwarded {
    ($actions:expr, $kind:expr) => {
        $actions
            .iter()
            .filter(|a| a.kind_str() == Some($kind))
            .count()
    };
}
