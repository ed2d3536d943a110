//! Capabilities supplied by the host store
//!
//! The resolver owns no state. Everything it touches comes from its host:
//!
//! - [`Next`]: passes an action to the following stage
//! - [`Dispatch`]: re-injects an action at the top of the pipeline
//! - [`GetState`]: reads the current store snapshot
//!
//! All three are cheap to clone and safe to call from spawned tasks.

use std::fmt;
use std::sync::Arc;

use crate::action::{Action, FluxAction};
use crate::dispatchable::Dispatchable;
use crate::logging::ActionLoggerConfig;
use crate::resolver::Resolution;

/// The following pipeline stage.
///
/// Called with exactly one action per forwarding decision; its return value
/// is handed back to the resolver's caller unchanged.
pub struct Next<R>(Arc<dyn Fn(FluxAction) -> R + Send + Sync + 'static>);

impl<R> Next<R> {
    /// Wrap a stage function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(FluxAction) -> R + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Forward an action.
    pub fn call(&self, action: FluxAction) -> R {
        (self.0)(action)
    }
}

impl<R: 'static> Next<R> {
    /// Emit a `tracing` debug event for every action forwarded to this stage.
    ///
    /// Actions filtered out by `config` are forwarded silently.
    pub fn logged(self, config: ActionLoggerConfig) -> Self {
        Self::new(move |action: FluxAction| {
            if config.should_log(action.name()) {
                tracing::debug!(
                    action = %action.name(),
                    error = action.is_error(),
                    "Forwarding action"
                );
            }
            self.call(action)
        })
    }
}

impl<R> Clone for Next<R> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<R> fmt::Debug for Next<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// Re-enters the pipeline from the top.
///
/// Anything dispatched here goes through classification again, so thunks may
/// dispatch deferred or promise-carrying actions as well as plain ones.
pub struct Dispatch<S, R, Src = ()>(
    Arc<dyn Fn(Dispatchable<S, R, Src>) -> Resolution<R> + Send + Sync + 'static>,
);

impl<S, R, Src> Dispatch<S, R, Src> {
    /// Wrap a dispatch function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Dispatchable<S, R, Src>) -> Resolution<R> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Dispatch an action.
    pub fn call(&self, action: impl Into<Dispatchable<S, R, Src>>) -> Resolution<R> {
        (self.0)(action.into())
    }
}

impl<S, R, Src> Clone for Dispatch<S, R, Src> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<S, R, Src> fmt::Debug for Dispatch<S, R, Src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch").finish_non_exhaustive()
    }
}

/// Reads the current store state.
pub struct GetState<S>(Arc<dyn Fn() -> S + Send + Sync + 'static>);

impl<S> GetState<S> {
    /// Wrap a state accessor.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Current state snapshot.
    pub fn get(&self) -> S {
        (self.0)()
    }
}

impl<S> Clone for GetState<S> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<S> fmt::Debug for GetState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetState").finish_non_exhaustive()
    }
}

/// Store-side capabilities handed to the resolver at construction.
pub struct MiddlewareApi<S, R, Src = ()> {
    /// Pipeline re-entry
    pub dispatch: Dispatch<S, R, Src>,
    /// State accessor passed through to thunks
    pub get_state: GetState<S>,
}

impl<S, R, Src> MiddlewareApi<S, R, Src> {
    /// Bundle the store capabilities.
    pub fn new(dispatch: Dispatch<S, R, Src>, get_state: GetState<S>) -> Self {
        Self {
            dispatch,
            get_state,
        }
    }
}

impl<S, R, Src> Clone for MiddlewareApi<S, R, Src> {
    fn clone(&self) -> Self {
        Self {
            dispatch: self.dispatch.clone(),
            get_state: self.get_state.clone(),
        }
    }
}

impl<S, R, Src> fmt::Debug for MiddlewareApi<S, R, Src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareApi").finish_non_exhaustive()
    }
}
