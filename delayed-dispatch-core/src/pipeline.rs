//! Re-entrant wiring of a resolver in front of a store stage
//!
//! [`DelayedDispatch`] needs a `dispatch` capability that feeds actions back
//! into itself. [`Pipeline`] builds exactly that: the resolver's `dispatch`
//! holds a weak reference to the resolver, so settled deferreds and actions
//! dispatched from thunks are classified again from the top.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use delayed_dispatch_core::{Dispatchable, FluxAction, GetState, Next, Pipeline, Resolution};
//!
//! let counter = Arc::new(Mutex::new(0));
//! let reducer_state = Arc::clone(&counter);
//! let next = Next::new(move |action: FluxAction| {
//!     if action.kind_str() == Some("INCREMENT") {
//!         *reducer_state.lock().unwrap() += 1;
//!     }
//! });
//! let reader = Arc::clone(&counter);
//! let pipeline = Pipeline::new(next, GetState::new(move || *reader.lock().unwrap()), ());
//!
//! let increment_once: Dispatchable<i32, ()> = Dispatchable::thunk(|dispatch, get_state| {
//!     if get_state.get() == 0 {
//!         return dispatch.call(FluxAction::new("INCREMENT"));
//!     }
//!     Resolution::ready(())
//! });
//! pipeline.dispatch(increment_once);
//!
//! assert_eq!(*counter.lock().unwrap(), 1);
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use crate::config::DelayedDispatchConfig;
use crate::dispatchable::Dispatchable;
use crate::error::ResolveError;
use crate::host::{Dispatch, GetState, MiddlewareApi, Next};
use crate::resolver::{DelayedDispatch, Resolution};

/// A resolver whose `dispatch` re-enters itself.
pub struct Pipeline<S, R, Src = ()> {
    resolver: Arc<DelayedDispatch<S, R, Src>>,
}

impl<S, R, Src> Pipeline<S, R, Src>
where
    S: 'static,
    R: Send + 'static,
    Src: Clone + Send + Sync + 'static,
{
    /// Build a pipeline with the default configuration.
    pub fn new(next: Next<R>, get_state: GetState<S>, source: Src) -> Self {
        Self::with_config(next, get_state, source, DelayedDispatchConfig::default())
    }

    /// Build a pipeline with an explicit configuration.
    pub fn with_config(
        next: Next<R>,
        get_state: GetState<S>,
        source: Src,
        config: DelayedDispatchConfig,
    ) -> Self {
        let resolver = Arc::new_cyclic(|weak: &Weak<DelayedDispatch<S, R, Src>>| {
            let weak = weak.clone();
            let dispatch = Dispatch::new(move |action| match weak.upgrade() {
                Some(resolver) => resolver.resolve(action),
                None => Resolution::failed(ResolveError::Detached),
            });
            DelayedDispatch::new(MiddlewareApi::new(dispatch, get_state), next, source)
                .with_config(config)
        });
        Self { resolver }
    }

    /// Submit an action at the top of the pipeline.
    pub fn dispatch(&self, action: impl Into<Dispatchable<S, R, Src>>) -> Resolution<R> {
        self.resolver.resolve(action)
    }

    /// The resolver at the top of the pipeline.
    pub fn resolver(&self) -> &DelayedDispatch<S, R, Src> {
        &self.resolver
    }

    /// A dispatch capability bound to this pipeline.
    ///
    /// Only holds a weak reference: once the pipeline is dropped, calls fail
    /// with [`ResolveError::Detached`].
    pub fn dispatcher(&self) -> Dispatch<S, R, Src> {
        self.resolver.dispatch().clone()
    }
}

impl<S, R, Src> Clone for Pipeline<S, R, Src> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<S, R, Src: fmt::Debug> fmt::Debug for Pipeline<S, R, Src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("resolver", &self.resolver)
            .finish()
    }
}
