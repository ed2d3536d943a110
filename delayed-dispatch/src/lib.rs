//! delayed-dispatch: async action middleware for Redux-style stores
//!
//! Producers submit plain actions, futures, thunks, or actions carrying an
//! async computation. The resolver turns them into plain actions for the
//! next stage: request/success/failure for computations, re-dispatched
//! settlements for futures.
//!
//! # Example
//! ```ignore
//! use delayed_dispatch::prelude::*;
//! use serde_json::json;
//!
//! let pipeline = Pipeline::new(Next::new(reducer_stage), GetState::new(snapshot), api_client);
//!
//! pipeline.dispatch(PromiseAction::new(
//!     ActionTypes::new("USER_FETCH", "USER_DID_LOAD", "USER_DID_ERROR"),
//!     |client: ApiClient| async move { client.user(42).await },
//! ));
//! ```

// Re-export everything from core
pub use delayed_dispatch_core::*;

/// Prelude for convenient imports
pub mod prelude {
    // Actions
    pub use delayed_dispatch_core::{
        Action, ActionKind, ActionType, ActionTypes, Dispatchable, FluxAction, PromiseAction,
    };

    // Host capabilities
    pub use delayed_dispatch_core::{Dispatch, GetState, MiddlewareApi, Next};

    // Resolver
    pub use delayed_dispatch_core::{
        ActionLoggerConfig, DelayedDispatch, DelayedDispatchConfig, Pipeline, Resolution,
        ResolveError,
    };
}
