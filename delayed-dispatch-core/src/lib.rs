//! Core types and resolver for delayed-dispatch
//!
//! This crate provides an async action middleware for Redux-style stores.
//! Every action submitted to the store passes through a [`DelayedDispatch`]
//! resolver, which decides what the action is and what to do with it.
//!
//! # Core Concepts
//!
//! - **FluxAction**: A plain action object (`type`, `payload` or `error`, extras)
//! - **Dispatchable**: The four shapes a producer can submit
//! - **DelayedDispatch**: The resolver, parameterized by host capabilities
//! - **Next / Dispatch / GetState**: What the host store supplies
//! - **Pipeline**: A resolver whose `dispatch` re-enters itself
//!
//! # Basic Example
//!
//! ```
//! use delayed_dispatch_core::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let next = Next::new(|action: FluxAction| println!("reducer got {:?}", action.kind));
//! let pipeline = Pipeline::new(next, GetState::new(|| ()), ());
//!
//! // Plain actions pass straight through
//! pipeline.dispatch(FluxAction::new("PING"));
//!
//! // Promise-carrying actions announce a request, then a success or failure
//! pipeline
//!     .dispatch(PromiseAction::new(
//!         ActionTypes::new("LOAD_REQUEST", "LOAD_SUCCESS", "LOAD_FAILURE"),
//!         |_: ()| async { Ok(json!({ "rows": 3 })) },
//!     ))
//!     .await
//!     .unwrap();
//! # }
//! ```
//!
//! # Action Shapes
//!
//! Classification follows a fixed precedence; the first match wins:
//!
//! 1. **Standard**: has a `type`, and not both `payload` and `error`.
//!    Forwarded to `next` unchanged.
//! 2. **Deferred**: a future settling to `{type, payload}` or rejecting with
//!    `{type, error}`. The settlement is dispatched from the top.
//! 3. **Thunk**: called with `dispatch` and `get_state`; its result is
//!    returned as-is.
//! 4. **Promise-carrying**: `types: [request, success, failure]` plus a
//!    producer. `next` sees the request action immediately, then the success
//!    action with the payload or the failure action with the error.
//!
//! Anything that matches none of these is forwarded to `next` unchanged.

pub mod action;
pub mod config;
pub mod dispatchable;
pub mod error;
pub mod host;
pub mod logging;
pub mod pipeline;
pub mod resolver;
pub mod testing;

// Action model exports
pub use action::{Action, ActionType, Extra, FluxAction};
pub use dispatchable::{
    ActionKind, ActionTypes, BoxFuture, Deferred, Dispatchable, Producer, PromiseAction,
    Settlement, Thunk,
};

// Host capability exports
pub use host::{Dispatch, GetState, MiddlewareApi, Next};

// Resolver exports
pub use config::{DelayedDispatchConfig, DEFAULT_REJECTION_TYPE};
pub use error::ResolveError;
pub use logging::{glob_match, ActionLoggerConfig};
pub use pipeline::Pipeline;
pub use resolver::{DelayedDispatch, Resolution};

// Testing exports
pub use testing::TestHost;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{Action, ActionType, FluxAction};
    pub use crate::config::DelayedDispatchConfig;
    pub use crate::dispatchable::{ActionKind, ActionTypes, Dispatchable, PromiseAction};
    pub use crate::error::ResolveError;
    pub use crate::host::{Dispatch, GetState, MiddlewareApi, Next};
    pub use crate::logging::ActionLoggerConfig;
    pub use crate::pipeline::Pipeline;
    pub use crate::resolver::{DelayedDispatch, Resolution};
}
