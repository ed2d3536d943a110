//! Tagged variants of everything that can be submitted to the resolver
//!
//! Producers hand the resolver one of four shapes:
//!
//! - **Standard**: a plain [`FluxAction`], forwarded as-is
//! - **Deferred**: a future that settles to an action (or rejects with one)
//! - **Thunk**: a callable that receives `dispatch` and `get_state`
//! - **Promise-carrying**: an action describing an async computation plus
//!   the request/success/failure types to announce around it
//!
//! # Example
//!
//! ```
//! use delayed_dispatch_core::{ActionKind, ActionTypes, Dispatchable, FluxAction, PromiseAction};
//! use serde_json::json;
//!
//! let fetch: Dispatchable<(), ()> = PromiseAction::new(
//!     ActionTypes::new("FETCH", "FETCH_OK", "FETCH_FAIL"),
//!     |_: ()| async { Ok(json!({ "items": [] })) },
//! )
//! .into();
//! assert_eq!(fetch.kind(), ActionKind::PromiseCarrying);
//!
//! let plain: Dispatchable<(), ()> = FluxAction::new("TEST").into();
//! assert_eq!(plain.kind(), ActionKind::Standard);
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::action::{ActionType, Extra, FluxAction};
use crate::host::{Dispatch, GetState};
use crate::resolver::Resolution;

/// A boxed, sendable future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Outcome of a deferred action: the success action, or the rejection value.
pub type Settlement = Result<FluxAction, FluxAction>;

/// An action that is itself a pending computation.
pub type Deferred = BoxFuture<Settlement>;

/// A callable action, invoked with `dispatch` and `get_state`.
pub type Thunk<S, R, Src = ()> =
    Box<dyn FnOnce(Dispatch<S, R, Src>, GetState<S>) -> Resolution<R> + Send + 'static>;

/// Starts the computation of a promise-carrying action.
///
/// Receives the resolver's source and returns a future settling to the
/// payload (`Ok`) or the error value (`Err`).
pub type Producer<Src = ()> =
    Arc<dyn Fn(Src) -> BoxFuture<Result<Value, Value>> + Send + Sync + 'static>;

/// Classification of a submitted action, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Well-formed action, forwarded unchanged
    Standard,
    /// Pending computation whose settlement is re-dispatched
    Awaitable,
    /// Thunk invoked with `dispatch` and `get_state`
    Callable,
    /// Action carrying a computation and its three types
    PromiseCarrying,
    /// Unrecognized plain action, forwarded unchanged
    Plain,
}

impl ActionKind {
    /// Lowercase name, used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Standard => "standard",
            ActionKind::Awaitable => "awaitable",
            ActionKind::Callable => "callable",
            ActionKind::PromiseCarrying => "promise_carrying",
            ActionKind::Plain => "plain",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request, success and failure types of a promise-carrying action.
///
/// Any slot may be empty when that action is of no interest.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionTypes {
    /// Announced before the computation starts
    pub request: Option<ActionType>,
    /// Carries the resolved payload
    pub success: Option<ActionType>,
    /// Carries the caught error
    pub failure: Option<ActionType>,
}

impl ActionTypes {
    /// Create a triple with all three slots populated.
    pub fn new(
        request: impl Into<ActionType>,
        success: impl Into<ActionType>,
        failure: impl Into<ActionType>,
    ) -> Self {
        Self {
            request: Some(request.into()),
            success: Some(success.into()),
            failure: Some(failure.into()),
        }
    }

    /// True when no slot is populated.
    pub fn is_empty(&self) -> bool {
        self.request.is_none() && self.success.is_none() && self.failure.is_none()
    }

    /// Parse a `[request, success, failure]` array of strings or nulls.
    pub fn from_value(value: &Value) -> Option<Self> {
        let [request, success, failure] = value.as_array()?.as_slice() else {
            return None;
        };
        let slot = |value: &Value| match value {
            Value::Null => Some(None),
            Value::String(kind) => Some(Some(ActionType::from(kind.as_str()))),
            _ => None,
        };
        Some(Self {
            request: slot(request)?,
            success: slot(success)?,
            failure: slot(failure)?,
        })
    }

    /// The slots as a JSON array, `null` for empty ones.
    pub fn to_value(&self) -> Value {
        Value::Array(
            [&self.request, &self.success, &self.failure]
                .into_iter()
                .map(|slot| match slot {
                    Some(kind) => Value::String(kind.as_str().to_owned()),
                    None => Value::Null,
                })
                .collect(),
        )
    }
}

impl<T: Into<ActionType>> From<[Option<T>; 3]> for ActionTypes {
    fn from([request, success, failure]: [Option<T>; 3]) -> Self {
        Self {
            request: request.map(Into::into),
            success: success.map(Into::into),
            failure: failure.map(Into::into),
        }
    }
}

/// An action describing an asynchronous computation.
///
/// `promise` and `types` are kept apart from everything else; `rest` holds
/// the remaining properties, which are copied into every derived action.
pub struct PromiseAction<Src = ()> {
    /// Starts the computation
    pub promise: Option<Producer<Src>>,
    /// Request, success and failure types
    pub types: ActionTypes,
    /// All other properties
    pub rest: FluxAction,
}

impl<Src> PromiseAction<Src> {
    /// Create a promise-carrying action from its types and producer.
    pub fn new<F, Fut>(types: impl Into<ActionTypes>, promise: F) -> Self
    where
        F: Fn(Src) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Value>> + Send + 'static,
    {
        Self {
            promise: Some(Arc::new(
                move |source| -> BoxFuture<Result<Value, Value>> { Box::pin(promise(source)) },
            )),
            types: types.into(),
            rest: FluxAction::default(),
        }
    }

    /// Create an action with types but no computation attached.
    pub fn without_promise(types: impl Into<ActionTypes>) -> Self {
        Self {
            promise: None,
            types: types.into(),
            rest: FluxAction::default(),
        }
    }

    /// Set the action's own `type` (replaced in every derived action).
    pub fn with_type(mut self, kind: impl Into<ActionType>) -> Self {
        self.rest.kind = Some(kind.into());
        self
    }

    /// Set a payload carried by the request action.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.rest.payload = Some(payload);
        self
    }

    /// Set a property copied into every derived action.
    ///
    /// `types` replaces the type slots when it parses as a triple and is
    /// ignored otherwise; `promise` is always ignored. Neither reaches the
    /// derived actions.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        match key.as_str() {
            "types" => {
                if let Some(types) = ActionTypes::from_value(&value) {
                    self.types = types;
                }
            }
            "promise" => {}
            _ => self.rest = self.rest.with_extra(key, value),
        }
        self
    }

    /// Whether there is a computation to resolve.
    ///
    /// Requires a producer and at least one populated type slot.
    pub fn has_promise(&self) -> bool {
        self.promise.is_some() && !self.types.is_empty()
    }

    /// Properties shared by the derived actions.
    pub fn extra(&self) -> &Extra {
        &self.rest.extra
    }

    /// Collapse into a plain action, keeping `types` as a property.
    pub fn into_plain(self) -> FluxAction {
        let mut action = self.rest;
        if !self.types.is_empty() {
            action.extra.insert("types".to_owned(), self.types.to_value());
        }
        action
    }
}

impl<Src> Clone for PromiseAction<Src> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
            types: self.types.clone(),
            rest: self.rest.clone(),
        }
    }
}

impl<Src> fmt::Debug for PromiseAction<Src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseAction")
            .field("promise", &self.promise.as_ref().map(|_| "<producer>"))
            .field("types", &self.types)
            .field("rest", &self.rest)
            .finish()
    }
}

/// Anything that can be submitted to the resolver.
///
/// # Type Parameters
///
/// - `S`: Store state returned by `get_state`
/// - `R`: Value returned by the next pipeline stage
/// - `Src`: Source handed to promise producers
pub enum Dispatchable<S, R, Src = ()> {
    /// A plain action object
    Standard(FluxAction),
    /// A pending computation settling to an action
    Deferred(Deferred),
    /// A callable receiving `dispatch` and `get_state`
    Thunk(Thunk<S, R, Src>),
    /// An action carrying a computation to resolve
    PromiseCarrying(PromiseAction<Src>),
}

impl<S, R, Src> Dispatchable<S, R, Src> {
    /// Wrap a future that settles to an action.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Settlement> + Send + 'static,
    {
        Dispatchable::Deferred(Box::pin(future))
    }

    /// Wrap a callable action.
    pub fn thunk<F>(thunk: F) -> Self
    where
        F: FnOnce(Dispatch<S, R, Src>, GetState<S>) -> Resolution<R> + Send + 'static,
    {
        Dispatchable::Thunk(Box::new(thunk))
    }

    /// Classify the action.
    ///
    /// An action carrying a promise or types field is never standard, even
    /// with a `type`.
    pub fn kind(&self) -> ActionKind {
        match self {
            Dispatchable::Standard(action) => plain_kind(action),
            Dispatchable::Deferred(_) => ActionKind::Awaitable,
            Dispatchable::Thunk(_) => ActionKind::Callable,
            Dispatchable::PromiseCarrying(action) if action.has_promise() => {
                ActionKind::PromiseCarrying
            }
            Dispatchable::PromiseCarrying(action)
                if action.promise.is_none() && action.types.is_empty() =>
            {
                plain_kind(&action.rest)
            }
            Dispatchable::PromiseCarrying(_) => ActionKind::Plain,
        }
    }

    /// Name used in log events: the action type when there is one.
    pub fn log_name(&self) -> &str {
        match self {
            Dispatchable::Standard(action) => crate::Action::name(action),
            Dispatchable::Deferred(_) => "<deferred>",
            Dispatchable::Thunk(_) => "<thunk>",
            Dispatchable::PromiseCarrying(action) => action
                .types
                .request
                .as_ref()
                .or(action.rest.kind.as_ref())
                .map(ActionType::as_str)
                .unwrap_or(crate::action::UNTYPED),
        }
    }
}

fn plain_kind(action: &FluxAction) -> ActionKind {
    if action.is_standard() {
        ActionKind::Standard
    } else {
        ActionKind::Plain
    }
}

impl<S, R, Src> From<FluxAction> for Dispatchable<S, R, Src> {
    fn from(action: FluxAction) -> Self {
        Dispatchable::Standard(action)
    }
}

impl<S, R, Src> From<PromiseAction<Src>> for Dispatchable<S, R, Src> {
    fn from(action: PromiseAction<Src>) -> Self {
        Dispatchable::PromiseCarrying(action)
    }
}

impl<S, R, Src> fmt::Debug for Dispatchable<S, R, Src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatchable::Standard(action) => f.debug_tuple("Standard").field(action).finish(),
            Dispatchable::Deferred(_) => f.write_str("Deferred(..)"),
            Dispatchable::Thunk(_) => f.write_str("Thunk(..)"),
            Dispatchable::PromiseCarrying(action) => {
                f.debug_tuple("PromiseCarrying").field(action).finish()
            }
        }
    }
}
