//! Standard action model
//!
//! A standard action is the minimal well-formed unit of intent flowing through
//! the pipeline: a `type` label plus an optional, mutually exclusive `payload`
//! or `error`. Any other properties travel along in [`FluxAction::extra`].

use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Additional action properties, preserved across derived actions.
pub type Extra = Map<String, Value>;

/// Name reported for actions without a `type`.
pub const UNTYPED: &str = "<untyped>";

/// Trait for actions that can be logged and filtered by name
///
/// Actions should be:
/// - Clone: Actions may be logged or forwarded to multiple stages
/// - Debug: For debugging and logging
/// - Send + 'static: Settlements are delivered from spawned tasks
pub trait Action: Clone + Debug + Send + 'static {
    /// Get the action name for logging and filtering
    fn name(&self) -> &str;
}

/// Label identifying what an action means.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionType(String);

impl ActionType {
    /// Create a new action type.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the label.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActionType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ActionType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&ActionType> for ActionType {
    fn from(t: &ActionType) -> Self {
        t.clone()
    }
}

impl PartialEq<str> for ActionType {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ActionType {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A plain action object.
///
/// Serializes as a flat JSON object, so `{"type": "ADD", "payload": 1, "id": 7}`
/// round-trips with `id` landing in [`extra`](FluxAction::extra).
///
/// # Example
///
/// ```
/// use delayed_dispatch_core::FluxAction;
/// use serde_json::json;
///
/// let action = FluxAction::new("ADD")
///     .with_payload(json!(1))
///     .with_extra("id", json!(7));
///
/// assert!(action.is_standard());
/// assert_eq!(
///     serde_json::to_value(&action).unwrap(),
///     json!({ "type": "ADD", "payload": 1, "id": 7 })
/// );
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FluxAction {
    /// Action label; `None` when the producer left it null
    #[serde(rename = "type", default)]
    pub kind: Option<ActionType>,
    /// Result data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Failure value, carried verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    /// Every other property
    #[serde(flatten)]
    pub extra: Extra,
}

impl FluxAction {
    /// Create an action with the given type and nothing else.
    pub fn new(kind: impl Into<ActionType>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Default::default()
        }
    }

    /// Create an action without a type.
    pub fn untyped() -> Self {
        Self::default()
    }

    /// Replace the action type.
    pub fn with_kind(mut self, kind: Option<ActionType>) -> Self {
        self.kind = kind;
        self
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Set the error.
    pub fn with_error(mut self, error: Value) -> Self {
        self.error = Some(error);
        self
    }

    /// Set an arbitrary property.
    ///
    /// Reserved keys go to their dedicated fields: a string `type` sets the
    /// label, any other `type` value clears it.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        match key.as_str() {
            "type" => self.kind = value.as_str().map(ActionType::from),
            "payload" => self.payload = Some(value),
            "error" => self.error = Some(value),
            _ => {
                self.extra.insert(key, value);
            }
        }
        self
    }

    /// Whether this action has the minimal standard shape.
    ///
    /// Requires a non-null `type`, and `payload`/`error` must not both be set.
    pub fn is_standard(&self) -> bool {
        self.kind.is_some() && !(self.payload.is_some() && self.error.is_some())
    }

    /// Whether this is an error action.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Label as a string slice, if any.
    pub fn kind_str(&self) -> Option<&str> {
        self.kind.as_ref().map(ActionType::as_str)
    }

    /// Look up a property by key, reserved keys included.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match key {
            "payload" => self.payload.as_ref(),
            "error" => self.error.as_ref(),
            _ => self.extra.get(key),
        }
    }
}

impl Action for FluxAction {
    fn name(&self) -> &str {
        self.kind_str().unwrap_or(UNTYPED)
    }
}

impl From<ActionType> for FluxAction {
    fn from(kind: ActionType) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }
}
