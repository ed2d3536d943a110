//! Resolver configuration

use serde::{Deserialize, Serialize};

use crate::action::ActionType;
use crate::logging::ActionLoggerConfig;

/// Type given to a deferred rejection that carries none.
pub const DEFAULT_REJECTION_TYPE: &str = "DELAYED_DISPATCH_REJECTED";

/// Configuration for [`DelayedDispatch`](crate::DelayedDispatch).
///
/// Missing keys take their defaults, so `{}` is a valid config document.
///
/// # Example
///
/// ```
/// use delayed_dispatch_core::DelayedDispatchConfig;
///
/// let config = DelayedDispatchConfig::from_json(
///     r#"{ "rejection_type": "ASYNC_ERROR", "logging": { "exclude_patterns": ["TICK"] } }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.rejection_type, "ASYNC_ERROR");
/// assert!(!config.logging.should_log("TICK"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayedDispatchConfig {
    /// Dispatched for deferred rejections without a `type`
    pub rejection_type: ActionType,
    /// Which actions produce log events
    pub logging: ActionLoggerConfig,
}

impl Default for DelayedDispatchConfig {
    fn default() -> Self {
        Self {
            rejection_type: ActionType::from(DEFAULT_REJECTION_TYPE),
            logging: ActionLoggerConfig::default(),
        }
    }
}

impl DelayedDispatchConfig {
    /// Parse a JSON config document.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Set the rejection fallback type.
    pub fn with_rejection_type(mut self, kind: impl Into<ActionType>) -> Self {
        self.rejection_type = kind.into();
        self
    }

    /// Set the log filter.
    pub fn with_logging(mut self, logging: ActionLoggerConfig) -> Self {
        self.logging = logging;
        self
    }
}
