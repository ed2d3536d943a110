//! Pattern-based filtering for action log events
//!
//! The resolver and [`Next::logged`](crate::Next::logged) emit `tracing`
//! events per action. [`ActionLoggerConfig`] decides which action names are
//! worth an event, using glob patterns.
//!
//! # Example
//!
//! ```
//! use delayed_dispatch_core::ActionLoggerConfig;
//!
//! // Only log fetch lifecycles, but skip their request announcements
//! let config = ActionLoggerConfig::new(Some("FETCH*"), Some("*_REQUEST"));
//! assert!(config.should_log("FETCH_USER_SUCCESS"));
//! assert!(!config.should_log("FETCH_USER_REQUEST"));
//! assert!(!config.should_log("TICK"));
//! ```

use serde::{Deserialize, Serialize};

/// Include/exclude filter over action names.
///
/// Patterns support:
/// - `*` matches any sequence of characters
/// - `?` matches any single character
/// - Literal text matches exactly
///
/// # Examples
///
/// - `FETCH_*` matches FETCH_USER, FETCH_USER_SUCCESS, etc.
/// - `*_FAIL` matches any failure action
/// - `<thunk>` matches callable actions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionLoggerConfig {
    /// When set, names must match one of these
    pub include_patterns: Vec<String>,
    /// Names matching any of these are dropped, after `include_patterns`
    pub exclude_patterns: Vec<String>,
}

impl ActionLoggerConfig {
    /// Build from comma-separated pattern lists, e.g. `"FETCH_*,SAVE"`.
    ///
    /// `None` leaves the corresponding list empty.
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include_patterns: include.map(split_patterns).unwrap_or_default(),
            exclude_patterns: exclude.map(split_patterns).unwrap_or_default(),
        }
    }

    /// Build from already-split pattern lists.
    pub fn with_patterns(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include_patterns: include,
            exclude_patterns: exclude,
        }
    }

    /// Whether `action_name` passes the filter.
    pub fn should_log(&self, action_name: &str) -> bool {
        if !self.include_patterns.is_empty()
            && !self
                .include_patterns
                .iter()
                .any(|p| glob_match(p, action_name))
        {
            return false;
        }

        !self
            .exclude_patterns
            .iter()
            .any(|p| glob_match(p, action_name))
    }
}

fn split_patterns(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Glob match over the whole of `text`: `*` spans any run, `?` one character.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    // Position of the last `*` and the text index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < text.len() {
        match pattern.get(pi) {
            Some('*') => {
                backtrack = Some((pi, ti));
                pi += 1;
            }
            Some(&c) if c == '?' || c == text[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match backtrack {
                Some((star_pi, star_ti)) => {
                    pi = star_pi + 1;
                    ti = star_ti + 1;
                    backtrack = Some((star_pi, star_ti + 1));
                }
                None => return false,
            },
        }
    }

    pattern[pi..].iter().all(|&c| c == '*')
}
