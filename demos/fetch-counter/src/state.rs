use serde_json::Value;

use delayed_dispatch::FluxAction;

/// Counter store state
#[derive(Debug, Clone, Default)]
pub struct Counter {
    pub value: i64,
    pub loading: bool,
    pub fetches: u32,
    pub last_error: Option<String>,
}

/// Apply one forwarded action.
pub fn reducer(state: &mut Counter, action: &FluxAction) {
    match action.kind_str() {
        Some("INCREMENT") => state.value += 1,
        Some("ADD") => state.value += amount(action.payload.as_ref()),
        Some("FETCH_REQUEST") => {
            state.loading = true;
            state.last_error = None;
        }
        Some("FETCH_SUCCESS") => {
            state.loading = false;
            state.fetches += 1;
            state.value += amount(action.payload.as_ref());
        }
        Some("FETCH_FAILURE") => {
            state.loading = false;
            state.last_error = action.error.as_ref().map(describe);
        }
        Some(kind) if action.is_error() => {
            let detail = action.error.as_ref().map(describe).unwrap_or_default();
            state.last_error = Some(format!("{kind}: {detail}"));
        }
        _ => {}
    }
}

fn amount(payload: Option<&Value>) -> i64 {
    payload.and_then(Value::as_i64).unwrap_or(0)
}

fn describe(error: &Value) -> String {
    match error.get("message").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => error.to_string(),
    }
}
