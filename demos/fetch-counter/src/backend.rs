use std::time::Duration;

use serde_json::{json, Value};

/// Simulated remote counter service, handed to every promise producer.
#[derive(Debug, Clone)]
pub struct Backend {
    pub latency: Duration,
    pub fail: bool,
    pub step: i64,
}

impl Backend {
    /// Fetch the amount to add to the counter.
    pub async fn fetch_step(&self) -> Result<Value, Value> {
        tokio::time::sleep(self.latency).await;
        if self.fail {
            tracing::warn!("backend refused request");
            return Err(json!({ "message": "backend unavailable", "status": 503 }));
        }
        Ok(json!(self.step))
    }
}
