//! Fetch counter - delayed-dispatch demo
//!
//! Wires a [`Pipeline`] in front of a counter reducer and submits one action
//! of each kind:
//! 1. A standard `INCREMENT`
//! 2. A promise-carrying fetch (`FETCH_REQUEST` / `FETCH_SUCCESS` / `FETCH_FAILURE`)
//! 3. A deferred `ADD` that settles after a delay
//! 4. A thunk that reads state and decides what to dispatch
//! 5. A deferred rejection without a type
//!
//! # Usage
//!
//! ```sh
//! RUST_LOG=debug cargo run -p fetch-counter
//! cargo run -p fetch-counter -- --fail --latency-ms 50
//! cargo run -p fetch-counter -- --log-include 'FETCH_*'
//! ```

mod backend;
mod state;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use delayed_dispatch::prelude::*;

use crate::backend::Backend;
use crate::state::{reducer, Counter};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Counter store demonstrating delayed-dispatch action kinds
#[derive(Parser, Debug)]
#[command(name = "fetch-counter")]
#[command(about = "Run each delayed-dispatch action kind against a counter store")]
struct Args {
    /// Make the backend reject fetches
    #[arg(long)]
    fail: bool,

    /// Simulated backend latency in milliseconds
    #[arg(long, default_value = "100")]
    latency_ms: u64,

    /// Amount a successful fetch adds
    #[arg(long, default_value = "10")]
    step: i64,

    /// Resolver configuration as JSON
    #[arg(long)]
    config: Option<String>,

    /// Only log actions matching these patterns (comma-separated globs)
    #[arg(long)]
    log_include: Option<String>,

    /// Skip logging actions matching these patterns (comma-separated globs)
    #[arg(long)]
    log_exclude: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    init_logging()?;

    let logging = ActionLoggerConfig::new(args.log_include.as_deref(), args.log_exclude.as_deref());
    let config = match &args.config {
        Some(json) => DelayedDispatchConfig::from_json(json)?,
        None => DelayedDispatchConfig::default(),
    }
    .with_logging(logging.clone());

    let store = Arc::new(Mutex::new(Counter::default()));
    let reducer_store = Arc::clone(&store);
    let next = Next::new(move |action: FluxAction| {
        let mut state = reducer_store.lock().unwrap_or_else(PoisonError::into_inner);
        reducer(&mut state, &action);
    })
    .logged(logging);
    let reader = Arc::clone(&store);
    let get_state = GetState::new(move || {
        reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    });

    let backend = Backend {
        latency: Duration::from_millis(args.latency_ms),
        fail: args.fail,
        step: args.step,
    };
    let pipeline = Pipeline::with_config(next, get_state, backend, config);

    pipeline.dispatch(FluxAction::new("INCREMENT")).await?;

    let fetch = pipeline.dispatch(PromiseAction::new(
        ActionTypes::new("FETCH_REQUEST", "FETCH_SUCCESS", "FETCH_FAILURE"),
        |backend: Backend| async move { backend.fetch_step().await },
    ));
    tracing::info!(loading = snapshot(&store).loading, "Fetch in flight");

    let delay = Duration::from_millis(args.latency_ms / 2);
    let add = pipeline.dispatch(Dispatchable::deferred(async move {
        tokio::time::sleep(delay).await;
        Ok(FluxAction::new("ADD").with_payload(json!(5)))
    }));

    pipeline.dispatch(even_up()).await?;

    let timeout = pipeline.dispatch(Dispatchable::deferred(async {
        Err(FluxAction::untyped().with_error(json!({ "message": "watchdog fired" })))
    }));

    fetch.await?;
    add.await?;
    timeout.await?;

    let state = snapshot(&store);
    tracing::info!(
        value = state.value,
        fetches = state.fetches,
        error = ?state.last_error,
        "Pipeline drained"
    );
    println!("{state:#?}");
    Ok(())
}

/// Bump the counter to the next even value.
fn even_up() -> Dispatchable<Counter, (), Backend> {
    Dispatchable::<Counter, (), Backend>::thunk(|dispatch, get_state| {
        if get_state.get().value % 2 != 0 {
            return dispatch.call(FluxAction::new("INCREMENT"));
        }
        Resolution::ready(())
    })
}

fn snapshot(store: &Mutex<Counter>) -> Counter {
    store.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn init_logging() -> Result<(), BoxError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use delayed_dispatch::testing::TestHost;

    fn backend() -> Backend {
        Backend {
            latency: Duration::ZERO,
            fail: false,
            step: 1,
        }
    }

    #[test]
    fn test_even_up_increments_odd_counter() {
        let mut host = TestHost::new(Counter {
            value: 3,
            ..Counter::default()
        });
        let resolver = host.resolver_with_source(backend());

        assert!(resolver.resolve(even_up()).is_ready());
        assert_eq!(host.drain_dispatched(), vec![FluxAction::new("INCREMENT")]);
    }

    #[test]
    fn test_even_up_leaves_even_counter() {
        let mut host = TestHost::new(Counter::default());
        let resolver = host.resolver_with_source(backend());

        assert!(resolver.resolve(even_up()).is_ready());
        assert_eq!(host.dispatch_count(), 0);
        assert!(host.drain_dispatched().is_empty());
    }
}
