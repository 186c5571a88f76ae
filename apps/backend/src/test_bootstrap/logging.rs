#![cfg(test)]

//! Logging for the crate's unit tests, installed once per test binary by the
//! `ctor` hook in `lib.rs`.
//!
//! ```bash
//! TEST_LOG=blackjack_backend=debug cargo test -p blackjack-backend
//! ```

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "warn";

/// Filter precedence: `TEST_LOG`, then `RUST_LOG`, then `warn`. Safe to call
/// any number of times.
pub fn init() {
    INITIALIZED.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .map(EnvFilter::new)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .without_time()
            .try_init()
            .ok();
    });
}
