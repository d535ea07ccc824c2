//! Shared fixtures for the integration tests: tracing setup and list helpers.
//!
//! ```rust,ignore
//! mod common;
//!
//! #[test]
//! fn my_test() {
//!     common::init_tracing();
//!     let (list, values) = common::filled_list(8);
//!     common::assert_values(&list, &[0, 1, 2, 3, 4, 5, 6, 7]);
//! }
//! ```
//!
//! # Logging
//!
//! Library events are emitted only with the `tracing` feature. Environment:
//! - `RUST_LOG`: filter directives (e.g. `weaklist=trace`)
//! - `WEAKLIST_LOG_DIR`: log directory (default `logs/`)
//! - `WEAKLIST_LOG_CONSOLE`: `0` disables console output
//!
//! Events go to `logs/weaklist.jsonl` as NDJSON:
//!
//! ```bash
//! # Follow one node's lifecycle by insert version
//! jq 'select(.fields.version == 16)' logs/weaklist.jsonl
//!
//! # Corruption reports only
//! jq 'select(.level == "ERROR")' logs/weaklist.jsonl
//! ```

#![allow(dead_code)]

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Once;

use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};
use weaklist::{Tracked, WeakList};

// ============================================================================
//  Tracing
// ============================================================================

static INIT: Once = Once::new();

/// Install the subscriber once per test binary.
pub fn init_tracing() {
    INIT.call_once(install_subscriber);
}

struct LogSettings {
    dir: PathBuf,
    console: bool,
}

impl LogSettings {
    fn from_env() -> Self {
        Self {
            dir: env::var("WEAKLIST_LOG_DIR").map_or_else(|_| PathBuf::from("logs"), PathBuf::from),
            console: !env::var("WEAKLIST_LOG_CONSOLE").is_ok_and(|v| v == "0"),
        }
    }
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
}

#[expect(clippy::expect_used)]
fn install_subscriber() {
    let settings = LogSettings::from_env();
    std::fs::create_dir_all(&settings.dir).expect("create log directory");

    // Append: nextest runs each test in its own process.
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(settings.dir.join("weaklist.jsonl"))
        .expect("open log file");

    let console = settings.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_thread_names(true)
            .with_target(true)
            .with_line_number(true)
            .compact()
            .with_filter(filter())
    });

    let json = tracing_subscriber::fmt::layer()
        .with_writer(std::sync::Mutex::new(file))
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .json()
        .with_filter(filter());

    // try_init: another test in the same binary may have won the race.
    let _ = Registry::default().with(console).with(json).try_init();
}

// ============================================================================
//  List fixtures
// ============================================================================

/// A list holding `0..n` in order, plus the strong handles keeping them alive.
pub fn filled_list(n: u32) -> (WeakList<u32>, Vec<Tracked<u32>>) {
    let list = WeakList::new();
    let values: Vec<_> = (0..n).map(Tracked::new).collect();
    for v in &values {
        list.add_last(v).unwrap();
    }
    (list, values)
}

/// Live values front to back.
pub fn values_of(list: &WeakList<u32>) -> Vec<u32> {
    list.to_vec().unwrap().iter().map(|v| **v).collect()
}

/// Assert the live values and that the structure is sound.
pub fn assert_values(list: &WeakList<u32>, expected: &[u32]) {
    assert_eq!(values_of(list), expected);
    assert_eq!(list.count().unwrap(), expected.len());
    list.validate().unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_init() {
        init_tracing();
        tracing::info!("tracing initialized");
        tracing::debug!(version = 42, removed = false, "debug event");
    }
}
