//! Fixture server and end-to-end suite for `trust`.

extern crate self as trust_tests;

mod error;
mod test_server;

#[cfg(test)]
mod request_tests;

pub use error::Error;
pub use test_server::{RecordedRequest, TestServer};
pub use trust_codegen::trust_test;

use tracing_subscriber::EnvFilter;

/// Installs a `RUST_LOG`-driven subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
