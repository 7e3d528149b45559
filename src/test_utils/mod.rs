//! Test utilities for fpkit
//!
//! This module provides fixtures and fake collaborators for tests:
//! - Temporary Maven repositories populated with small jar archives and POMs
//! - Feature-pack directories with version properties and module templates
//! - A resolver, a transformer and a schema hook that record how they were used
//!
//! Integration tests reach this module through the `test-utils` feature.
//!
//! # Example
//!
//! ```rust,no_run
//! use fpkit::test_utils::MavenRepoFixture;
//!
//! # fn example() -> anyhow::Result<()> {
//! let repo = MavenRepoFixture::new()?;
//! repo.add("org.jboss:foo:1.0.0")?;
//! let resolver = repo.resolver();
//! # Ok(())
//! # }
//! ```

pub mod fakes;
pub mod fixtures;

pub use fakes::{FakeResolver, FakeTransformer, RecordingSchemaProcessor};
pub use fixtures::{FeaturePackFixture, MavenRepoFixture, ModuleTemplateFixture, read_jar_entries, write_jar};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, tests run without logging.
///
/// ```bash
/// RUST_LOG=fpkit=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
