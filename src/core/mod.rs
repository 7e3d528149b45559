//! Core types for fpkit
//!
//! This module holds the error taxonomy shared by every provisioning
//! component:
//! - [`FpkitError`] - enumerated failure kinds (configuration, resolution,
//!   transformation, I/O, bookkeeping)
//! - [`ErrorContext`] - user-facing wrapper with suggestions
//! - [`user_friendly_error`] - converts any `anyhow::Error` for CLI display

pub mod error;


pub use error::{ErrorContext, FpkitError, user_friendly_error};
