//! Error handling for fpkit
//!
//! This module provides the error taxonomy for feature-pack provisioning and
//! the user-facing reporting built on top of it. The error system follows two
//! principles:
//! 1. **Strongly-typed errors** so callers (and tests) can match on the failure kind
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Categories
//!
//! - **Configuration**: [`FpkitError::VersionNotFound`], [`FpkitError::UnknownOverride`],
//!   [`FpkitError::ChannelResolutionUnsupported`], [`FpkitError::InvalidCoordinates`],
//!   [`FpkitError::PropertiesParse`], [`FpkitError::ConfigError`]
//! - **Resolution**: [`FpkitError::ArtifactNotFound`]
//! - **Transformation**: [`FpkitError::TransformFailed`]
//! - **I/O**: [`FpkitError::ArtifactInstallError`], [`FpkitError::IoError`]
//! - **Templates and descriptors**: [`FpkitError::TemplateError`]
//! - **Bookkeeping**: [`FpkitError::RecorderError`]
//!
//! Everything except recorder failures aborts the provisioning run. Recorder
//! failures are only fatal when the run is configured that way.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fpkit::core::{FpkitError, user_friendly_error};
//!
//! let error = FpkitError::VersionNotFound {
//!     key: "org.jboss:foo".to_string(),
//!     feature_pack: "wildfly-core".to_string(),
//! };
//! let context = user_friendly_error(anyhow::Error::from(error));
//! context.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for fpkit operations.
///
/// Variants carry the artifact coordinates or paths involved so a failed run
/// can be diagnosed from the message alone.
#[derive(Error, Debug)]
pub enum FpkitError {
    /// An artifact reference has no version and none is known for it.
    ///
    /// Raised when a template or descriptor references `group:artifact`
    /// without a version and the feature pack's version properties do not
    /// list it either.
    #[error("Cannot resolve version for '{key}' in feature pack '{feature_pack}'")]
    VersionNotFound {
        /// The `group:artifact` lookup key
        key: String,
        /// Feature pack whose version properties were consulted
        feature_pack: String,
    },

    /// A version override names an artifact no feature pack declares.
    #[error("Overridden artifact '{key}' is not declared by any feature pack")]
    UnknownOverride {
        /// The `group:artifact` key of the override
        key: String,
    },

    /// Channel resolution is required but the resolver cannot do it.
    #[error("Artifact '{coords}' requires channel resolution, which the configured resolver does not support")]
    ChannelResolutionUnsupported {
        /// Coordinates of the artifact being resolved
        coords: String,
    },

    /// An artifact reference could not be parsed.
    #[error("Invalid artifact coordinates '{coords}': {reason}")]
    InvalidCoordinates {
        /// The offending coordinate string
        coords: String,
        /// Why parsing failed
        reason: String,
    },

    /// A version-properties or channel-properties resource is malformed.
    #[error("Invalid properties file {file} at line {line}: {reason}")]
    PropertiesParse {
        /// Path of the properties file
        file: String,
        /// 1-based line number
        line: usize,
        /// Why the line was rejected
        reason: String,
    },

    /// Run configuration is invalid.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// The repository could not supply an artifact.
    #[error("Failed to resolve artifact '{coords}': {reason}")]
    ArtifactNotFound {
        /// Coordinates of the artifact
        coords: String,
        /// Resolver-provided reason
        reason: String,
    },

    /// The external transformer failed.
    ///
    /// A transformer reporting that nothing needed rewriting is not an error;
    /// that outcome is tracked through the exclusion set.
    #[error("Transformation of '{coords}' failed: {reason}")]
    TransformFailed {
        /// Coordinates of the artifact
        coords: String,
        /// Failure detail
        reason: String,
    },

    /// Copying or writing an artifact failed.
    #[error("Failed to install artifact '{coords}' from {source_path} to {target}: {reason}")]
    ArtifactInstallError {
        /// Coordinates of the artifact
        coords: String,
        /// Path the content was read from
        source_path: String,
        /// Path the content was written to
        target: String,
        /// Underlying failure
        reason: String,
    },

    /// A module template or shaded-model descriptor is malformed.
    #[error("Invalid descriptor {path}: {reason}")]
    TemplateError {
        /// Path of the descriptor
        path: String,
        /// Parse or rewrite failure detail
        reason: String,
    },

    /// Writing the artifact manifest or its side cache failed.
    #[error("Artifact recorder failure: {reason}")]
    RecorderError {
        /// Failure detail
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for FpkitError {
    fn clone(&self) -> Self {
        match self {
            Self::VersionNotFound {
                key,
                feature_pack,
            } => Self::VersionNotFound {
                key: key.clone(),
                feature_pack: feature_pack.clone(),
            },
            Self::UnknownOverride {
                key,
            } => Self::UnknownOverride {
                key: key.clone(),
            },
            Self::ChannelResolutionUnsupported {
                coords,
            } => Self::ChannelResolutionUnsupported {
                coords: coords.clone(),
            },
            Self::InvalidCoordinates {
                coords,
                reason,
            } => Self::InvalidCoordinates {
                coords: coords.clone(),
                reason: reason.clone(),
            },
            Self::PropertiesParse {
                file,
                line,
                reason,
            } => Self::PropertiesParse {
                file: file.clone(),
                line: *line,
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::ArtifactNotFound {
                coords,
                reason,
            } => Self::ArtifactNotFound {
                coords: coords.clone(),
                reason: reason.clone(),
            },
            Self::TransformFailed {
                coords,
                reason,
            } => Self::TransformFailed {
                coords: coords.clone(),
                reason: reason.clone(),
            },
            Self::ArtifactInstallError {
                coords,
                source_path,
                target,
                reason,
            } => Self::ArtifactInstallError {
                coords: coords.clone(),
                source_path: source_path.clone(),
                target: target.clone(),
                reason: reason.clone(),
            },
            Self::TemplateError {
                path,
                reason,
            } => Self::TemplateError {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::RecorderError {
                reason,
            } => Self::RecorderError {
                reason: reason.clone(),
            },
            // For errors that don't implement Clone, convert to Other
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// `ErrorContext` wraps a [`FpkitError`] and adds optional suggestions for
/// resolution and additional details.
///
/// When displayed, errors show:
/// 1. **Error**: The main error message in red
/// 2. **Details**: Additional context about the error in yellow (optional)
/// 3. **Suggestion**: Actionable steps to resolve the issue in green (optional)
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying fpkit error
    pub error: FpkitError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from a [`FpkitError`]
    #[must_use]
    pub const fn new(error: FpkitError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`FpkitError`] anywhere in the error chain, plain
/// [`std::io::Error`]s and TOML parse errors. Anything else is reported with
/// its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(fpkit_error) = cause.downcast_ref::<FpkitError>() {
            return create_error_context(fpkit_error.clone(), &error);
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(FpkitError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of the provisioning configuration file")
        .with_details("TOML parsing errors are usually caused by missing quotes or mismatched brackets");
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(FpkitError::Other {
            message: chained_message(&error),
        })
        .with_suggestion("Check ownership and permissions of the staging and repository directories");
    }

    ErrorContext::new(FpkitError::Other {
        message: chained_message(&error),
    })
}

fn chained_message(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    message
}

/// Map each [`FpkitError`] variant to an [`ErrorContext`] with tailored suggestions.
fn create_error_context(error: FpkitError, full: &anyhow::Error) -> ErrorContext {
    let (suggestion, details) = match &error {
        FpkitError::VersionNotFound {
            key,
            feature_pack,
        } => (
            Some(format!(
                "Add '{key}=<group>:<artifact>:<version>' to artifact-versions.properties of '{feature_pack}', or give the version explicitly"
            )),
            Some("Artifact references without a version are looked up in the feature pack's version properties".to_string()),
        ),
        FpkitError::UnknownOverride { .. } => (
            Some("Remove the override or fix its key; keys must be 'group:artifact' of an artifact a feature pack declares".to_string()),
            Some("Overrides can only replace versions that already exist, they cannot introduce new artifacts".to_string()),
        ),
        FpkitError::ChannelResolutionUnsupported { .. } => (
            Some("Provision with a channel-aware resolver or set resolution=NOT_REQUIRED in channel.properties".to_string()),
            Some("The feature pack declares that its artifacts must be resolved through a channel".to_string()),
        ),
        FpkitError::ArtifactNotFound { .. } => (
            Some("Check that the artifact is present in the local repository (local-repository in fpkit.toml)".to_string()),
            Some(chained_message(full)),
        ),
        FpkitError::TransformFailed { .. } => (
            Some("Run the transformer manually on the artifact, or add it to transform.excluded-artifacts".to_string()),
            Some(chained_message(full)),
        ),
        FpkitError::ArtifactInstallError { .. } => (
            Some("Check free disk space and permissions of the staging directory".to_string()),
            Some(chained_message(full)),
        ),
        FpkitError::PropertiesParse { .. } => (
            Some("Every non-comment line must have the form 'group:artifact=group:artifact:version'".to_string()),
            None,
        ),
        FpkitError::RecorderError { .. } => (
            Some("Set recorder.fail-on-error = false to keep provisioning when the manifest cannot be written".to_string()),
            None,
        ),
        _ => (None, Some(chained_message(full))),
    };

    ErrorContext {
        error,
        suggestion,
        details,
    }
}
