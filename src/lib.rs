//! fpkit - feature-pack provisioning toolkit
//!
//! Assembles application-server distributions ("feature packs") from Maven
//! artifacts and JBoss Modules descriptors. A feature pack ships module
//! templates whose `resources/artifact` elements reference artifacts
//! symbolically (`${org.jboss:foo}`); provisioning resolves those references
//! against the pack's version properties, installs the artifacts and rewrites
//! the templates to match.
//!
//! # Architecture Overview
//!
//! A run flows through these stages:
//! - **Version policy** turns a reference into a versioned artifact, applying
//!   the pack's `artifact-versions.properties` and externally supplied overrides
//! - **Resolution** fetches content through an [`ArtifactResolver`](resolver::ArtifactResolver),
//!   optionally from a bulk cache filled by one batch call up front
//! - **Installation** copies the content into the server (fat) or into a
//!   generated Maven repository (thin), optionally through a bytecode transformer
//!   whose outcomes are remembered for the rest of the run
//! - **Template rewriting** replaces every artifact element with a
//!   `resource-root` (fat) or a concrete coordinate (thin)
//! - **Recording** appends every install to an artifact manifest
//!
//! Shaded-model descriptors go through the same resolution and installation
//! stages and are merged into one executable archive.
//!
//! # Modules
//!
//! ## Domain
//! - [`maven`] - Coordinates, Maven version ordering and ranges, repository layout
//! - [`versions`] - Version properties, overrides, channel modes, placeholders, resolution policy
//! - [`resolver`] - Resolver trait, local repository resolver, bulk cache
//! - [`installer`] - Fat/thin installer strategy with orthogonal transformation policy
//! - [`template`] - Module descriptors as editable values and the template processor
//! - [`shaded`] - Shaded-model descriptors and archive assembly
//! - [`recorder`] - Artifact manifest ledger
//! - [`schema`] - Schema extraction hook
//! - [`provisioning`] - Run-scoped context and the run driver
//!
//! ## Supporting Modules
//! - [`cli`] - Command-line interface
//! - [`config`] - TOML run configuration
//! - [`core`] - Error taxonomy and user-facing error reporting
//! - [`constants`] - File names, defaults and environment variables
//! - [`utils`] - Scratch-then-replace file operations, checksums, progress bars
//!
//! # Example
//!
//! ```rust,no_run
//! use fpkit::config::ProvisioningConfig;
//! use fpkit::provisioning::Provisioner;
//! use fpkit::resolver::LocalRepositoryResolver;
//! use fpkit::schema::SchemaExtractor;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = ProvisioningConfig::load(Path::new("fpkit.toml"))?;
//! let resolver = LocalRepositoryResolver::new(&config.local_repository);
//! let mut schemas = SchemaExtractor::new(&config.staging_dir);
//!
//! let report = Provisioner::new(&config).run(&resolver, None, &mut schemas)?;
//! println!("{} templates, {} artifacts", report.templates, report.artifacts);
//! # Ok(())
//! # }
//! ```

// Core functionality
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;

// Provisioning domain
pub mod installer;
pub mod maven;
pub mod provisioning;
pub mod recorder;
pub mod resolver;
pub mod schema;
pub mod shaded;
pub mod template;
pub mod versions;

// Supporting modules
pub mod utils;

// Test utilities (only compiled in test mode)
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
