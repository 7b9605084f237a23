// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// ============================================================================
// Crate Documentation
// ============================================================================

//! # stratus
//!
//! A declarative deployment tool for Azure static-website hosting stacks.
//!
//! ## Overview
//!
//! stratus provisions a complete static-website stack on Azure from one
//! YAML file:
//!
//! - Resource group, storage account, and static-website hosting
//! - A private blob container holding the zipped site package
//! - A time-boxed, read-only SAS URL for the package
//! - An App Service Plan and a Web App running the site from the package
//!
//! ## Architecture
//!
//! The stack is a **deployment graph**: every resource is an async node
//! producing a deferred [`graph::Output`], and data edges between nodes
//! (account name, container name, SAS token) are the only ordering. The
//! graph is walked concurrently; the first failing node aborts the
//! evaluation.
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing, validation, and hashing
//! - [`graph`]: Deferred values and the concurrent graph context
//! - [`stack`]: The static-website deployment graph definition
//! - [`azure`]: ARM client, provisioning operations, SAS derivation
//! - [`package`]: Site packaging into the uploaded zip archive
//! - [`planner`]: Diff computation and deployment plans
//! - [`state`]: State storage and locking
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! project:
//!   name: clco-demo
//!   environment: dev
//!   location: eastus
//!
//! storage:
//!   container: webcontainer
//!   blob: website.zip
//!
//! site:
//!   source: ./site
//!
//! app_service:
//!   tier: Basic
//!   size: B1
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod azure;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod package;
pub mod planner;
pub mod stack;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use azure::{ArmClient, AzureProvisioner, SasWindow, StackObserver, StackProvisioner};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigHasher, ConfigParser, ConfigValidator, DeployConfig};
pub use error::{Result, StratusError};
pub use graph::{DeploymentContext, Output};
pub use package::SitePackage;
pub use planner::{DeploymentPlan, DiffEngine};
pub use stack::{StackOutputs, StackResource, StaticSiteStack};
pub use state::{DeploymentState, LocalStateStore, StateStore};
