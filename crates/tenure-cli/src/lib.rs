//! # tenure-cli
//!
//! The `tenure` command-line interface over the lifecycle engine.
//!
//! ## Subcommands
//!
//! - `tenure replay` replays a scenario of orders, voids, reverts and pauses
//!   against a fresh in-memory store and prints the resulting chains.
//! - `tenure config` prints the effective engine configuration.
//!
//! ```bash
//! tenure replay crates/tenure-cli/scenarios/package_bundle.yaml
//! tenure --config tenure.yaml config --format json
//! ```

pub mod config;
pub mod replay;
pub mod scenario;
