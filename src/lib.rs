//! Vault Breakdown - inventory aggregation and grouping
//!
//! Fetches a player's inventory from the Bungie.net platform API, joins it
//! against the manifest definitions and groups the result into an
//! arbitrary-depth tree by item attributes.
//!
//! ## Data flow
//! RequestGateway -> AsyncResource -> DataPipeline -> AttributeIndex -> breakdown
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vault_breakdown::{config::AppConfig, context::AppContext};
//!
//! # async fn run() -> anyhow::Result<()> {
//! vault_breakdown::telemetry::init_tracing();
//! let context = AppContext::new(AppConfig::from_env()?)?;
//! let view = context.load_view().await?;
//! for node in view.breakdown()? {
//!     println!("{} ({})", node.name, node.title.count_label());
//! }
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Authentication and client-local storage
pub mod auth;

// HTTP calling conventions
pub mod gateway;

// Single-flight remote values
pub mod resource;

// Dependent fetches and item derivation
pub mod pipeline;

// Attribute index and recursive grouping
pub mod breakdown;
pub mod index;

pub mod config;
pub mod context;
pub mod telemetry;

pub use error::{Error, Result};
