// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Feature flags engine and persistence for Switchyard.
//!
//! # Architecture
//!
//! - `repository` - SQLite storage for flags and their overrides
//! - `clients` - Known-client lookups used by resolution
//! - `service` - The engine: resolution, toggles, listing and lifecycle
//! - `db` - Pool construction and migrations
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use switchyard_server_flags::{
//!     Environment, FlagsEngine, FlagsService, SqliteClientDirectory, SqliteFlagsRepository,
//! };
//!
//! let engine = FlagsEngine::new(
//!     Arc::new(SqliteFlagsRepository::new(pool.clone())),
//!     Arc::new(SqliteClientDirectory::new(pool)),
//! );
//!
//! let flag = engine.create_flag("dark_mode", None, false).await?;
//! engine.create_override(flag.id, Environment::Prod, Some("A".into()), true).await?;
//! assert!(engine.is_active("dark_mode", "A", Environment::Prod).await?);
//! ```

pub mod clients;
pub mod db;
pub mod error;
pub mod repository;
pub mod service;
pub mod testing;

pub use clients::{ClientDirectory, SqliteClientDirectory, StaticClientDirectory};
pub use db::{create_pool, run_migrations};
pub use error::{FlagsServerError, Result};
pub use repository::{FlagsRepository, SqliteFlagsRepository};
pub use service::{FlagsEngine, FlagsService};

// Re-export core types for convenience
pub use switchyard_flags_core::*;
