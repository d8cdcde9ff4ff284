// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Switchyard feature flags engine.
//!
//! This crate holds the pure half of the engine: flags, per-environment
//! overrides, override selection, resolution, and listing filters. It performs
//! no I/O; persistence and the client directory live in `switchyard-server-flags`.
//!
//! # Example
//!
//! ```
//! use switchyard_flags_core::{is_active, match_overrides, Environment, Flag, Override, OverrideSelector};
//!
//! let mut flag = Flag::new("dark_mode", None, false).unwrap();
//! flag.overrides.push(Override::new(flag.id, Environment::Dev, Some("A".into()), true));
//! flag.overrides.push(Override::new(flag.id, Environment::Prod, Some("B".into()), false));
//!
//! assert!(is_active(&flag, Environment::Dev));
//! assert!(!is_active(&flag, Environment::Prod));
//!
//! let selector = OverrideSelector::for_toggle(Some("B"), None).unwrap();
//! assert_eq!(match_overrides(&flag.overrides, &selector).len(), 1);
//! ```

pub mod environment;
pub mod error;
pub mod flag;
pub mod listing;
pub mod resolution;
pub mod selector;

pub use environment::Environment;
pub use error::{FlagsError, Result};
pub use flag::{Flag, FlagId, FlagUpdate, Override, OverrideId};
pub use listing::{FlagQuery, Page, PageRequest};
pub use resolution::{active_override, is_active};
pub use selector::{match_overrides, OverrideSelector};
