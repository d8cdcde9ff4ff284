// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command-line boundary for the Switchyard feature flags engine.
//!
//! Each invocation opens the store, applies migrations, seeds the configured
//! clients and runs one engine operation, printing its result as JSON on
//! stdout. Engine failures are printed as an [`ErrorResponse`].

pub mod cli;
pub mod commands;
pub mod logging;
pub mod response;

pub use cli::{Args, Command};
pub use commands::execute;
pub use logging::init_tracing;
pub use response::ErrorResponse;

use switchyard_server_flags::{ClientDirectory, Result};

/// Registers every configured client id. Returns how many were new.
pub async fn seed_clients(directory: &dyn ClientDirectory, seed: &[String]) -> Result<usize> {
	let mut created = 0;
	for client_id in seed {
		if directory.register(client_id).await? {
			created += 1;
		}
	}
	if created > 0 {
		tracing::info!(created, total = seed.len(), "Seeded clients");
	}
	Ok(created)
}
