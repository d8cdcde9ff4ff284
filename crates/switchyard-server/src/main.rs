// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Switchyard server binary.

use std::sync::Arc;

use clap::Parser;
use switchyard_server::{execute, init_tracing, seed_clients, Args, ErrorResponse};
use switchyard_server_flags::{
	create_pool, run_migrations, FlagsEngine, SqliteClientDirectory, SqliteFlagsRepository,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Load .env file if present, before clap reads env-backed arguments
	dotenvy::dotenv().ok();

	let args = Args::parse();

	let config = match &args.config {
		Some(path) => switchyard_server_config::load_config_with_file(path)?,
		None => switchyard_server_config::load_config()?,
	};

	init_tracing(&config.logging);

	tracing::info!(
		database = %config.database.url,
		max_connections = config.database.max_connections,
		"starting switchyard-server"
	);

	let pool = create_pool(&config.database.url, config.database.max_connections).await?;
	run_migrations(&pool).await?;

	let clients = Arc::new(SqliteClientDirectory::new(pool.clone()));
	seed_clients(clients.as_ref(), &config.clients.seed).await?;

	let engine = FlagsEngine::new(
		Arc::new(SqliteFlagsRepository::new(pool)),
		clients.clone(),
	);

	match execute(&engine, clients.as_ref(), args.command).await {
		Ok(output) => {
			println!("{}", serde_json::to_string_pretty(&output)?);
			Ok(())
		}
		Err(e) => {
			tracing::error!(error = %e, "command failed");
			println!("{}", serde_json::to_string_pretty(&ErrorResponse::from(&e))?);
			std::process::exit(1);
		}
	}
}
