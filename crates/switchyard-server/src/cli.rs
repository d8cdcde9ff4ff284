// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Command-line surface of the server binary.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use switchyard_server_flags::{Environment, FlagId, OverrideId};

/// Switchyard - feature flags with per-environment, per-client overrides.
#[derive(Parser, Debug)]
#[command(
	name = "switchyard-server",
	about = "Switchyard feature flags engine",
	version
)]
pub struct Args {
	/// Config file to read instead of /etc/switchyard/server.toml
	#[arg(long, global = true, env = "SWITCHYARD_SERVER_CONFIG")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Apply database migrations and exit
	Migrate,

	/// Manage flags
	#[command(subcommand)]
	Flag(FlagCommand),

	/// Manage overrides
	#[command(subcommand)]
	Override(OverrideCommand),

	/// Set `enabled` on every override of a flag matching a client and/or environment
	Toggle {
		#[arg(long)]
		flag_id: FlagId,
		#[arg(long)]
		client_id: Option<String>,
		#[arg(long)]
		environment: Option<Environment>,
		#[arg(long, action = clap::ArgAction::Set)]
		enabled: bool,
	},

	/// Report whether a flag is active for a client in an environment
	Resolve {
		#[arg(long)]
		flag: String,
		#[arg(long)]
		client_id: String,
		#[arg(long)]
		environment: Environment,
	},

	/// Manage known clients
	#[command(subcommand)]
	Client(ClientCommand),
}

#[derive(Subcommand, Debug)]
pub enum FlagCommand {
	Create {
		#[arg(long)]
		name: String,
		#[arg(long)]
		description: Option<String>,
		#[arg(long)]
		enabled_by_default: bool,
	},
	Get(FlagLookup),
	List {
		/// Case-insensitive substring of the flag name
		#[arg(long)]
		name_contains: Option<String>,
		#[arg(long)]
		enabled_by_default: Option<bool>,
		#[arg(long, allow_negative_numbers = true)]
		page: Option<i64>,
		#[arg(long, allow_negative_numbers = true)]
		size: Option<i64>,
	},
	Update {
		#[arg(long)]
		id: FlagId,
		/// New description; an empty value clears it
		#[arg(long)]
		description: Option<String>,
		#[arg(long)]
		enabled_by_default: Option<bool>,
	},
	Delete {
		#[arg(long)]
		id: FlagId,
	},
}

#[derive(ClapArgs, Debug)]
#[group(required = true, multiple = false)]
pub struct FlagLookup {
	#[arg(long)]
	pub id: Option<FlagId>,
	#[arg(long)]
	pub name: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum OverrideCommand {
	Create {
		#[arg(long)]
		flag_id: FlagId,
		#[arg(long)]
		environment: Environment,
		#[arg(long)]
		client_id: Option<String>,
		#[arg(long)]
		enabled: bool,
	},
	Get {
		#[arg(long)]
		id: OverrideId,
	},
	/// Set `enabled` on a single override
	Set {
		#[arg(long)]
		id: OverrideId,
		#[arg(long, action = clap::ArgAction::Set)]
		enabled: bool,
	},
	Delete {
		#[arg(long)]
		id: OverrideId,
	},
}

#[derive(Subcommand, Debug)]
pub enum ClientCommand {
	/// Register a client id; registering twice is harmless
	Add {
		#[arg(value_parser = non_blank)]
		id: String,
	},
}

fn non_blank(raw: &str) -> Result<String, String> {
	let trimmed = raw.trim();
	if trimmed.is_empty() {
		return Err("client id must not be blank".to_string());
	}
	Ok(trimmed.to_string())
}
