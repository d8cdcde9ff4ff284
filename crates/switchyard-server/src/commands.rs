// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Dispatch of parsed commands onto the flags engine.

use serde_json::{json, Value};
use switchyard_server_flags::{
	ClientDirectory, FlagQuery, FlagUpdate, FlagsError, FlagsService, OverrideSelector,
	PageRequest, Result,
};

use crate::cli::{ClientCommand, Command, FlagCommand, FlagLookup, OverrideCommand};

/// Runs one command and returns the JSON document to print.
///
/// `Migrate` has nothing left to do once the store is open, so it reports success.
pub async fn execute(
	engine: &dyn FlagsService,
	clients: &dyn ClientDirectory,
	command: Command,
) -> Result<Value> {
	match command {
		Command::Migrate => Ok(json!({ "migrated": true })),
		Command::Flag(cmd) => execute_flag(engine, cmd).await,
		Command::Override(cmd) => execute_override(engine, cmd).await,
		Command::Toggle {
			flag_id,
			client_id,
			environment,
			enabled,
		} => {
			// A blank client id is kept so the engine rejects it after the flag lookup.
			let selector = OverrideSelector::from_raw(client_id, environment);
			let updated = engine
				.update_for_client_or_environment(flag_id, &selector, enabled)
				.await?;
			Ok(json!({ "flag_id": flag_id, "updated": updated, "enabled": enabled }))
		}
		Command::Resolve {
			flag,
			client_id,
			environment,
		} => {
			let active = engine.is_active(&flag, &client_id, environment).await?;
			Ok(json!({
				"flag": flag,
				"client_id": client_id,
				"environment": environment,
				"active": active,
			}))
		}
		Command::Client(ClientCommand::Add { id }) => {
			let id = id.trim();
			let created = clients.register(id).await?;
			Ok(json!({ "client_id": id, "created": created }))
		}
	}
}

async fn execute_flag(engine: &dyn FlagsService, cmd: FlagCommand) -> Result<Value> {
	let value = match cmd {
		FlagCommand::Create {
			name,
			description,
			enabled_by_default,
		} => to_value(&engine.create_flag(&name, description, enabled_by_default).await?)?,
		FlagCommand::Get(FlagLookup { id, name }) => {
			let flag = match (id, name) {
				(Some(id), _) => engine.get_flag(id).await?,
				(None, Some(name)) => engine.get_flag_by_name(&name).await?,
				(None, None) => {
					return Err(FlagsError::FlagNotFound(String::new()).into())
				}
			};
			to_value(&flag)?
		}
		FlagCommand::List {
			name_contains,
			enabled_by_default,
			page,
			size,
		} => {
			let query = FlagQuery::new(name_contains.as_deref(), enabled_by_default);
			let page = engine
				.list_flags(&query, PageRequest::normalize(page, size))
				.await?;
			to_value(&page)?
		}
		FlagCommand::Update {
			id,
			description,
			enabled_by_default,
		} => {
			let update = FlagUpdate {
				description,
				enabled_by_default,
			};
			to_value(&engine.update_flag(id, update).await?)?
		}
		FlagCommand::Delete { id } => {
			engine.delete_flag(id).await?;
			json!({ "deleted": id })
		}
	};
	Ok(value)
}

async fn execute_override(engine: &dyn FlagsService, cmd: OverrideCommand) -> Result<Value> {
	let value = match cmd {
		OverrideCommand::Create {
			flag_id,
			environment,
			client_id,
			enabled,
		} => to_value(
			&engine
				.create_override(flag_id, environment, client_id, enabled)
				.await?,
		)?,
		OverrideCommand::Get { id } => to_value(&engine.get_override(id).await?)?,
		OverrideCommand::Set { id, enabled } => {
			to_value(&engine.set_override_enabled(id, enabled).await?)?
		}
		OverrideCommand::Delete { id } => {
			engine.delete_override(id).await?;
			json!({ "deleted": id })
		}
	};
	Ok(value)
}

fn to_value<T: serde::Serialize>(v: &T) -> Result<Value> {
	Ok(serde_json::to_value(v)?)
}
