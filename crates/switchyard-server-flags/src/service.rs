// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The flags engine: resolution, toggles, listing and lifecycle operations.
//!
//! Callers depend on [`FlagsService`]; [`FlagsEngine`] is the implementation
//! backed by an injected [`FlagsRepository`] and [`ClientDirectory`]. Each
//! operation is a single read/modify/write against the store. There is no
//! caching and no application-level locking, so concurrent toggles on
//! overlapping overrides are last-writer-wins per row.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use switchyard_flags_core::{
	active_override, match_overrides, Environment, Flag, FlagId, FlagQuery, FlagUpdate, FlagsError,
	Override, OverrideId, OverrideSelector, Page, PageRequest,
};

use crate::clients::ClientDirectory;
use crate::error::Result;
use crate::repository::FlagsRepository;

/// Every operation the flags engine exposes to its boundary layer.
#[async_trait]
pub trait FlagsService: Send + Sync {
	/// Creates a flag. Fails with `FlagAlreadyExists` on a duplicate name.
	async fn create_flag(
		&self,
		name: &str,
		description: Option<String>,
		enabled_by_default: bool,
	) -> Result<Flag>;

	async fn get_flag(&self, id: FlagId) -> Result<Flag>;

	async fn get_flag_by_name(&self, name: &str) -> Result<Flag>;

	async fn update_flag(&self, id: FlagId, update: FlagUpdate) -> Result<Flag>;

	/// Deletes a flag together with all of its overrides.
	async fn delete_flag(&self, id: FlagId) -> Result<()>;

	async fn list_flags(&self, query: &FlagQuery, page: PageRequest) -> Result<Page<Flag>>;

	/// Creates an override bound to an existing flag.
	async fn create_override(
		&self,
		flag_id: FlagId,
		environment: Environment,
		client_id: Option<String>,
		enabled: bool,
	) -> Result<Override>;

	async fn get_override(&self, id: OverrideId) -> Result<Override>;

	async fn delete_override(&self, id: OverrideId) -> Result<()>;

	/// Resolves whether a flag is active for a client in an environment.
	async fn is_active(&self, flag_name: &str, client_id: &str, environment: Environment)
		-> Result<bool>;

	/// Sets `enabled` on exactly one override, by id.
	async fn set_override_enabled(&self, id: OverrideId, enabled: bool) -> Result<Override>;

	/// Sets `enabled` on every override of a flag selected by `selector`.
	///
	/// Returns the number of overrides written; zero matches is not an error.
	async fn update_for_client_or_environment(
		&self,
		flag_id: FlagId,
		selector: &OverrideSelector,
		enabled: bool,
	) -> Result<usize>;
}

/// Flags engine over an injected store and client directory.
#[derive(Clone)]
pub struct FlagsEngine {
	repo: Arc<dyn FlagsRepository>,
	clients: Arc<dyn ClientDirectory>,
}

impl FlagsEngine {
	pub fn new(repo: Arc<dyn FlagsRepository>, clients: Arc<dyn ClientDirectory>) -> Self {
		Self { repo, clients }
	}

	async fn require_flag(&self, id: FlagId) -> Result<Flag> {
		self
			.repo
			.get_flag_by_id(id)
			.await?
			.ok_or_else(|| FlagsError::FlagNotFound(id.to_string()).into())
	}

	async fn require_override(&self, id: OverrideId) -> Result<Override> {
		self
			.repo
			.get_override_by_id(id)
			.await?
			.ok_or_else(|| FlagsError::OverrideNotFound(id.to_string()).into())
	}
}

#[async_trait]
impl FlagsService for FlagsEngine {
	#[instrument(skip(self, description))]
	async fn create_flag(
		&self,
		name: &str,
		description: Option<String>,
		enabled_by_default: bool,
	) -> Result<Flag> {
		let flag = Flag::new(name, description, enabled_by_default)?;

		if self.repo.flag_name_exists(&flag.name).await? {
			return Err(FlagsError::FlagAlreadyExists(flag.name).into());
		}

		self.repo.create_flag(&flag).await?;

		tracing::info!(flag_id = %flag.id, flag_name = %flag.name, "Created flag");
		Ok(flag)
	}

	#[instrument(skip(self), fields(flag_id = %id))]
	async fn get_flag(&self, id: FlagId) -> Result<Flag> {
		self.require_flag(id).await
	}

	#[instrument(skip(self))]
	async fn get_flag_by_name(&self, name: &str) -> Result<Flag> {
		self
			.repo
			.get_flag_by_name(name)
			.await?
			.ok_or_else(|| FlagsError::FlagNotFound(name.to_string()).into())
	}

	#[instrument(skip(self, update), fields(flag_id = %id))]
	async fn update_flag(&self, id: FlagId, update: FlagUpdate) -> Result<Flag> {
		let mut flag = self.require_flag(id).await?;
		if update.is_empty() {
			return Ok(flag);
		}

		update.apply(&mut flag);
		self.repo.update_flag(&flag).await?;

		tracing::info!(
			flag_id = %flag.id,
			enabled_by_default = flag.enabled_by_default,
			"Updated flag"
		);
		Ok(flag)
	}

	#[instrument(skip(self), fields(flag_id = %id))]
	async fn delete_flag(&self, id: FlagId) -> Result<()> {
		if !self.repo.delete_flag(id).await? {
			return Err(FlagsError::FlagNotFound(id.to_string()).into());
		}

		tracing::info!(flag_id = %id, "Deleted flag");
		Ok(())
	}

	#[instrument(skip(self, query))]
	async fn list_flags(&self, query: &FlagQuery, page: PageRequest) -> Result<Page<Flag>> {
		let page = self.repo.list_flags(query, page).await?;
		tracing::debug!(total = page.total, returned = page.items.len(), "Listed flags");
		Ok(page)
	}

	#[instrument(skip(self, client_id), fields(flag_id = %flag_id, environment = %environment))]
	async fn create_override(
		&self,
		flag_id: FlagId,
		environment: Environment,
		client_id: Option<String>,
		enabled: bool,
	) -> Result<Override> {
		if !self.repo.flag_exists(flag_id).await? {
			return Err(FlagsError::FlagNotFound(flag_id.to_string()).into());
		}

		let o = Override::new(flag_id, environment, client_id, enabled);
		self.repo.create_override(&o).await?;

		tracing::info!(
			override_id = %o.id,
			flag_id = %flag_id,
			environment = %environment,
			client_id = ?o.client_id,
			enabled,
			"Created override"
		);
		Ok(o)
	}

	#[instrument(skip(self), fields(override_id = %id))]
	async fn get_override(&self, id: OverrideId) -> Result<Override> {
		self.require_override(id).await
	}

	#[instrument(skip(self), fields(override_id = %id))]
	async fn delete_override(&self, id: OverrideId) -> Result<()> {
		if !self.repo.delete_override(id).await? {
			return Err(FlagsError::OverrideNotFound(id.to_string()).into());
		}

		tracing::info!(override_id = %id, "Deleted override");
		Ok(())
	}

	#[instrument(skip(self), fields(environment = %environment))]
	async fn is_active(
		&self,
		flag_name: &str,
		client_id: &str,
		environment: Environment,
	) -> Result<bool> {
		let flag = self.get_flag_by_name(flag_name).await?;

		if !self.clients.exists(client_id).await? {
			return Err(FlagsError::ClientNotFound(client_id.to_string()).into());
		}

		// Client-blind: any override enabled for the environment counts.
		let hit = active_override(&flag, environment);
		tracing::debug!(
			flag_id = %flag.id,
			matched_override = ?hit.map(|o| o.id),
			active = hit.is_some(),
			"Resolved flag"
		);
		Ok(hit.is_some())
	}

	#[instrument(skip(self), fields(override_id = %id))]
	async fn set_override_enabled(&self, id: OverrideId, enabled: bool) -> Result<Override> {
		let o = self.require_override(id).await?;

		// Same write path as the filtered toggle so the flag's updated_at moves too.
		self.repo
			.set_overrides_enabled(o.flag_id, &[o.id], enabled)
			.await?;
		let o = self.require_override(id).await?;

		tracing::info!(override_id = %o.id, flag_id = %o.flag_id, enabled, "Toggled override");
		Ok(o)
	}

	#[instrument(skip(self, selector), fields(flag_id = %flag_id, client_id = ?selector.client_id(), environment = ?selector.environment()))]
	async fn update_for_client_or_environment(
		&self,
		flag_id: FlagId,
		selector: &OverrideSelector,
		enabled: bool,
	) -> Result<usize> {
		let flag = self.require_flag(flag_id).await?;
		selector.validate()?;

		let ids: Vec<OverrideId> = match_overrides(&flag.overrides, selector)
			.into_iter()
			.map(|o| o.id)
			.collect();

		if ids.is_empty() {
			tracing::debug!(flag_id = %flag_id, "No overrides matched toggle");
			return Ok(0);
		}

		self.repo.set_overrides_enabled(flag_id, &ids, enabled).await?;

		tracing::info!(
			flag_id = %flag_id,
			matched = ids.len(),
			enabled,
			"Toggled overrides"
		);
		Ok(ids.len())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::clients::StaticClientDirectory;
	use crate::repository::SqliteFlagsRepository;
	use crate::testing::create_test_pool;
	use crate::FlagsServerError;

	async fn make_engine() -> FlagsEngine {
		let pool = create_test_pool().await;
		FlagsEngine::new(
			Arc::new(SqliteFlagsRepository::new(pool)),
			Arc::new(StaticClientDirectory::new(["A", "B"])),
		)
	}

	fn core_err(err: FlagsServerError) -> FlagsError {
		match err {
			FlagsServerError::Core(e) => e,
			other => panic!("expected engine error, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_create_flag_rejects_duplicate_name() {
		let engine = make_engine().await;
		let first = engine
			.create_flag("x", Some("first".to_string()), true)
			.await
			.unwrap();

		let err = engine.create_flag("x", None, false).await.unwrap_err();
		assert!(matches!(core_err(err), FlagsError::FlagAlreadyExists(_)));

		let stored = engine.get_flag(first.id).await.unwrap();
		assert_eq!(stored.description.as_deref(), Some("first"));
		assert!(stored.enabled_by_default);
	}

	#[tokio::test]
	async fn test_create_flag_rejects_blank_name() {
		let engine = make_engine().await;
		let err = engine.create_flag("  ", None, false).await.unwrap_err();
		assert!(matches!(core_err(err), FlagsError::InvalidFlagName(_)));
	}

	#[tokio::test]
	async fn test_create_override_requires_flag() {
		let engine = make_engine().await;
		let err = engine
			.create_override(FlagId::new(), Environment::Dev, None, true)
			.await
			.unwrap_err();
		assert!(matches!(core_err(err), FlagsError::FlagNotFound(_)));
	}

	#[tokio::test]
	async fn test_is_active_unknown_flag() {
		let engine = make_engine().await;
		let err = engine
			.is_active("missing", "A", Environment::Prod)
			.await
			.unwrap_err();
		assert!(matches!(core_err(err), FlagsError::FlagNotFound(_)));
	}

	#[tokio::test]
	async fn test_is_active_unknown_client() {
		let engine = make_engine().await;
		engine.create_flag("beta", None, false).await.unwrap();

		let err = engine
			.is_active("beta", "nobody", Environment::Prod)
			.await
			.unwrap_err();
		assert!(matches!(core_err(err), FlagsError::ClientNotFound(_)));
	}

	#[tokio::test]
	async fn test_is_active_ignores_default_and_client() {
		let engine = make_engine().await;
		let flag = engine.create_flag("beta", None, true).await.unwrap();

		// Enabled by default, but no override: inactive.
		assert!(!engine.is_active("beta", "A", Environment::Prod).await.unwrap());

		engine
			.create_override(flag.id, Environment::Prod, Some("B".to_string()), true)
			.await
			.unwrap();

		// Configured for B, still active when A asks.
		assert!(engine.is_active("beta", "A", Environment::Prod).await.unwrap());
		assert!(!engine.is_active("beta", "A", Environment::Dev).await.unwrap());
	}

	#[tokio::test]
	async fn test_set_override_enabled() {
		let engine = make_engine().await;
		let flag = engine.create_flag("toggle_me", None, false).await.unwrap();
		let o = engine
			.create_override(flag.id, Environment::Staging, None, false)
			.await
			.unwrap();

		let updated = engine.set_override_enabled(o.id, true).await.unwrap();
		assert!(updated.enabled);
		assert!(engine.get_override(o.id).await.unwrap().enabled);
	}

	#[tokio::test]
	async fn test_set_override_enabled_unknown_id() {
		let engine = make_engine().await;
		let err = engine
			.set_override_enabled(OverrideId::new(), true)
			.await
			.unwrap_err();
		assert!(matches!(core_err(err), FlagsError::OverrideNotFound(_)));
	}

	#[tokio::test]
	async fn test_set_override_enabled_bumps_flag_updated_at() {
		let engine = make_engine().await;
		let flag = engine.create_flag("stamped", None, false).await.unwrap();
		let o = engine
			.create_override(flag.id, Environment::Dev, None, false)
			.await
			.unwrap();
		let before = engine.get_flag(flag.id).await.unwrap().updated_at;

		std::thread::sleep(std::time::Duration::from_millis(5));
		let updated = engine.set_override_enabled(o.id, true).await.unwrap();

		let after = engine.get_flag(flag.id).await.unwrap();
		assert!(after.updated_at > before);
		assert_eq!(after.find_override(o.id), Some(&updated));
	}

	#[tokio::test]
	async fn test_filtered_toggle_rolls_back_on_failure() {
		let pool = create_test_pool().await;
		let engine = FlagsEngine::new(
			Arc::new(SqliteFlagsRepository::new(pool.clone())),
			Arc::new(StaticClientDirectory::new(["A"])),
		);
		let flag = engine.create_flag("atomic", None, false).await.unwrap();
		let first = engine
			.create_override(flag.id, Environment::Dev, None, false)
			.await
			.unwrap();
		std::thread::sleep(std::time::Duration::from_millis(5));
		let second = engine
			.create_override(flag.id, Environment::Dev, None, false)
			.await
			.unwrap();

		let before = engine.get_flag(flag.id).await.unwrap().updated_at;
		sqlx::query(&format!(
			"CREATE TRIGGER fail_second BEFORE UPDATE ON flag_overrides \
			 WHEN NEW.id = '{}' BEGIN SELECT RAISE(ABORT, 'boom'); END",
			second.id.0
		))
		.execute(&pool)
		.await
		.unwrap();

		let selector = OverrideSelector::ByEnvironment {
			environment: Environment::Dev,
		};
		let err = engine
			.update_for_client_or_environment(flag.id, &selector, true)
			.await
			.unwrap_err();
		assert!(matches!(err, FlagsServerError::Database(_)));

		assert!(!engine.get_override(first.id).await.unwrap().enabled);
		assert!(!engine.get_override(second.id).await.unwrap().enabled);
		assert_eq!(engine.get_flag(flag.id).await.unwrap().updated_at, before);
	}

	#[tokio::test]
	async fn test_filtered_toggle_unknown_flag_checked_first() {
		let engine = make_engine().await;
		let err = engine
			.update_for_client_or_environment(FlagId::new(), &OverrideSelector::None, true)
			.await
			.unwrap_err();
		assert!(matches!(core_err(err), FlagsError::FlagNotFound(_)));
	}

	#[tokio::test]
	async fn test_filtered_toggle_rejects_empty_selector() {
		let engine = make_engine().await;
		let flag = engine.create_flag("guarded", None, false).await.unwrap();
		let o = engine
			.create_override(flag.id, Environment::Dev, None, false)
			.await
			.unwrap();

		let err = engine
			.update_for_client_or_environment(flag.id, &OverrideSelector::None, true)
			.await
			.unwrap_err();
		assert!(matches!(core_err(err), FlagsError::InvalidToggleRequest));
		assert!(!engine.get_override(o.id).await.unwrap().enabled);
	}

	#[tokio::test]
	async fn test_filtered_toggle_no_match_is_noop() {
		let engine = make_engine().await;
		let flag = engine.create_flag("quiet", None, false).await.unwrap();
		engine
			.create_override(flag.id, Environment::Dev, Some("A".to_string()), false)
			.await
			.unwrap();

		let selector = OverrideSelector::for_toggle(Some("Z"), None).unwrap();
		let written = engine
			.update_for_client_or_environment(flag.id, &selector, true)
			.await
			.unwrap();
		assert_eq!(written, 0);
	}

	#[tokio::test]
	async fn test_update_flag_partial() {
		let engine = make_engine().await;
		let flag = engine
			.create_flag("partial", Some("keep".to_string()), false)
			.await
			.unwrap();

		let updated = engine
			.update_flag(
				flag.id,
				FlagUpdate {
					description: None,
					enabled_by_default: Some(true),
				},
			)
			.await
			.unwrap();
		assert!(updated.enabled_by_default);
		assert_eq!(updated.description.as_deref(), Some("keep"));

		let err = engine
			.update_flag(FlagId::new(), FlagUpdate::default())
			.await
			.unwrap_err();
		assert!(matches!(core_err(err), FlagsError::FlagNotFound(_)));
	}

	mod props {
		use super::*;
		use proptest::prelude::*;

		fn arb_override() -> impl Strategy<Value = (usize, Option<&'static str>, bool)> {
			(
				0usize..3,
				prop::option::of(prop_oneof![Just("A"), Just("B")]),
				any::<bool>(),
			)
		}

		fn arb_selector() -> impl Strategy<Value = OverrideSelector> {
			(
				prop::option::of(prop_oneof![Just("A"), Just("B"), Just("Z")]),
				prop::option::of(0usize..3),
			)
				.prop_filter_map("toggle needs a selector", |(client, env)| {
					OverrideSelector::for_toggle(client, env.map(|i| Environment::ALL[i])).ok()
				})
		}

		proptest! {
			#![proptest_config(ProptestConfig::with_cases(24))]

			/// Stored toggles write exactly the in-memory match set, and
			/// toggling back to false leaves every matched override disabled.
			#[test]
			fn stored_toggle_matches_in_memory_selection(
				specs in prop::collection::vec(arb_override(), 0..8),
				selector in arb_selector(),
			) {
				let rt = tokio::runtime::Runtime::new().unwrap();
				rt.block_on(async {
					let engine = make_engine().await;
					let flag = engine.create_flag("prop_flag", None, false).await.unwrap();
					for (env, client, enabled) in &specs {
						engine
							.create_override(
								flag.id,
								Environment::ALL[*env],
								client.map(str::to_string),
								*enabled,
							)
							.await
							.unwrap();
					}

					let before = engine.get_flag(flag.id).await.unwrap();
					let expected: Vec<OverrideId> = match_overrides(&before.overrides, &selector)
						.iter()
						.map(|o| o.id)
						.collect();

					let written = engine
						.update_for_client_or_environment(flag.id, &selector, true)
						.await
						.unwrap();
					assert_eq!(written, expected.len());

					engine
						.update_for_client_or_environment(flag.id, &selector, false)
						.await
						.unwrap();
					let after = engine.get_flag(flag.id).await.unwrap();
					for o in &after.overrides {
						let original = before.find_override(o.id).unwrap();
						if expected.contains(&o.id) {
							assert!(!o.enabled);
						} else {
							assert_eq!(o.enabled, original.enabled);
						}
					}
				});
			}
		}
	}

	#[tokio::test]
	async fn test_delete_flag_and_override_not_found() {
		let engine = make_engine().await;
		let err = engine.delete_flag(FlagId::new()).await.unwrap_err();
		assert!(matches!(core_err(err), FlagsError::FlagNotFound(_)));

		let err = engine.delete_override(OverrideId::new()).await.unwrap_err();
		assert!(matches!(core_err(err), FlagsError::OverrideNotFound(_)));
	}
}
