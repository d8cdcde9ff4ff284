// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end engine behaviour over a migrated in-memory store.

use std::sync::Arc;

use switchyard_server_flags::testing::create_test_pool;
use switchyard_server_flags::{
	ClientDirectory, Environment, FlagQuery, FlagsEngine, FlagsError, FlagsServerError,
	FlagsService, OverrideId, OverrideSelector, PageRequest, SqliteClientDirectory,
	SqliteFlagsRepository,
};

async fn setup() -> FlagsEngine {
	let pool = create_test_pool().await;
	let clients = SqliteClientDirectory::new(pool.clone());
	for id in ["A", "B", "C"] {
		clients.register(id).await.unwrap();
	}
	FlagsEngine::new(
		Arc::new(SqliteFlagsRepository::new(pool)),
		Arc::new(clients),
	)
}

fn expect_core(err: FlagsServerError) -> FlagsError {
	match err {
		FlagsServerError::Core(e) => e,
		other => panic!("expected engine error, got {other:?}"),
	}
}

#[tokio::test]
async fn client_toggle_flips_only_matching_override() {
	let engine = setup().await;
	let flag = engine.create_flag("dark_mode", None, false).await.unwrap();
	let dev_a = engine
		.create_override(flag.id, Environment::Dev, Some("A".to_string()), false)
		.await
		.unwrap();
	let prod_b = engine
		.create_override(flag.id, Environment::Prod, Some("B".to_string()), false)
		.await
		.unwrap();

	let selector = OverrideSelector::for_toggle(Some("A"), None).unwrap();
	let written = engine
		.update_for_client_or_environment(flag.id, &selector, true)
		.await
		.unwrap();
	assert_eq!(written, 1);

	assert!(engine.get_override(dev_a.id).await.unwrap().enabled);
	assert!(!engine.get_override(prod_b.id).await.unwrap().enabled);
}

#[tokio::test]
async fn environment_toggle_round_trip_restores_state() {
	let engine = setup().await;
	let flag = engine.create_flag("checkout_v2", None, false).await.unwrap();
	let mut ids = Vec::new();
	for client in ["A", "B"] {
		let o = engine
			.create_override(flag.id, Environment::Staging, Some(client.to_string()), false)
			.await
			.unwrap();
		ids.push(o.id);
	}
	let untouched = engine
		.create_override(flag.id, Environment::Prod, Some("A".to_string()), false)
		.await
		.unwrap();

	let selector = OverrideSelector::for_toggle(None, Some(Environment::Staging)).unwrap();
	assert_eq!(
		engine
			.update_for_client_or_environment(flag.id, &selector, true)
			.await
			.unwrap(),
		2
	);
	for id in &ids {
		assert!(engine.get_override(*id).await.unwrap().enabled);
	}

	engine
		.update_for_client_or_environment(flag.id, &selector, false)
		.await
		.unwrap();
	let flag = engine.get_flag(flag.id).await.unwrap();
	assert!(flag.overrides.iter().all(|o| !o.enabled));
	assert!(flag.find_override(untouched.id).is_some());
}

#[tokio::test]
async fn duplicate_create_leaves_first_flag_unchanged() {
	let engine = setup().await;
	let first = engine
		.create_flag("x", Some("original".to_string()), false)
		.await
		.unwrap();

	let err = engine
		.create_flag("x", Some("replacement".to_string()), true)
		.await
		.unwrap_err();
	let err = expect_core(err);
	assert!(matches!(err, FlagsError::FlagAlreadyExists(_)));
	assert_eq!(err.status_code(), 409);

	let stored = engine.get_flag_by_name("x").await.unwrap();
	assert_eq!(stored.id, first.id);
	assert_eq!(stored.description.as_deref(), Some("original"));
	assert!(!stored.enabled_by_default);
}

#[tokio::test]
async fn listing_is_case_insensitive_substring() {
	let engine = setup().await;
	for name in ["feature_1", "my_feature", "other"] {
		engine.create_flag(name, None, false).await.unwrap();
	}

	let query = FlagQuery::new(Some("FEATURE"), None);
	let page = engine
		.list_flags(&query, PageRequest::normalize(Some(0), Some(10)))
		.await
		.unwrap();

	let names: Vec<_> = page.items.iter().map(|f| f.name.as_str()).collect();
	assert_eq!(page.total, 2);
	assert!(names.contains(&"feature_1"));
	assert!(names.contains(&"my_feature"));
	assert!(!names.contains(&"other"));
}

#[tokio::test]
async fn listing_with_no_matches_is_an_empty_page() {
	let engine = setup().await;
	engine.create_flag("alpha", None, true).await.unwrap();

	let query = FlagQuery::new(Some("zzz"), None);
	let page = engine
		.list_flags(&query, PageRequest::default())
		.await
		.unwrap();
	assert!(page.is_empty());
	assert_eq!(page.total, 0);
}

#[tokio::test]
async fn unknown_override_toggle_is_not_found_without_mutation() {
	let engine = setup().await;
	let flag = engine.create_flag("stable", None, false).await.unwrap();
	let existing = engine
		.create_override(flag.id, Environment::Dev, None, false)
		.await
		.unwrap();

	let err = engine
		.set_override_enabled(OverrideId::new(), true)
		.await
		.unwrap_err();
	assert!(matches!(expect_core(err), FlagsError::OverrideNotFound(_)));

	let after = engine.get_override(existing.id).await.unwrap();
	assert_eq!(after, existing);
}

#[tokio::test]
async fn flag_without_overrides_is_inactive_everywhere() {
	let engine = setup().await;
	engine.create_flag("dormant", None, true).await.unwrap();

	for client in ["A", "B", "C"] {
		for env in Environment::all() {
			assert!(!engine.is_active("dormant", client, env).await.unwrap());
		}
	}
}

#[tokio::test]
async fn enabled_override_is_active_for_every_known_client() {
	let engine = setup().await;
	let flag = engine.create_flag("beta_banner", None, false).await.unwrap();
	engine
		.create_override(flag.id, Environment::Prod, Some("A".to_string()), true)
		.await
		.unwrap();

	for client in ["A", "B", "C"] {
		assert!(engine
			.is_active("beta_banner", client, Environment::Prod)
			.await
			.unwrap());
	}
	assert!(!engine
		.is_active("beta_banner", "A", Environment::Dev)
		.await
		.unwrap());
}

#[tokio::test]
async fn delete_flag_removes_overrides() {
	let engine = setup().await;
	let flag = engine.create_flag("doomed", None, false).await.unwrap();
	let o = engine
		.create_override(flag.id, Environment::Prod, None, true)
		.await
		.unwrap();

	engine.delete_flag(flag.id).await.unwrap();

	let err = engine.get_override(o.id).await.unwrap_err();
	assert!(matches!(expect_core(err), FlagsError::OverrideNotFound(_)));
	let err = engine.get_flag(flag.id).await.unwrap_err();
	assert!(matches!(expect_core(err), FlagsError::FlagNotFound(_)));
}
