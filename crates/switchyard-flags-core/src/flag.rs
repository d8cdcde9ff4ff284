// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Environment, FlagsError, Result};

/// Unique identifier for a feature flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagId(pub Uuid);

impl FlagId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for FlagId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for FlagId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for FlagId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Unique identifier for a per-environment override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverrideId(pub Uuid);

impl OverrideId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for OverrideId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for OverrideId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for OverrideId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// A named feature toggle with a default state and its overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
	pub id: FlagId,
	/// Globally unique, used as the lookup key for resolution.
	pub name: String,
	pub description: Option<String>,
	pub enabled_by_default: bool,
	/// Owned exclusively by this flag; order carries no meaning.
	#[serde(default)]
	pub overrides: Vec<Override>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Flag {
	/// Builds a new flag with no overrides.
	///
	/// The name is trimmed; a blank name is rejected.
	pub fn new(
		name: &str,
		description: Option<String>,
		enabled_by_default: bool,
	) -> Result<Self> {
		let name = Self::normalize_name(name)?;
		let now = Utc::now();
		Ok(Self {
			id: FlagId::new(),
			name,
			description: description.filter(|d| !d.trim().is_empty()),
			enabled_by_default,
			overrides: Vec::new(),
			created_at: now,
			updated_at: now,
		})
	}

	/// Trims a candidate flag name and rejects it when nothing is left.
	pub fn normalize_name(name: &str) -> Result<String> {
		let trimmed = name.trim();
		if trimmed.is_empty() {
			return Err(FlagsError::InvalidFlagName(name.to_string()));
		}
		Ok(trimmed.to_string())
	}

	/// Finds one of this flag's overrides by id.
	pub fn find_override(&self, id: OverrideId) -> Option<&Override> {
		self.overrides.iter().find(|o| o.id == id)
	}
}

/// Partial update of a flag's mutable fields. The name never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagUpdate {
	/// `Some("")` clears the description.
	pub description: Option<String>,
	pub enabled_by_default: Option<bool>,
}

impl FlagUpdate {
	pub fn is_empty(&self) -> bool {
		self.description.is_none() && self.enabled_by_default.is_none()
	}

	/// Applies the update in place, bumping `updated_at` when anything was set.
	pub fn apply(&self, flag: &mut Flag) {
		if self.is_empty() {
			return;
		}
		if let Some(description) = &self.description {
			let trimmed = description.trim();
			flag.description = (!trimmed.is_empty()).then(|| trimmed.to_string());
		}
		if let Some(enabled) = self.enabled_by_default {
			flag.enabled_by_default = enabled;
		}
		flag.updated_at = Utc::now();
	}
}

/// Enablement record for one environment, optionally scoped to one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
	pub id: OverrideId,
	pub flag_id: FlagId,
	pub environment: Environment,
	/// None = applies regardless of client.
	pub client_id: Option<String>,
	pub enabled: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Override {
	/// Builds a new override bound to `flag_id`.
	///
	/// A blank client id is stored as "no client".
	pub fn new(
		flag_id: FlagId,
		environment: Environment,
		client_id: Option<String>,
		enabled: bool,
	) -> Self {
		let now = Utc::now();
		Self {
			id: OverrideId::new(),
			flag_id,
			environment,
			client_id: client_id
				.map(|c| c.trim().to_string())
				.filter(|c| !c.is_empty()),
			enabled,
			created_at: now,
			updated_at: now,
		}
	}

	/// Sets the enabled state and bumps `updated_at`.
	pub fn set_enabled(&mut self, enabled: bool) {
		self.enabled = enabled;
		self.updated_at = Utc::now();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_new_flag_trims_name() {
		let flag = Flag::new("  dark_mode ", None, false).unwrap();
		assert_eq!(flag.name, "dark_mode");
		assert!(flag.overrides.is_empty());
		assert_eq!(flag.created_at, flag.updated_at);
	}

	#[test]
	fn test_new_flag_rejects_blank_name() {
		assert!(matches!(
			Flag::new("", None, true),
			Err(FlagsError::InvalidFlagName(_))
		));
		assert!(matches!(
			Flag::new("   ", None, true),
			Err(FlagsError::InvalidFlagName(_))
		));
	}

	#[test]
	fn test_blank_description_dropped() {
		let flag = Flag::new("beta", Some("  ".to_string()), true).unwrap();
		assert!(flag.description.is_none());

		let flag = Flag::new("beta", Some("New checkout".to_string()), true).unwrap();
		assert_eq!(flag.description.as_deref(), Some("New checkout"));
	}

	#[test]
	fn test_override_blank_client_is_none() {
		let flag_id = FlagId::new();
		let o = Override::new(flag_id, Environment::Dev, Some("   ".to_string()), true);
		assert!(o.client_id.is_none());

		let o = Override::new(flag_id, Environment::Dev, Some(" acme ".to_string()), true);
		assert_eq!(o.client_id.as_deref(), Some("acme"));
		assert_eq!(o.flag_id, flag_id);
	}

	#[test]
	fn test_set_enabled_bumps_updated_at() {
		let mut o = Override::new(FlagId::new(), Environment::Prod, None, false);
		let before = o.updated_at;
		o.set_enabled(true);
		assert!(o.enabled);
		assert!(o.updated_at >= before);
	}

	#[test]
	fn test_find_override() {
		let mut flag = Flag::new("search_v2", None, false).unwrap();
		let o = Override::new(flag.id, Environment::Staging, None, true);
		let id = o.id;
		flag.overrides.push(o);

		assert_eq!(flag.find_override(id).map(|o| o.environment), Some(Environment::Staging));
		assert!(flag.find_override(OverrideId::new()).is_none());
	}

	#[test]
	fn test_flag_update_apply() {
		let mut flag = Flag::new("beta", Some("old".to_string()), false).unwrap();
		let created = flag.updated_at;

		FlagUpdate::default().apply(&mut flag);
		assert_eq!(flag.updated_at, created);

		FlagUpdate {
			description: None,
			enabled_by_default: Some(true),
		}
		.apply(&mut flag);
		assert!(flag.enabled_by_default);
		assert_eq!(flag.description.as_deref(), Some("old"));
		assert!(flag.updated_at >= created);

		FlagUpdate {
			description: Some(" ".to_string()),
			enabled_by_default: None,
		}
		.apply(&mut flag);
		assert!(flag.description.is_none());
		assert_eq!(flag.name, "beta");
	}

	#[test]
	fn test_id_parse_roundtrip() {
		let id = FlagId::new();
		let parsed: FlagId = id.to_string().parse().unwrap();
		assert_eq!(parsed, id);
		assert!("not-a-uuid".parse::<OverrideId>().is_err());
	}
}
