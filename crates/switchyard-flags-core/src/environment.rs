// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::FlagsError;

/// Deployment tier an override applies to.
///
/// The set is closed: overrides can only ever target one of these three tiers,
/// and the persisted representation is the upper-case name (`DEV`, `STAGING`, `PROD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Environment {
	Dev,
	Staging,
	Prod,
}

impl Environment {
	pub const ALL: [Environment; 3] = [Environment::Dev, Environment::Staging, Environment::Prod];

	/// Returns the canonical upper-case name stored in the database.
	pub fn as_str(&self) -> &'static str {
		match self {
			Environment::Dev => "DEV",
			Environment::Staging => "STAGING",
			Environment::Prod => "PROD",
		}
	}

	/// Returns an iterator over every environment, in tier order.
	pub fn all() -> impl Iterator<Item = Environment> {
		Self::ALL.iter().copied()
	}
}

impl fmt::Display for Environment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Environment {
	type Err = FlagsError;

	/// Parses an environment name, ignoring case and surrounding whitespace.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();
		Environment::all()
			.find(|env| env.as_str().eq_ignore_ascii_case(trimmed))
			.ok_or_else(|| FlagsError::InvalidEnvironment(s.to_string()))
	}
}
