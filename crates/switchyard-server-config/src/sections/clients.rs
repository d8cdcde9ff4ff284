// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Known clients seeded into the client directory at startup.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientsConfig {
	pub seed: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientsConfigLayer {
	#[serde(default)]
	pub seed: Option<Vec<String>>,
}

impl ClientsConfigLayer {
	/// Replaces the seed list wholesale; lists from different sources are not concatenated.
	pub fn merge(&mut self, other: ClientsConfigLayer) {
		if other.seed.is_some() {
			self.seed = other.seed;
		}
	}

	pub fn finalize(self) -> ClientsConfig {
		ClientsConfig {
			seed: self
				.seed
				.unwrap_or_default()
				.into_iter()
				.map(|c| c.trim().to_string())
				.collect(),
		}
	}
}

/// Splits a comma-separated list, dropping surrounding whitespace.
///
/// Empty entries are kept so validation can reject them.
pub fn parse_seed_list(raw: &str) -> Vec<String> {
	raw.split(',').map(|s| s.trim().to_string()).collect()
}
