// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Override selection for filtered toggles.
//!
//! A filtered toggle names a client, an environment, or both. [`OverrideSelector`]
//! encodes those four shapes explicitly so the "at least one selector" rule is
//! checked once, when the selector is built, instead of by null checks at every
//! use site.

use serde::{Deserialize, Serialize};

use crate::{Environment, FlagsError, Override, Result};

/// Which overrides of a flag a toggle applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverrideSelector {
	/// No selector at all. Matches every override; never accepted by a toggle.
	None,
	ByClient {
		client_id: String,
	},
	ByEnvironment {
		environment: Environment,
	},
	ByBoth {
		client_id: String,
		environment: Environment,
	},
}

impl OverrideSelector {
	/// Builds a selector from caller input, trimming but keeping a blank client id.
	///
	/// A blank client survives as `ByClient`/`ByBoth` so [`Self::validate`] can
	/// reject it later instead of it silently widening the match.
	pub fn from_raw(client_id: Option<String>, environment: Option<Environment>) -> Self {
		let client_id = client_id.map(|c| c.trim().to_string());

		match (client_id, environment) {
			(None, None) => OverrideSelector::None,
			(Some(client_id), None) => OverrideSelector::ByClient { client_id },
			(None, Some(environment)) => OverrideSelector::ByEnvironment { environment },
			(Some(client_id), Some(environment)) => OverrideSelector::ByBoth {
				client_id,
				environment,
			},
		}
	}

	/// Builds a selector for a filtered toggle.
	///
	/// Fails with [`FlagsError::InvalidToggleRequest`] when the client id is present
	/// but blank, or when neither a client nor an environment is given.
	pub fn for_toggle(client_id: Option<&str>, environment: Option<Environment>) -> Result<Self> {
		let selector = Self::from_raw(client_id.map(str::to_string), environment);
		selector.validate()?;
		Ok(selector)
	}

	/// Checks that a selector is usable by a toggle: at least one selector,
	/// and no blank client id.
	pub fn validate(&self) -> Result<()> {
		match self {
			OverrideSelector::None => Err(FlagsError::InvalidToggleRequest),
			OverrideSelector::ByClient { client_id } | OverrideSelector::ByBoth { client_id, .. }
				if client_id.trim().is_empty() =>
			{
				Err(FlagsError::InvalidToggleRequest)
			}
			_ => Ok(()),
		}
	}

	pub fn is_none(&self) -> bool {
		matches!(self, OverrideSelector::None)
	}

	pub fn client_id(&self) -> Option<&str> {
		match self {
			OverrideSelector::ByClient { client_id } | OverrideSelector::ByBoth { client_id, .. } => {
				Some(client_id)
			}
			_ => None,
		}
	}

	pub fn environment(&self) -> Option<Environment> {
		match self {
			OverrideSelector::ByEnvironment { environment }
			| OverrideSelector::ByBoth { environment, .. } => Some(*environment),
			_ => None,
		}
	}

	/// Whether a single override falls under this selector.
	///
	/// Client ids compare case-sensitively. An override without a client id only
	/// matches selectors that do not name a client.
	pub fn matches(&self, o: &Override) -> bool {
		let client_ok = match self.client_id() {
			Some(client_id) => o.client_id.as_deref() == Some(client_id),
			None => true,
		};
		let env_ok = match self.environment() {
			Some(environment) => o.environment == environment,
			None => true,
		};
		client_ok && env_ok
	}
}

/// Returns every override selected by `selector`.
///
/// Pure filter: input order is preserved but callers must not rely on it.
pub fn match_overrides<'a>(
	overrides: &'a [Override],
	selector: &OverrideSelector,
) -> Vec<&'a Override> {
	overrides.iter().filter(|o| selector.matches(o)).collect()
}
