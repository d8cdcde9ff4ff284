// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::{Environment, Flag, Override};

/// Returns the first override that makes `flag` active in `environment`.
///
/// The scan is client-blind: an override enabled for the environment counts
/// no matter which client it was configured for. `enabled_by_default` is not
/// consulted.
pub fn active_override(flag: &Flag, environment: Environment) -> Option<&Override> {
	flag
		.overrides
		.iter()
		.find(|o| o.environment == environment && o.enabled)
}

/// Whether `flag` resolves to active in `environment`.
pub fn is_active(flag: &Flag, environment: Environment) -> bool {
	active_override(flag, environment).is_some()
}
