// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Errors that can occur in the feature flags engine.
///
/// Each variant carries the HTTP-style status and machine-readable code the
/// boundary layer reports; the engine itself never serializes them.
#[derive(Debug, Error)]
pub enum FlagsError {
	#[error("flag not found: {0}")]
	FlagNotFound(String),

	#[error("override not found: {0}")]
	OverrideNotFound(String),

	#[error("client not found: {0}")]
	ClientNotFound(String),

	#[error("flag already exists: {0}")]
	FlagAlreadyExists(String),

	#[error("toggle request must select a client, an environment, or both")]
	InvalidToggleRequest,

	#[error("invalid flag name: {0}")]
	InvalidFlagName(String),

	#[error("invalid environment: {0}")]
	InvalidEnvironment(String),

	#[error("internal error: {0}")]
	Internal(String),
}

impl FlagsError {
	/// HTTP status code the boundary layer should respond with.
	pub fn status_code(&self) -> u16 {
		match self {
			FlagsError::FlagNotFound(_)
			| FlagsError::OverrideNotFound(_)
			| FlagsError::ClientNotFound(_) => 404,
			FlagsError::FlagAlreadyExists(_) => 409,
			FlagsError::InvalidToggleRequest
			| FlagsError::InvalidFlagName(_)
			| FlagsError::InvalidEnvironment(_) => 400,
			FlagsError::Internal(_) => 500,
		}
	}

	/// Short machine-readable code, stable across releases.
	pub fn error_code(&self) -> &'static str {
		match self {
			FlagsError::FlagNotFound(_) => "flag_not_found",
			FlagsError::OverrideNotFound(_) => "override_not_found",
			FlagsError::ClientNotFound(_) => "client_not_found",
			FlagsError::FlagAlreadyExists(_) => "flag_already_exists",
			FlagsError::InvalidToggleRequest => "invalid_toggle_request",
			FlagsError::InvalidFlagName(_) => "invalid_flag_name",
			FlagsError::InvalidEnvironment(_) => "invalid_environment",
			FlagsError::Internal(_) => "internal_error",
		}
	}
}

pub type Result<T> = std::result::Result<T, FlagsError>;
