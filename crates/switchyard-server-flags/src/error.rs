// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Errors specific to the feature flags server.
#[derive(Debug, Error)]
pub enum FlagsServerError {
	#[error(transparent)]
	Core(#[from] switchyard_flags_core::FlagsError),

	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("internal error: {0}")]
	Internal(String),
}

impl FlagsServerError {
	/// Status code for the boundary layer. Storage failures are always 500.
	pub fn status_code(&self) -> u16 {
		match self {
			FlagsServerError::Core(e) => e.status_code(),
			_ => 500,
		}
	}

	pub fn error_code(&self) -> &'static str {
		match self {
			FlagsServerError::Core(e) => e.error_code(),
			_ => "internal_error",
		}
	}

	/// The engine-level error, if this is one.
	pub fn as_core(&self) -> Option<&switchyard_flags_core::FlagsError> {
		match self {
			FlagsServerError::Core(e) => Some(e),
			_ => None,
		}
	}
}

pub type Result<T> = std::result::Result<T, FlagsServerError>;
