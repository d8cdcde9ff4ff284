// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire shape of failures reported by the binary.

use serde::Serialize;
use switchyard_server_flags::FlagsServerError;

/// Status code, machine-readable code and human message for one failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
	pub status: u16,
	pub code: String,
	pub message: String,
}

impl From<&FlagsServerError> for ErrorResponse {
	fn from(err: &FlagsServerError) -> Self {
		// Storage details stay in the logs.
		let message = match err.as_core() {
			Some(core) => core.to_string(),
			None => "internal error".to_string(),
		};
		Self {
			status: err.status_code(),
			code: err.error_code().to_string(),
			message,
		}
	}
}
