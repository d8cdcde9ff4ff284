// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flag listing filters and pagination.

use serde::{Deserialize, Serialize};

use crate::Flag;

/// Filter for listing flags. Absent fields impose no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagQuery {
	/// Case-insensitive substring of the flag name. Never empty when set.
	pub name_contains: Option<String>,
	pub enabled_by_default: Option<bool>,
}

impl FlagQuery {
	pub fn new(name_pattern: Option<&str>, enabled_by_default: Option<bool>) -> Self {
		Self {
			name_contains: name_pattern
				.filter(|p| !p.is_empty())
				.map(str::to_string),
			enabled_by_default,
		}
	}

	/// Whether a flag passes both filters.
	pub fn matches(&self, flag: &Flag) -> bool {
		let name_ok = match &self.name_contains {
			Some(pattern) => flag.name.to_lowercase().contains(&pattern.to_lowercase()),
			None => true,
		};
		let default_ok = match self.enabled_by_default {
			Some(expected) => flag.enabled_by_default == expected,
			None => true,
		};
		name_ok && default_ok
	}
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
	pub page: u32,
	pub size: u32,
}

impl PageRequest {
	pub const DEFAULT_PAGE: u32 = 0;
	pub const DEFAULT_SIZE: u32 = 10;

	/// Builds a page request, falling back to the defaults for missing or
	/// out-of-range values (page < 0, size <= 0) instead of failing.
	/// Values above `u32::MAX` saturate.
	pub fn normalize(page: Option<i64>, size: Option<i64>) -> Self {
		let page = page
			.filter(|p| *p >= 0)
			.map(saturate_u32)
			.unwrap_or(Self::DEFAULT_PAGE);
		let size = size
			.filter(|s| *s > 0)
			.map(saturate_u32)
			.unwrap_or(Self::DEFAULT_SIZE);
		Self { page, size }
	}

	pub fn offset(&self) -> u64 {
		u64::from(self.page) * u64::from(self.size)
	}
}

fn saturate_u32(v: i64) -> u32 {
	u32::try_from(v).unwrap_or(u32::MAX)
}

impl Default for PageRequest {
	fn default() -> Self {
		Self {
			page: Self::DEFAULT_PAGE,
			size: Self::DEFAULT_SIZE,
		}
	}
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
	pub items: Vec<T>,
	pub total: u64,
	pub page: u32,
	pub size: u32,
}

impl<T> Page<T> {
	pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
		Self {
			items,
			total,
			page: request.page,
			size: request.size,
		}
	}

	pub fn total_pages(&self) -> u64 {
		if self.size == 0 {
			return 0;
		}
		self.total.div_ceil(u64::from(self.size))
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}
}
