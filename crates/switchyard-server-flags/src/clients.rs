// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client identity lookups used as a precondition for flag resolution.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::instrument;

use crate::error::{FlagsServerError, Result};

/// Answers whether a client id denotes a known tenant.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
	async fn exists(&self, client_id: &str) -> Result<bool>;

	/// Registers a client. Registering an existing client is a no-op.
	/// Returns true if the client was newly added.
	async fn register(&self, client_id: &str) -> Result<bool>;
}

/// Client directory backed by the `clients` table.
#[derive(Clone)]
pub struct SqliteClientDirectory {
	pool: SqlitePool,
}

impl SqliteClientDirectory {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl ClientDirectory for SqliteClientDirectory {
	#[instrument(skip(self), fields(client_id = %client_id))]
	async fn exists(&self, client_id: &str) -> Result<bool> {
		let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clients WHERE id = ?")
			.bind(client_id)
			.fetch_one(&self.pool)
			.await?;

		Ok(row.0 > 0)
	}

	#[instrument(skip(self), fields(client_id = %client_id))]
	async fn register(&self, client_id: &str) -> Result<bool> {
		let result = sqlx::query("INSERT OR IGNORE INTO clients (id, created_at) VALUES (?, ?)")
			.bind(client_id)
			.bind(Utc::now().to_rfc3339())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}
}

/// Fixed in-memory client set.
#[derive(Debug, Clone, Default)]
pub struct StaticClientDirectory {
	clients: Arc<RwLock<HashSet<String>>>,
}

impl StaticClientDirectory {
	pub fn new<I, S>(clients: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			clients: Arc::new(RwLock::new(clients.into_iter().map(Into::into).collect())),
		}
	}
}

#[async_trait]
impl ClientDirectory for StaticClientDirectory {
	async fn exists(&self, client_id: &str) -> Result<bool> {
		let clients = self
			.clients
			.read()
			.map_err(|_| FlagsServerError::Internal("client set lock poisoned".to_string()))?;
		Ok(clients.contains(client_id))
	}

	async fn register(&self, client_id: &str) -> Result<bool> {
		let mut clients = self
			.clients
			.write()
			.map_err(|_| FlagsServerError::Internal("client set lock poisoned".to_string()))?;
		Ok(clients.insert(client_id.to_string()))
	}
}
