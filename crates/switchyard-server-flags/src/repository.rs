// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use switchyard_flags_core::{
	Flag, FlagId, FlagQuery, FlagsError, Override, OverrideId, Page, PageRequest,
};

use crate::error::{FlagsServerError, Result};

/// Repository trait for flag and override persistence.
///
/// Flags are always returned with their full override set attached.
#[async_trait]
pub trait FlagsRepository: Send + Sync {
	// Flag operations

	/// Inserts a flag. A duplicate name fails with `FlagAlreadyExists`.
	async fn create_flag(&self, flag: &Flag) -> Result<()>;
	async fn get_flag_by_id(&self, id: FlagId) -> Result<Option<Flag>>;
	async fn get_flag_by_name(&self, name: &str) -> Result<Option<Flag>>;
	async fn flag_exists(&self, id: FlagId) -> Result<bool>;
	async fn flag_name_exists(&self, name: &str) -> Result<bool>;
	/// Updates description, default state and `updated_at`. The name is immutable.
	async fn update_flag(&self, flag: &Flag) -> Result<()>;
	/// Deletes a flag and every override referencing it in one transaction.
	async fn delete_flag(&self, id: FlagId) -> Result<bool>;
	async fn list_flags(&self, query: &FlagQuery, page: PageRequest) -> Result<Page<Flag>>;

	// Override operations

	async fn create_override(&self, o: &Override) -> Result<()>;
	async fn get_override_by_id(&self, id: OverrideId) -> Result<Option<Override>>;
	async fn list_overrides(&self, flag_id: FlagId) -> Result<Vec<Override>>;
	/// Sets `enabled` on every listed override of `flag_id` and bumps the flag's
	/// `updated_at`, all in one transaction. Returns the number of rows written.
	async fn set_overrides_enabled(
		&self,
		flag_id: FlagId,
		ids: &[OverrideId],
		enabled: bool,
	) -> Result<u64>;
	async fn delete_override(&self, id: OverrideId) -> Result<bool>;
}

/// SQLite implementation of the flags repository.
#[derive(Clone)]
pub struct SqliteFlagsRepository {
	pool: SqlitePool,
}

impl SqliteFlagsRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl FlagsRepository for SqliteFlagsRepository {
	#[instrument(skip(self, flag), fields(flag_id = %flag.id, flag_name = %flag.name))]
	async fn create_flag(&self, flag: &Flag) -> Result<()> {
		let mut tx = self.pool.begin().await?;

		sqlx::query(
			r#"
			INSERT INTO flags (id, name, name_lower, description, enabled_by_default, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(flag.id.0.to_string())
		.bind(&flag.name)
		.bind(flag.name.to_lowercase())
		.bind(&flag.description)
		.bind(flag.enabled_by_default)
		.bind(flag.created_at.to_rfc3339())
		.bind(flag.updated_at.to_rfc3339())
		.execute(&mut *tx)
		.await
		.map_err(|e| match e {
			sqlx::Error::Database(ref db) if db.is_unique_violation() => {
				FlagsServerError::Core(FlagsError::FlagAlreadyExists(flag.name.clone()))
			}
			other => other.into(),
		})?;

		for o in &flag.overrides {
			sqlx::query(
				r#"
				INSERT INTO flag_overrides (id, flag_id, environment, client_id, enabled, created_at, updated_at)
				VALUES (?, ?, ?, ?, ?, ?, ?)
				"#,
			)
			.bind(o.id.0.to_string())
			.bind(flag.id.0.to_string())
			.bind(o.environment.as_str())
			.bind(&o.client_id)
			.bind(o.enabled)
			.bind(o.created_at.to_rfc3339())
			.bind(o.updated_at.to_rfc3339())
			.execute(&mut *tx)
			.await?;
		}

		tx.commit().await?;
		Ok(())
	}

	#[instrument(skip(self), fields(flag_id = %id))]
	async fn get_flag_by_id(&self, id: FlagId) -> Result<Option<Flag>> {
		let row = sqlx::query_as::<_, FlagRow>(
			r#"
			SELECT id, name, description, enabled_by_default, created_at, updated_at
			FROM flags
			WHERE id = ?
			"#,
		)
		.bind(id.0.to_string())
		.fetch_optional(&self.pool)
		.await?;

		match row {
			Some(row) => {
				let overrides = self.list_overrides(id).await?;
				Ok(Some(row.into_flag(overrides)?))
			}
			None => Ok(None),
		}
	}

	#[instrument(skip(self), fields(flag_name = %name))]
	async fn get_flag_by_name(&self, name: &str) -> Result<Option<Flag>> {
		let row = sqlx::query_as::<_, FlagRow>(
			r#"
			SELECT id, name, description, enabled_by_default, created_at, updated_at
			FROM flags
			WHERE name = ?
			"#,
		)
		.bind(name)
		.fetch_optional(&self.pool)
		.await?;

		match row {
			Some(row) => {
				let flag_id = parse_flag_id(&row.id)?;
				let overrides = self.list_overrides(flag_id).await?;
				Ok(Some(row.into_flag(overrides)?))
			}
			None => Ok(None),
		}
	}

	#[instrument(skip(self), fields(flag_id = %id))]
	async fn flag_exists(&self, id: FlagId) -> Result<bool> {
		let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM flags WHERE id = ?")
			.bind(id.0.to_string())
			.fetch_one(&self.pool)
			.await?;

		Ok(row.0 > 0)
	}

	#[instrument(skip(self), fields(flag_name = %name))]
	async fn flag_name_exists(&self, name: &str) -> Result<bool> {
		let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM flags WHERE name = ?")
			.bind(name)
			.fetch_one(&self.pool)
			.await?;

		Ok(row.0 > 0)
	}

	#[instrument(skip(self, flag), fields(flag_id = %flag.id))]
	async fn update_flag(&self, flag: &Flag) -> Result<()> {
		sqlx::query(
			r#"
			UPDATE flags
			SET description = ?, enabled_by_default = ?, updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(&flag.description)
		.bind(flag.enabled_by_default)
		.bind(flag.updated_at.to_rfc3339())
		.bind(flag.id.0.to_string())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[instrument(skip(self), fields(flag_id = %id))]
	async fn delete_flag(&self, id: FlagId) -> Result<bool> {
		let mut tx = self.pool.begin().await?;

		let overrides = sqlx::query("DELETE FROM flag_overrides WHERE flag_id = ?")
			.bind(id.0.to_string())
			.execute(&mut *tx)
			.await?;

		let flags = sqlx::query("DELETE FROM flags WHERE id = ?")
			.bind(id.0.to_string())
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;

		tracing::debug!(
			overrides_deleted = overrides.rows_affected(),
			"deleted flag overrides"
		);
		Ok(flags.rows_affected() > 0)
	}

	#[instrument(skip(self, query, page), fields(name_contains = ?query.name_contains, enabled_by_default = ?query.enabled_by_default, page = page.page, size = page.size))]
	async fn list_flags(&self, query: &FlagQuery, page: PageRequest) -> Result<Page<Flag>> {
		let mut filter = String::from(" WHERE 1=1");
		if query.name_contains.is_some() {
			// instr() rather than LIKE so '%' and '_' in the pattern stay literal.
			// SQLite's lower() only folds ASCII, so both sides are lowercased in Rust.
			filter.push_str(" AND instr(name_lower, ?) > 0");
		}
		if query.enabled_by_default.is_some() {
			filter.push_str(" AND enabled_by_default = ?");
		}

		let pattern = query.name_contains.as_deref().map(str::to_lowercase);

		let count_sql = format!("SELECT COUNT(*) FROM flags{filter}");
		let mut count_q = sqlx::query_as::<_, (i64,)>(&count_sql);
		if let Some(pattern) = &pattern {
			count_q = count_q.bind(pattern);
		}
		if let Some(enabled) = query.enabled_by_default {
			count_q = count_q.bind(enabled);
		}
		let (total,) = count_q.fetch_one(&self.pool).await?;
		let total = u64::try_from(total).unwrap_or_default();

		// An offset SQLite cannot represent is necessarily past the last row.
		let Ok(offset) = i64::try_from(page.offset()) else {
			return Ok(Page::new(Vec::new(), total, page));
		};

		let select_sql = format!(
			r#"
			SELECT id, name, description, enabled_by_default, created_at, updated_at
			FROM flags{filter}
			ORDER BY name ASC
			LIMIT ? OFFSET ?
			"#
		);
		let mut q = sqlx::query_as::<_, FlagRow>(&select_sql);
		if let Some(pattern) = &pattern {
			q = q.bind(pattern);
		}
		if let Some(enabled) = query.enabled_by_default {
			q = q.bind(enabled);
		}
		q = q.bind(i64::from(page.size));
		q = q.bind(offset);

		let rows = q.fetch_all(&self.pool).await?;

		let mut items = Vec::with_capacity(rows.len());
		for row in rows {
			let flag_id = parse_flag_id(&row.id)?;
			let overrides = self.list_overrides(flag_id).await?;
			items.push(row.into_flag(overrides)?);
		}

		Ok(Page::new(items, total, page))
	}

	#[instrument(skip(self, o), fields(override_id = %o.id, flag_id = %o.flag_id, environment = %o.environment))]
	async fn create_override(&self, o: &Override) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO flag_overrides (id, flag_id, environment, client_id, enabled, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(o.id.0.to_string())
		.bind(o.flag_id.0.to_string())
		.bind(o.environment.as_str())
		.bind(&o.client_id)
		.bind(o.enabled)
		.bind(o.created_at.to_rfc3339())
		.bind(o.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[instrument(skip(self), fields(override_id = %id))]
	async fn get_override_by_id(&self, id: OverrideId) -> Result<Option<Override>> {
		let row = sqlx::query_as::<_, OverrideRow>(
			r#"
			SELECT id, flag_id, environment, client_id, enabled, created_at, updated_at
			FROM flag_overrides
			WHERE id = ?
			"#,
		)
		.bind(id.0.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self), fields(flag_id = %flag_id))]
	async fn list_overrides(&self, flag_id: FlagId) -> Result<Vec<Override>> {
		let rows = sqlx::query_as::<_, OverrideRow>(
			r#"
			SELECT id, flag_id, environment, client_id, enabled, created_at, updated_at
			FROM flag_overrides
			WHERE flag_id = ?
			ORDER BY created_at ASC
			"#,
		)
		.bind(flag_id.0.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self, ids), fields(flag_id = %flag_id, count = ids.len()))]
	async fn set_overrides_enabled(
		&self,
		flag_id: FlagId,
		ids: &[OverrideId],
		enabled: bool,
	) -> Result<u64> {
		let now = Utc::now().to_rfc3339();
		let mut tx = self.pool.begin().await?;
		let mut written = 0;

		for id in ids {
			let result = sqlx::query(
				r#"
				UPDATE flag_overrides
				SET enabled = ?, updated_at = ?
				WHERE id = ? AND flag_id = ?
				"#,
			)
			.bind(enabled)
			.bind(&now)
			.bind(id.0.to_string())
			.bind(flag_id.0.to_string())
			.execute(&mut *tx)
			.await?;
			written += result.rows_affected();
		}

		sqlx::query("UPDATE flags SET updated_at = ? WHERE id = ?")
			.bind(&now)
			.bind(flag_id.0.to_string())
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;
		Ok(written)
	}

	#[instrument(skip(self), fields(override_id = %id))]
	async fn delete_override(&self, id: OverrideId) -> Result<bool> {
		let result = sqlx::query("DELETE FROM flag_overrides WHERE id = ?")
			.bind(id.0.to_string())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}
}

// Database row types for sqlx

#[derive(sqlx::FromRow)]
struct FlagRow {
	id: String,
	name: String,
	description: Option<String>,
	enabled_by_default: bool,
	created_at: String,
	updated_at: String,
}

impl FlagRow {
	fn into_flag(self, overrides: Vec<Override>) -> Result<Flag> {
		Ok(Flag {
			id: parse_flag_id(&self.id)?,
			name: self.name,
			description: self.description,
			enabled_by_default: self.enabled_by_default,
			overrides,
			created_at: parse_timestamp(&self.created_at, "created_at")?,
			updated_at: parse_timestamp(&self.updated_at, "updated_at")?,
		})
	}
}

#[derive(sqlx::FromRow)]
struct OverrideRow {
	id: String,
	flag_id: String,
	environment: String,
	client_id: Option<String>,
	enabled: bool,
	created_at: String,
	updated_at: String,
}

impl TryFrom<OverrideRow> for Override {
	type Error = FlagsServerError;

	fn try_from(row: OverrideRow) -> Result<Self> {
		Ok(Override {
			id: row
				.id
				.parse()
				.map_err(|_| FlagsServerError::Internal("Invalid override ID".to_string()))?,
			flag_id: parse_flag_id(&row.flag_id)?,
			environment: row
				.environment
				.parse()
				.map_err(|_| FlagsServerError::Internal("Invalid environment".to_string()))?,
			client_id: row.client_id,
			enabled: row.enabled,
			created_at: parse_timestamp(&row.created_at, "created_at")?,
			updated_at: parse_timestamp(&row.updated_at, "updated_at")?,
		})
	}
}

fn parse_flag_id(s: &str) -> Result<FlagId> {
	s.parse()
		.map_err(|_| FlagsServerError::Internal("Invalid flag ID".to_string()))
}

fn parse_timestamp(s: &str, field: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(s)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|_| FlagsServerError::Internal(format!("Invalid {field}")))
}
