//! Persistence layer.
//!
//! SQL is built with sea-query and executed through `sqlx::AnyPool`, so
//! production (PostgreSQL) and tests (`sqlite::memory:`) share one code
//! path. Timestamps are stored as RFC3339 UTC text; at a fixed offset
//! that representation compares correctly as a string in both backends.

mod notifications;
mod profiles;
mod rate_limits;
mod row;
mod schema;
mod security_events;
mod submissions;
mod teachers;
mod tokens;

pub use notifications::NotificationStore;
pub use profiles::ProfileStore;
pub use rate_limits::RateLimitStore;
pub use security_events::SecurityEventStore;
pub use submissions::SubmissionStore;
pub use teachers::TeacherStore;
pub use tokens::UrlTokenStore;

use examdesk_core::{Error, Result};
use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

pub(crate) fn db_err(e: sqlx::Error) -> Error {
	Error::Database(e.to_string())
}

/// Handle to the database; hands out per-table stores.
#[derive(Clone)]
pub struct Database {
	pool: AnyPool,
}

impl Database {
	/// Connect to `postgres://…`, `sqlite://…` or `sqlite::memory:`.
	pub async fn connect(url: &str) -> Result<Self> {
		sqlx::any::install_default_drivers();
		let mut options = AnyPoolOptions::new();
		if url.starts_with("sqlite::memory:") {
			// Each sqlite :memory: connection is its own empty database;
			// a single connection keeps schema and queries together.
			options = options.max_connections(1);
		}
		let pool = options
			.connect(url)
			.await
			.map_err(|e| Error::Database(format!("connection failed: {}", e)))?;
		Ok(Self { pool })
	}

	pub fn from_pool(pool: AnyPool) -> Self {
		Self { pool }
	}

	/// Create all tables and indexes if they do not exist.
	pub async fn create_schema(&self) -> Result<()> {
		schema::create_all(&self.pool).await
	}

	pub fn profiles(&self) -> ProfileStore {
		ProfileStore::new(self.pool.clone())
	}

	pub fn teachers(&self) -> TeacherStore {
		TeacherStore::new(self.pool.clone())
	}

	pub fn submissions(&self) -> SubmissionStore {
		SubmissionStore::new(self.pool.clone())
	}

	pub fn notifications(&self) -> NotificationStore {
		NotificationStore::new(self.pool.clone())
	}

	pub fn url_tokens(&self) -> UrlTokenStore {
		UrlTokenStore::new(self.pool.clone())
	}

	pub fn rate_limits(&self) -> RateLimitStore {
		RateLimitStore::new(self.pool.clone())
	}

	pub fn security_events(&self) -> SecurityEventStore {
		SecurityEventStore::new(self.pool.clone())
	}
}
