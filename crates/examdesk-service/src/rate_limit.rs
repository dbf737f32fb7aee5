//! Fixed-window rate limiting backed by the database.
//!
//! One row per (identifier, action). The (N+1)-th attempt inside the
//! window sets `blocked_until`; once the block or the window has lapsed
//! the counter starts over. Both login and token validation consult the
//! same limiter.

use chrono::Duration;
use examdesk_core::{Clock, Error, RateLimitRecord, Result};
use examdesk_store::Database;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
	/// Attempts allowed per window before a block is imposed.
	pub max_attempts: i64,
	pub window: Duration,
	pub block: Duration,
}

impl Default for RateLimitConfig {
	fn default() -> Self {
		Self {
			max_attempts: 5,
			window: Duration::minutes(15),
			block: Duration::minutes(15),
		}
	}
}

#[derive(Clone)]
pub struct RateLimiter {
	db: Database,
	config: RateLimitConfig,
	clock: Arc<dyn Clock>,
}

impl RateLimiter {
	pub fn new(db: Database, config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
		Self { db, config, clock }
	}

	/// Count one attempt. Returns `RateLimited` when the identifier is
	/// blocked for this action, with the instant attempts resume.
	pub async fn check(&self, identifier: &str, action: &str) -> Result<()> {
		let now = self.clock.now();
		let store = self.db.rate_limits();

		let record = match store.find(identifier, action).await? {
			None => RateLimitRecord {
				identifier: identifier.to_string(),
				action: action.to_string(),
				count: 1,
				window_started_at: now,
				blocked_until: None,
			},
			Some(existing) => {
				if let Some(until) = existing.blocked_until {
					if until > now {
						warn!(identifier, action, %until, "rate limit block active");
						return Err(Error::RateLimited { until });
					}
				}
				if existing.blocked_until.is_some()
					|| now - existing.window_started_at >= self.config.window
				{
					// Block or window elapsed, fresh window.
					RateLimitRecord {
						count: 1,
						window_started_at: now,
						blocked_until: None,
						..existing
					}
				} else {
					let count = existing.count + 1;
					let blocked_until = if count > self.config.max_attempts {
						Some(now + self.config.block)
					} else {
						None
					};
					RateLimitRecord {
						count,
						blocked_until,
						..existing
					}
				}
			}
		};

		let blocked = record.blocked_until;
		store.save(&record).await?;
		match blocked {
			Some(until) => {
				warn!(identifier, action, %until, "rate limit exceeded");
				Err(Error::RateLimited { until })
			}
			None => Ok(()),
		}
	}

	/// Forget the counter, e.g. after a successful login.
	pub async fn reset(&self, identifier: &str, action: &str) -> Result<()> {
		self.db
			.rate_limits()
			.save(&RateLimitRecord {
				identifier: identifier.to_string(),
				action: action.to_string(),
				count: 0,
				window_started_at: self.clock.now(),
				blocked_until: None,
			})
			.await
	}
}
