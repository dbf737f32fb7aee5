//! Periodic pruning of expired and stale rows.

use chrono::Duration;
use examdesk_core::{Clock, Result};
use examdesk_store::Database;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
	pub tokens: u64,
	pub rate_limits: u64,
	pub security_events: u64,
}

#[derive(Clone)]
pub struct CleanupTask {
	db: Database,
	clock: Arc<dyn Clock>,
	/// How long stale rate-limit rows linger before pruning.
	rate_limit_retention: Duration,
	/// How long the security audit trail is kept.
	event_retention: Duration,
	interval: std::time::Duration,
}

impl CleanupTask {
	pub fn new(db: Database, clock: Arc<dyn Clock>, interval: std::time::Duration) -> Self {
		Self {
			db,
			clock,
			rate_limit_retention: Duration::hours(24),
			event_retention: Duration::days(90),
			interval,
		}
	}

	pub async fn run_once(&self) -> Result<CleanupReport> {
		let now = self.clock.now();
		let report = CleanupReport {
			tokens: self.db.url_tokens().delete_expired(now).await?,
			rate_limits: self
				.db
				.rate_limits()
				.delete_stale(now - self.rate_limit_retention)
				.await?,
			security_events: self
				.db
				.security_events()
				.delete_older_than(now - self.event_retention)
				.await?,
		};
		if report != CleanupReport::default() {
			info!(
				tokens = report.tokens,
				rate_limits = report.rate_limits,
				security_events = report.security_events,
				"cleanup pass finished"
			);
		}
		Ok(report)
	}

	/// Run the pruning loop until the task is aborted.
	pub fn spawn(self) -> JoinHandle<()> {
		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(self.interval);
			ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
			loop {
				ticker.tick().await;
				if let Err(error) = self.run_once().await {
					warn!(%error, "cleanup pass failed");
				}
			}
		})
	}
}
