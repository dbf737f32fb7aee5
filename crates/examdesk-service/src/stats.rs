//! Admin dashboard aggregates.

use examdesk_core::{Result, SubmissionStatus};
use examdesk_store::Database;
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardStats {
	pub teachers_invited: i64,
	pub teachers_submitted: i64,
	pub submissions_total: i64,
	pub pending: i64,
	pub under_review: i64,
	pub approved: i64,
	pub rejected: i64,
}

#[derive(Clone)]
pub struct StatsService {
	db: Database,
}

impl StatsService {
	pub fn new(db: Database) -> Self {
		Self { db }
	}

	pub async fn dashboard(&self) -> Result<DashboardStats> {
		let mut stats = DashboardStats {
			teachers_invited: self.db.teachers().count().await?,
			teachers_submitted: self.db.teachers().count_submitted().await?,
			..DashboardStats::default()
		};
		for (status, count) in self.db.submissions().status_counts().await? {
			stats.submissions_total += count;
			match status {
				SubmissionStatus::Pending => stats.pending = count,
				SubmissionStatus::UnderReview => stats.under_review = count,
				SubmissionStatus::Approved => stats.approved = count,
				SubmissionStatus::Rejected => stats.rejected = count,
			}
		}
		Ok(stats)
	}
}
