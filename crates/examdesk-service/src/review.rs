//! Review and payment state machine.
//!
//! `pending -> {under_review, approved, rejected}`, with `approved` and
//! `rejected` terminal. Payment only moves once a submission is
//! approved: `pending -> processing -> {completed, failed}`, and a
//! failed payment may be retried through `processing`.

use examdesk_core::{
	Clock, Error, Event, PaymentStatus, Result, Submission, SubmissionStatus,
};
use examdesk_store::Database;
use std::sync::Arc;
use tracing::info;

use crate::notify::{NotificationHub, notification_rows};

fn review_transition_allowed(from: SubmissionStatus, to: SubmissionStatus) -> bool {
	use SubmissionStatus::*;
	matches!(
		(from, to),
		(Pending, UnderReview) | (Pending, Approved) | (Pending, Rejected)
			| (UnderReview, Approved)
			| (UnderReview, Rejected)
	)
}

fn payment_transition_allowed(from: PaymentStatus, to: PaymentStatus) -> bool {
	use PaymentStatus::*;
	matches!(
		(from, to),
		(Pending, Processing) | (Processing, Completed) | (Processing, Failed)
			| (Failed, Processing)
	)
}

#[derive(Clone)]
pub struct ReviewService {
	db: Database,
	hub: NotificationHub,
	clock: Arc<dyn Clock>,
}

impl ReviewService {
	pub fn new(db: Database, hub: NotificationHub, clock: Arc<dyn Clock>) -> Self {
		Self { db, hub, clock }
	}

	pub async fn get(&self, submission_id: &str) -> Result<Submission> {
		self.db
			.submissions()
			.find_by_id(submission_id)
			.await?
			.ok_or_else(|| Error::NotFound(format!("submission {}", submission_id)))
	}

	pub async fn list(&self, status: Option<SubmissionStatus>) -> Result<Vec<Submission>> {
		self.db.submissions().list(status).await
	}

	/// Move a submission through review. Approval requires the payment
	/// amount and kicks the payment into `processing`.
	pub async fn review(
		&self,
		submission_id: &str,
		reviewer_id: &str,
		status: SubmissionStatus,
		notes: Option<String>,
		payment_amount: Option<i64>,
	) -> Result<Submission> {
		let mut submission = self.get(submission_id).await?;
		if !review_transition_allowed(submission.status, status) {
			return Err(Error::Conflict(format!(
				"cannot move submission from {} to {}",
				submission.status, status
			)));
		}

		let now = self.clock.now();
		submission.status = status;
		submission.review_notes = notes.clone();
		submission.reviewed_by = Some(reviewer_id.to_string());
		submission.reviewed_at = Some(now);
		if status == SubmissionStatus::Approved {
			let amount = payment_amount.ok_or_else(|| {
				Error::Validation("payment_amount is required to approve a submission".into())
			})?;
			submission.payment_status = PaymentStatus::Processing;
			submission.payment_amount = Some(amount);
		}

		let event = Event::ReviewUpdated {
			submission_id: submission.id.clone(),
			status,
			notes,
			payment_amount: submission.payment_amount,
		};
		let rows = notification_rows(&event, &self.teacher_recipients(&submission).await?, now);
		self.db.submissions().update_review(&submission, &rows).await?;
		self.hub.broadcast(event);
		info!(
			submission_id = %submission.id,
			reviewer_id,
			status = status.as_str(),
			"review updated"
		);
		Ok(submission)
	}

	/// Advance the payment lifecycle of an approved submission.
	pub async fn update_payment(
		&self,
		submission_id: &str,
		reviewer_id: &str,
		payment_status: PaymentStatus,
	) -> Result<Submission> {
		let mut submission = self.get(submission_id).await?;
		if submission.status != SubmissionStatus::Approved {
			return Err(Error::Conflict(
				"payment is tracked only for approved submissions".into(),
			));
		}
		if !payment_transition_allowed(submission.payment_status, payment_status) {
			return Err(Error::Conflict(format!(
				"cannot move payment from {} to {}",
				submission.payment_status, payment_status
			)));
		}

		let now = self.clock.now();
		submission.payment_status = payment_status;
		let event = Event::PaymentUpdated {
			submission_id: submission.id.clone(),
			payment_status,
			amount: submission.payment_amount,
		};
		let rows = notification_rows(&event, &self.teacher_recipients(&submission).await?, now);
		self.db.submissions().update_review(&submission, &rows).await?;
		self.hub.broadcast(event);
		info!(
			submission_id = %submission.id,
			reviewer_id,
			payment_status = payment_status.as_str(),
			"payment updated"
		);
		Ok(submission)
	}

	/// The teacher's profile id, when the invitation has been claimed.
	/// Unclaimed invitations get no durable row; the state change stands
	/// on its own.
	async fn teacher_recipients(&self, submission: &Submission) -> Result<Vec<String>> {
		let teacher = self
			.db
			.teachers()
			.find_by_id(&submission.teacher_id)
			.await?
			.ok_or_else(|| Error::NotFound(format!("teacher {}", submission.teacher_id)))?;
		Ok(teacher.profile_id.into_iter().collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(SubmissionStatus::Pending, SubmissionStatus::UnderReview, true)]
	#[case(SubmissionStatus::Pending, SubmissionStatus::Approved, true)]
	#[case(SubmissionStatus::Pending, SubmissionStatus::Rejected, true)]
	#[case(SubmissionStatus::UnderReview, SubmissionStatus::Approved, true)]
	#[case(SubmissionStatus::UnderReview, SubmissionStatus::Rejected, true)]
	#[case(SubmissionStatus::Approved, SubmissionStatus::Rejected, false)]
	#[case(SubmissionStatus::Rejected, SubmissionStatus::UnderReview, false)]
	#[case(SubmissionStatus::UnderReview, SubmissionStatus::Pending, false)]
	#[case(SubmissionStatus::Pending, SubmissionStatus::Pending, false)]
	fn review_transitions(
		#[case] from: SubmissionStatus,
		#[case] to: SubmissionStatus,
		#[case] allowed: bool,
	) {
		assert_eq!(review_transition_allowed(from, to), allowed);
	}

	#[rstest]
	#[case(PaymentStatus::Pending, PaymentStatus::Processing, true)]
	#[case(PaymentStatus::Processing, PaymentStatus::Completed, true)]
	#[case(PaymentStatus::Processing, PaymentStatus::Failed, true)]
	#[case(PaymentStatus::Failed, PaymentStatus::Processing, true)]
	#[case(PaymentStatus::Completed, PaymentStatus::Failed, false)]
	#[case(PaymentStatus::Completed, PaymentStatus::Processing, false)]
	#[case(PaymentStatus::Pending, PaymentStatus::Completed, false)]
	fn payment_transitions(
		#[case] from: PaymentStatus,
		#[case] to: PaymentStatus,
		#[case] allowed: bool,
	) {
		assert_eq!(payment_transition_allowed(from, to), allowed);
	}
}
