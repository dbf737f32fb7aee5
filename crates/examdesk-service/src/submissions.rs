//! The submission wizard's backend: token checks and the one-shot
//! submission recorder.

use examdesk_core::{
	BankDetails, Clock, Error, Event, PaymentStatus, Result, SubjectDetails, Submission,
	SubmissionStatus, TokenKind,
};
use examdesk_store::Database;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::notify::{NotificationHub, notification_rows};
use crate::tokens::TokenService;

/// Payload of `POST /api/submission/submit/:token`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionRequest {
	pub account_number: String,
	pub routing_code: String,
	pub account_holder: String,
	pub subject: String,
	pub class_level: String,
	pub board: String,
	pub exam_type: String,
	pub file_name: String,
	pub file_url: String,
}

impl SubmissionRequest {
	fn validate(&self) -> Result<()> {
		let required = [
			("account_number", &self.account_number),
			("routing_code", &self.routing_code),
			("account_holder", &self.account_holder),
			("subject", &self.subject),
			("class_level", &self.class_level),
			("board", &self.board),
			("exam_type", &self.exam_type),
			("file_name", &self.file_name),
			("file_url", &self.file_url),
		];
		for (field, value) in required {
			if value.trim().is_empty() {
				return Err(Error::Validation(format!("{} is required", field)));
			}
		}
		if !self.account_number.chars().all(|c| c.is_ascii_digit()) {
			return Err(Error::Validation("account_number must be numeric".into()));
		}
		if !(6..=20).contains(&self.account_number.len()) {
			return Err(Error::Validation(
				"account_number must be 6 to 20 digits".into(),
			));
		}
		if !self.file_url.starts_with("http://") && !self.file_url.starts_with("https://") {
			return Err(Error::Validation("file_url must be an http(s) URL".into()));
		}
		Ok(())
	}
}

/// Response of `GET /api/submission/validate/:token`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenCheck {
	pub teacher_id: String,
	pub expires_at: DateTime<Utc>,
	pub validation_count: i64,
}

#[derive(Clone)]
pub struct SubmissionService {
	db: Database,
	tokens: TokenService,
	hub: NotificationHub,
	clock: Arc<dyn Clock>,
}

impl SubmissionService {
	pub fn new(
		db: Database,
		tokens: TokenService,
		hub: NotificationHub,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self {
			db,
			tokens,
			hub,
			clock,
		}
	}

	/// Check a wizard link before showing the form. Multi-use: a valid
	/// token stays valid until it expires or a submission consumes it.
	pub async fn validate_token(
		&self,
		token: &str,
		ip: Option<&str>,
		user_agent: Option<&str>,
	) -> Result<TokenCheck> {
		let checked = self
			.tokens
			.validate(token, TokenKind::Submission, ip, user_agent)
			.await?;
		let teacher = self
			.db
			.teachers()
			.find_by_token(token)
			.await?
			.ok_or(Error::InvalidToken)?;
		Ok(TokenCheck {
			teacher_id: teacher.id,
			expires_at: checked.expires_at,
			validation_count: checked.validation_count,
		})
	}

	/// Record a submission. Everything durable happens in one store
	/// transaction; the live broadcast follows the commit.
	pub async fn submit(
		&self,
		token: &str,
		ip: Option<&str>,
		user_agent: Option<&str>,
		request: SubmissionRequest,
	) -> Result<Submission> {
		request.validate()?;
		self.tokens
			.validate(token, TokenKind::Submission, ip, user_agent)
			.await?;
		let teacher = self
			.db
			.teachers()
			.find_by_token(token)
			.await?
			.ok_or(Error::InvalidToken)?;
		if teacher.has_submitted {
			return Err(Error::Conflict(
				"a submission has already been recorded for this token".into(),
			));
		}

		let now = self.clock.now();
		let submission = Submission {
			id: Uuid::new_v4().to_string(),
			teacher_id: teacher.id.clone(),
			bank: BankDetails {
				account_number: request.account_number,
				routing_code: request.routing_code,
				account_holder: request.account_holder,
			},
			details: SubjectDetails {
				subject: request.subject,
				class_level: request.class_level,
				board: request.board,
				exam_type: request.exam_type,
			},
			file_name: request.file_name,
			file_url: request.file_url,
			status: SubmissionStatus::Pending,
			review_notes: None,
			payment_status: PaymentStatus::Pending,
			payment_amount: None,
			reviewed_by: None,
			reviewed_at: None,
			created_at: now,
		};

		let event = Event::SubmissionReceived {
			submission_id: submission.id.clone(),
			teacher_id: teacher.id.clone(),
			subject: submission.details.subject.clone(),
		};
		// Teacher receipt (once the invitation is claimed) plus the
		// inviting admin's alert.
		let mut recipients = Vec::new();
		if let Some(profile_id) = &teacher.profile_id {
			recipients.push(profile_id.clone());
		}
		recipients.push(teacher.invited_by.clone());
		let rows = notification_rows(&event, &recipients, now);

		self.db.submissions().record(&submission, token, &rows).await?;
		self.hub.broadcast(event);
		info!(
			submission_id = %submission.id,
			teacher_id = %teacher.id,
			subject = %submission.details.subject,
			"submission recorded"
		);
		Ok(submission)
	}

	/// A signed-in teacher's own submissions.
	pub async fn list_for_profile(&self, profile_id: &str) -> Result<Vec<Submission>> {
		let teacher = self
			.db
			.teachers()
			.find_by_profile(profile_id)
			.await?
			.ok_or_else(|| Error::NotFound("teacher record".into()))?;
		self.db.submissions().find_by_teacher(&teacher.id).await
	}
}
