//! Teacher invitations.

use chrono::Duration;
use examdesk_core::{Clock, Error, Event, Result, Teacher, TokenKind};
use examdesk_store::Database;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::notify::NotificationHub;
use crate::tokens::TokenService;

/// Default lifetime of a submission token.
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct TeacherDirectory {
	db: Database,
	tokens: TokenService,
	hub: NotificationHub,
	clock: Arc<dyn Clock>,
	token_ttl: Duration,
}

impl TeacherDirectory {
	pub fn new(
		db: Database,
		tokens: TokenService,
		hub: NotificationHub,
		clock: Arc<dyn Clock>,
		token_ttl: Duration,
	) -> Self {
		Self {
			db,
			tokens,
			hub,
			clock,
			token_ttl,
		}
	}

	/// Create an invitation: a teacher record plus its submission token.
	/// The returned record carries the token for the admin to hand out.
	pub async fn invite(&self, admin_id: &str) -> Result<Teacher> {
		let now = self.clock.now();
		let teacher_id = Uuid::new_v4().to_string();
		let token = self
			.tokens
			.issue(TokenKind::Submission, &teacher_id, self.token_ttl)
			.await?;

		let teacher = Teacher {
			id: teacher_id,
			profile_id: None,
			submission_token: token.token,
			token_expires_at: token.expires_at,
			has_submitted: false,
			invited_by: admin_id.to_string(),
			created_at: now,
		};
		self.db.teachers().insert(&teacher).await?;

		let event = Event::TeacherInvited {
			teacher_id: teacher.id.clone(),
			invited_by: admin_id.to_string(),
		};
		self.hub
			.publish(event, &[admin_id.to_string()], now)
			.await?;
		info!(teacher_id = %teacher.id, invited_by = admin_id, "teacher invited");
		Ok(teacher)
	}

	/// Replace an invitation's token, clearing the submitted flag so the
	/// teacher can go through the wizard again.
	pub async fn regenerate_token(&self, teacher_id: &str) -> Result<Teacher> {
		let teacher = self
			.db
			.teachers()
			.find_by_id(teacher_id)
			.await?
			.ok_or_else(|| Error::NotFound(format!("teacher {}", teacher_id)))?;
		let token = self
			.tokens
			.issue(TokenKind::Submission, &teacher.id, self.token_ttl)
			.await?;
		self.db
			.teachers()
			.update_token(&teacher.id, &token.token, token.expires_at)
			.await?;
		info!(teacher_id = %teacher.id, "submission token regenerated");
		self.db
			.teachers()
			.find_by_id(teacher_id)
			.await?
			.ok_or_else(|| Error::NotFound(format!("teacher {}", teacher_id)))
	}

	pub async fn list(&self) -> Result<Vec<Teacher>> {
		self.db.teachers().list().await
	}

	pub async fn get(&self, teacher_id: &str) -> Result<Teacher> {
		self.db
			.teachers()
			.find_by_id(teacher_id)
			.await?
			.ok_or_else(|| Error::NotFound(format!("teacher {}", teacher_id)))
	}
}
