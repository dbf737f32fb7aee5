//! `/api/admin/*` handlers. All of these require the admin role.

use async_trait::async_trait;
use examdesk_core::{PaymentStatus, Result, SubmissionStatus};
use examdesk_http::{Handler, Request, Response};
use serde::Deserialize;
use std::sync::Arc;

use super::require_admin;
use crate::state::AppState;

pub struct AddTeacher(pub Arc<AppState>);

#[async_trait]
impl Handler for AddTeacher {
	async fn handle(&self, request: Request) -> Result<Response> {
		let admin = require_admin(&self.0, &request).await?;
		let teacher = self.0.teachers.invite(&admin.id).await?;
		Ok(Response::json_with_status(
			hyper::StatusCode::CREATED,
			&teacher,
		))
	}
}

pub struct ListTeachers(pub Arc<AppState>);

#[async_trait]
impl Handler for ListTeachers {
	async fn handle(&self, request: Request) -> Result<Response> {
		require_admin(&self.0, &request).await?;
		let teachers = self.0.teachers.list().await?;
		Ok(Response::json(&teachers))
	}
}

pub struct RegenerateToken(pub Arc<AppState>);

#[async_trait]
impl Handler for RegenerateToken {
	async fn handle(&self, request: Request) -> Result<Response> {
		require_admin(&self.0, &request).await?;
		let teacher_id = request.path_param("id")?;
		let teacher = self.0.teachers.regenerate_token(teacher_id).await?;
		Ok(Response::json(&teacher))
	}
}

pub struct ListSubmissions(pub Arc<AppState>);

#[async_trait]
impl Handler for ListSubmissions {
	async fn handle(&self, request: Request) -> Result<Response> {
		require_admin(&self.0, &request).await?;
		let status = request
			.query_param("status")
			.map(|s| s.parse::<SubmissionStatus>())
			.transpose()?;
		let submissions = self.0.review.list(status).await?;
		Ok(Response::json(&submissions))
	}
}

#[derive(Deserialize)]
struct ReviewPayload {
	status: SubmissionStatus,
	notes: Option<String>,
	payment_amount: Option<i64>,
}

pub struct ReviewSubmission(pub Arc<AppState>);

#[async_trait]
impl Handler for ReviewSubmission {
	async fn handle(&self, request: Request) -> Result<Response> {
		let admin = require_admin(&self.0, &request).await?;
		let submission_id = request.path_param("id")?.to_string();
		let payload: ReviewPayload = request.json()?;
		let submission = self
			.0
			.review
			.review(
				&submission_id,
				&admin.id,
				payload.status,
				payload.notes,
				payload.payment_amount,
			)
			.await?;
		Ok(Response::json(&submission))
	}
}

#[derive(Deserialize)]
struct PaymentPayload {
	payment_status: PaymentStatus,
}

pub struct UpdatePayment(pub Arc<AppState>);

#[async_trait]
impl Handler for UpdatePayment {
	async fn handle(&self, request: Request) -> Result<Response> {
		let admin = require_admin(&self.0, &request).await?;
		let submission_id = request.path_param("id")?.to_string();
		let payload: PaymentPayload = request.json()?;
		let submission = self
			.0
			.review
			.update_payment(&submission_id, &admin.id, payload.payment_status)
			.await?;
		Ok(Response::json(&submission))
	}
}

pub struct DashboardStats(pub Arc<AppState>);

#[async_trait]
impl Handler for DashboardStats {
	async fn handle(&self, request: Request) -> Result<Response> {
		require_admin(&self.0, &request).await?;
		let stats = self.0.stats.dashboard().await?;
		Ok(Response::json(&stats))
	}
}
