//! Token-gated submission wizard endpoints.
//!
//! These are the only unauthenticated API routes besides registration
//! and login; the URL token is the credential.

use async_trait::async_trait;
use examdesk_core::Result;
use examdesk_http::{Handler, Request, Response};
use examdesk_service::SubmissionRequest;
use std::sync::Arc;

use super::require_auth;
use crate::state::AppState;

pub struct ValidateToken(pub Arc<AppState>);

#[async_trait]
impl Handler for ValidateToken {
	async fn handle(&self, request: Request) -> Result<Response> {
		let token = request.path_param("token")?;
		let check = self
			.0
			.submissions
			.validate_token(token, Some(&request.client_ip()), request.user_agent())
			.await?;
		Ok(Response::json(&check))
	}
}

pub struct Submit(pub Arc<AppState>);

#[async_trait]
impl Handler for Submit {
	async fn handle(&self, request: Request) -> Result<Response> {
		let token = request.path_param("token")?.to_string();
		let payload: SubmissionRequest = request.json()?;
		let submission = self
			.0
			.submissions
			.submit(
				&token,
				Some(&request.client_ip()),
				request.user_agent(),
				payload,
			)
			.await?;
		Ok(Response::json_with_status(
			hyper::StatusCode::CREATED,
			&submission,
		))
	}
}

/// A signed-in teacher's own submissions.
pub struct MySubmissions(pub Arc<AppState>);

#[async_trait]
impl Handler for MySubmissions {
	async fn handle(&self, request: Request) -> Result<Response> {
		let profile = require_auth(&self.0, &request).await?;
		let submissions = self.0.submissions.list_for_profile(&profile.id).await?;
		Ok(Response::json(&submissions))
	}
}
