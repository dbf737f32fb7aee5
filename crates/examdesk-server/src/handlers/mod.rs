//! REST handlers.
//!
//! One handler struct per endpoint, all sharing [`AppState`]. Role
//! enforcement happens here: `/api/admin/*` requires an admin bearer
//! token, the rest of the authenticated surface any live account.

pub mod admin;
pub mod auth;
pub mod notifications;
pub mod submission;

use async_trait::async_trait;
use examdesk_core::{Error, Profile, Result, Role};
use examdesk_http::{Handler, Request, Response};
use std::sync::Arc;

use crate::router::Router;
use crate::state::AppState;

pub(crate) async fn require_auth(state: &AppState, request: &Request) -> Result<Profile> {
	let token = request
		.bearer_token()
		.ok_or_else(|| Error::Authentication("missing bearer token".into()))?;
	state.auth.authenticate(token).await
}

pub(crate) async fn require_admin(state: &AppState, request: &Request) -> Result<Profile> {
	let profile = require_auth(state, request).await?;
	if profile.role != Role::Admin {
		return Err(Error::Forbidden("admin role required".into()));
	}
	Ok(profile)
}

struct Health;

#[async_trait]
impl Handler for Health {
	async fn handle(&self, _request: Request) -> Result<Response> {
		Ok(Response::json(&serde_json::json!({ "status": "ok" })))
	}
}

/// The full route table.
pub fn routes(state: Arc<AppState>) -> Router {
	Router::new()
		.get("/health", Arc::new(Health))
		.post("/api/auth/register", Arc::new(auth::Register(state.clone())))
		.post("/api/auth/login", Arc::new(auth::Login(state.clone())))
		.post("/api/auth/refresh", Arc::new(auth::Refresh(state.clone())))
		.post("/api/auth/logout", Arc::new(auth::Logout(state.clone())))
		.get("/api/auth/profile", Arc::new(auth::GetProfile(state.clone())))
		.put("/api/auth/profile", Arc::new(auth::UpdateProfile(state.clone())))
		.put(
			"/api/auth/change-password",
			Arc::new(auth::ChangePassword(state.clone())),
		)
		.get(
			"/api/auth/security-events",
			Arc::new(auth::SecurityEvents(state.clone())),
		)
		.post(
			"/api/admin/add-teacher",
			Arc::new(admin::AddTeacher(state.clone())),
		)
		.get("/api/admin/teachers", Arc::new(admin::ListTeachers(state.clone())))
		.post(
			"/api/admin/teachers/:id/regenerate-token",
			Arc::new(admin::RegenerateToken(state.clone())),
		)
		.get(
			"/api/admin/submissions",
			Arc::new(admin::ListSubmissions(state.clone())),
		)
		.put(
			"/api/admin/submissions/:id/review",
			Arc::new(admin::ReviewSubmission(state.clone())),
		)
		.put(
			"/api/admin/submissions/:id/payment",
			Arc::new(admin::UpdatePayment(state.clone())),
		)
		.get(
			"/api/admin/dashboard/stats",
			Arc::new(admin::DashboardStats(state.clone())),
		)
		.get(
			"/api/submission/validate/:token",
			Arc::new(submission::ValidateToken(state.clone())),
		)
		.post(
			"/api/submission/submit/:token",
			Arc::new(submission::Submit(state.clone())),
		)
		.get(
			"/api/submission/mine",
			Arc::new(submission::MySubmissions(state.clone())),
		)
		.get(
			"/api/notifications",
			Arc::new(notifications::List(state.clone())),
		)
		.put(
			"/api/notifications/read-all",
			Arc::new(notifications::MarkAllRead(state.clone())),
		)
		.put(
			"/api/notifications/:id/read",
			Arc::new(notifications::MarkRead(state)),
		)
}
