//! `/api/auth/*` handlers.

use async_trait::async_trait;
use examdesk_core::Result;
use examdesk_http::{Handler, Request, Response};
use examdesk_service::{LoginRequest, RegisterRequest, UpdateProfileRequest};
use serde::Deserialize;
use std::sync::Arc;

use super::require_auth;
use crate::state::AppState;

pub struct Register(pub Arc<AppState>);

#[async_trait]
impl Handler for Register {
	async fn handle(&self, request: Request) -> Result<Response> {
		let payload: RegisterRequest = request.json()?;
		let profile = self
			.0
			.auth
			.register(payload, Some(&request.client_ip()))
			.await?;
		Ok(Response::json_with_status(
			hyper::StatusCode::CREATED,
			&profile,
		))
	}
}

pub struct Login(pub Arc<AppState>);

#[async_trait]
impl Handler for Login {
	async fn handle(&self, request: Request) -> Result<Response> {
		let payload: LoginRequest = request.json()?;
		let (profile, tokens) = self
			.0
			.auth
			.login(payload, Some(&request.client_ip()))
			.await?;
		Ok(Response::json(&serde_json::json!({
			"profile": profile,
			"tokens": tokens,
		})))
	}
}

#[derive(Deserialize)]
struct RefreshPayload {
	refresh_token: String,
}

pub struct Refresh(pub Arc<AppState>);

#[async_trait]
impl Handler for Refresh {
	async fn handle(&self, request: Request) -> Result<Response> {
		let payload: RefreshPayload = request.json()?;
		let pair = self.0.auth.refresh(&payload.refresh_token).await?;
		Ok(Response::json(&pair))
	}
}

pub struct Logout(pub Arc<AppState>);

#[async_trait]
impl Handler for Logout {
	async fn handle(&self, request: Request) -> Result<Response> {
		let profile = require_auth(&self.0, &request).await?;
		self.0
			.auth
			.logout(&profile.id, Some(&request.client_ip()))
			.await;
		Ok(Response::no_content())
	}
}

pub struct GetProfile(pub Arc<AppState>);

#[async_trait]
impl Handler for GetProfile {
	async fn handle(&self, request: Request) -> Result<Response> {
		let profile = require_auth(&self.0, &request).await?;
		Ok(Response::json(&profile))
	}
}

pub struct UpdateProfile(pub Arc<AppState>);

#[async_trait]
impl Handler for UpdateProfile {
	async fn handle(&self, request: Request) -> Result<Response> {
		let profile = require_auth(&self.0, &request).await?;
		let payload: UpdateProfileRequest = request.json()?;
		let updated = self.0.auth.update_profile(&profile.id, payload).await?;
		Ok(Response::json(&updated))
	}
}

#[derive(Deserialize)]
struct ChangePasswordPayload {
	current_password: String,
	new_password: String,
}

pub struct ChangePassword(pub Arc<AppState>);

#[async_trait]
impl Handler for ChangePassword {
	async fn handle(&self, request: Request) -> Result<Response> {
		let profile = require_auth(&self.0, &request).await?;
		let payload: ChangePasswordPayload = request.json()?;
		self.0
			.auth
			.change_password(
				&profile.id,
				&payload.current_password,
				&payload.new_password,
				Some(&request.client_ip()),
			)
			.await?;
		Ok(Response::no_content())
	}
}

pub struct SecurityEvents(pub Arc<AppState>);

#[async_trait]
impl Handler for SecurityEvents {
	async fn handle(&self, request: Request) -> Result<Response> {
		let profile = require_auth(&self.0, &request).await?;
		let limit = request
			.query_param("limit")
			.and_then(|v| v.parse().ok())
			.unwrap_or(50);
		let events = self.0.auth.security_events(&profile.id, limit).await?;
		Ok(Response::json(&events))
	}
}
