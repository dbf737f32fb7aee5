//! `/api/notifications` handlers.

use async_trait::async_trait;
use examdesk_core::Result;
use examdesk_http::{Handler, Request, Response};
use std::sync::Arc;

use super::require_auth;
use crate::state::AppState;

pub struct List(pub Arc<AppState>);

#[async_trait]
impl Handler for List {
	async fn handle(&self, request: Request) -> Result<Response> {
		let profile = require_auth(&self.0, &request).await?;
		let unread_only = request.query_param("unread") == Some("true");
		let notifications = self.0.hub.list(&profile.id, unread_only).await?;
		let unread_count = self.0.hub.unread_count(&profile.id).await?;
		Ok(Response::json(&serde_json::json!({
			"notifications": notifications,
			"unread_count": unread_count,
		})))
	}
}

pub struct MarkRead(pub Arc<AppState>);

#[async_trait]
impl Handler for MarkRead {
	async fn handle(&self, request: Request) -> Result<Response> {
		let profile = require_auth(&self.0, &request).await?;
		let id = request.path_param("id")?;
		self.0.hub.mark_read(id, &profile.id).await?;
		Ok(Response::no_content())
	}
}

pub struct MarkAllRead(pub Arc<AppState>);

#[async_trait]
impl Handler for MarkAllRead {
	async fn handle(&self, request: Request) -> Result<Response> {
		let profile = require_auth(&self.0, &request).await?;
		let changed = self.0.hub.mark_all_read(&profile.id).await?;
		Ok(Response::json(&serde_json::json!({ "marked_read": changed })))
	}
}
