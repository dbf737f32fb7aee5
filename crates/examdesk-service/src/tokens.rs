//! URL token issue and validation.

use chrono::Duration;
use examdesk_core::{Clock, Error, Result, SecurityEvent, TokenKind, UrlToken};
use examdesk_auth::{SUBMISSION_TOKEN_LEN, random_hex_token};
use examdesk_store::Database;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::rate_limit::RateLimiter;

/// Rate-limit action charged per validation attempt.
pub const VALIDATION_ACTION: &str = "url_validation";

#[derive(Clone)]
pub struct TokenService {
	db: Database,
	limiter: RateLimiter,
	clock: Arc<dyn Clock>,
}

impl TokenService {
	pub fn new(db: Database, limiter: RateLimiter, clock: Arc<dyn Clock>) -> Self {
		Self { db, limiter, clock }
	}

	/// Mint and persist a fresh token for `owner_id`, replacing any
	/// earlier token of the same kind.
	pub async fn issue(&self, kind: TokenKind, owner_id: &str, ttl: Duration) -> Result<UrlToken> {
		let now = self.clock.now();
		let token = UrlToken {
			token: random_hex_token(SUBMISSION_TOKEN_LEN),
			kind,
			owner_id: owner_id.to_string(),
			is_valid: true,
			validation_count: 0,
			last_ip: None,
			last_user_agent: None,
			expires_at: now + ttl,
			created_at: now,
		};
		self.db.url_tokens().save(&token).await?;
		info!(owner_id, kind = kind.as_str(), "url token issued");
		Ok(token)
	}

	/// Validate a token for one use of the wizard. The checks run in a
	/// fixed order so each failure mode maps to exactly one error code:
	/// unknown, expired, invalidated. A live token is never consumed
	/// here; only the submission transaction retires it.
	pub async fn validate(
		&self,
		token: &str,
		kind: TokenKind,
		ip: Option<&str>,
		user_agent: Option<&str>,
	) -> Result<UrlToken> {
		self.limiter
			.check(ip.unwrap_or("unknown"), VALIDATION_ACTION)
			.await?;

		let now = self.clock.now();
		let store = self.db.url_tokens();
		let Some(mut found) = store.find(token, kind).await? else {
			self.audit(None, "token_rejected", "unknown token", ip).await;
			return Err(Error::InvalidToken);
		};

		if found.expires_at <= now {
			store.mark_invalid(token, kind).await?;
			self.audit(Some(&found.owner_id), "token_rejected", "token expired", ip)
				.await;
			return Err(Error::TokenExpired);
		}
		if !found.is_valid {
			self.audit(Some(&found.owner_id), "token_rejected", "token invalidated", ip)
				.await;
			return Err(Error::TokenInvalidated);
		}

		store.record_validation(token, kind, ip, user_agent).await?;
		found.validation_count += 1;
		found.last_ip = ip.map(str::to_string);
		found.last_user_agent = user_agent.map(str::to_string);
		self.audit(Some(&found.owner_id), "token_validated", "token accepted", ip)
			.await;
		Ok(found)
	}

	pub async fn invalidate(&self, token: &str, kind: TokenKind) -> Result<()> {
		self.db.url_tokens().mark_invalid(token, kind).await
	}

	/// Audit writes are best-effort; a failed insert never turns a valid
	/// token check into an error.
	async fn audit(&self, owner_id: Option<&str>, kind: &str, detail: &str, ip: Option<&str>) {
		let event = SecurityEvent {
			id: Uuid::new_v4().to_string(),
			profile_id: owner_id.map(str::to_string),
			kind: kind.to_string(),
			detail: detail.to_string(),
			ip: ip.map(str::to_string),
			created_at: self.clock.now(),
		};
		if let Err(error) = self.db.security_events().insert(&event).await {
			warn!(%error, "failed to record security event");
		}
	}
}
