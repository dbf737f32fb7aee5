//! Registration, login and profile management.

use examdesk_auth::{JwtAuth, PasswordHasher, TokenPair, TokenUse};
use examdesk_cache::TtlCache;
use examdesk_core::{Clock, Error, Profile, Result, Role, SecurityEvent, TokenKind};
use examdesk_store::Database;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::rate_limit::RateLimiter;

const LOGIN_ACTION: &str = "login";
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
	pub email: String,
	pub password: String,
	pub full_name: String,
	/// Submission token from the invitation link; claims the teacher
	/// record for this new account.
	pub invite_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
	pub email: String,
	pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
	pub email: Option<String>,
	pub full_name: Option<String>,
}

fn validate_email(email: &str) -> Result<()> {
	let trimmed = email.trim();
	if trimmed.len() < 3 || !trimmed.contains('@') || trimmed.contains(char::is_whitespace) {
		return Err(Error::Validation("email address is malformed".into()));
	}
	Ok(())
}

fn validate_password(password: &str) -> Result<()> {
	if password.len() < MIN_PASSWORD_LEN {
		return Err(Error::Validation(format!(
			"password must be at least {} characters",
			MIN_PASSWORD_LEN
		)));
	}
	Ok(())
}

#[derive(Clone)]
pub struct AuthService {
	db: Database,
	hasher: Arc<dyn PasswordHasher>,
	jwt: Arc<JwtAuth>,
	limiter: RateLimiter,
	profiles: TtlCache<Profile>,
	clock: Arc<dyn Clock>,
}

impl AuthService {
	pub fn new(
		db: Database,
		hasher: Arc<dyn PasswordHasher>,
		jwt: Arc<JwtAuth>,
		limiter: RateLimiter,
		profiles: TtlCache<Profile>,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self {
			db,
			hasher,
			jwt,
			limiter,
			profiles,
			clock,
		}
	}

	/// Create a teacher account. Identity and profile land in one
	/// transaction; with an invitation token the new account also claims
	/// its teacher record.
	pub async fn register(&self, request: RegisterRequest, ip: Option<&str>) -> Result<Profile> {
		validate_email(&request.email)?;
		validate_password(&request.password)?;
		if request.full_name.trim().is_empty() {
			return Err(Error::Validation("full_name is required".into()));
		}
		let email = request.email.trim().to_lowercase();
		if self.db.profiles().email_exists(&email).await? {
			return Err(Error::Conflict("email is already registered".into()));
		}

		// An invitation is claimed with the live submission token; the
		// checks mirror the wizard's validator so an expired or retired
		// link fails the same way everywhere.
		let claimed = match &request.invite_token {
			Some(token) => {
				let record = self
					.db
					.url_tokens()
					.find(token, TokenKind::Submission)
					.await?
					.ok_or(Error::InvalidToken)?;
				if record.expires_at <= self.clock.now() {
					return Err(Error::TokenExpired);
				}
				if !record.is_valid {
					return Err(Error::TokenInvalidated);
				}
				Some(
					self.db
						.teachers()
						.find_by_token(token)
						.await?
						.ok_or(Error::InvalidToken)?,
				)
			}
			None => None,
		};

		let now = self.clock.now();
		let profile = Profile {
			id: Uuid::new_v4().to_string(),
			email,
			full_name: request.full_name.trim().to_string(),
			role: Role::Teacher,
			is_active: true,
			is_locked: false,
			email_verified: false,
			created_at: now,
			updated_at: now,
		};
		let hash = self.hasher.hash(&request.password)?;
		self.db.profiles().insert(&profile, &hash).await?;

		if let Some(teacher) = claimed {
			self.db.teachers().link_profile(&teacher.id, &profile.id).await?;
		}
		self.audit(Some(&profile.id), "account_registered", &profile.email, ip)
			.await;
		info!(profile_id = %profile.id, "account registered");
		Ok(profile)
	}

	/// Verify credentials and issue a JWT pair. Every attempt, right or
	/// wrong, is charged against the rate limiter first, keyed by the
	/// account email so rotating client addresses does not reset it.
	pub async fn login(
		&self,
		request: LoginRequest,
		ip: Option<&str>,
	) -> Result<(Profile, TokenPair)> {
		let email = request.email.trim().to_lowercase();
		self.limiter.check(&email, LOGIN_ACTION).await?;
		let Some(profile) = self.db.profiles().find_by_email(&email).await? else {
			self.audit(None, "login_failed", &email, ip).await;
			return Err(Error::Authentication("invalid credentials".into()));
		};
		if profile.is_locked {
			self.audit(Some(&profile.id), "login_blocked", "account locked", ip)
				.await;
			return Err(Error::Forbidden("account is locked".into()));
		}
		if !profile.is_active {
			self.audit(Some(&profile.id), "login_blocked", "account inactive", ip)
				.await;
			return Err(Error::Forbidden("account is inactive".into()));
		}

		let hash = self
			.db
			.profiles()
			.password_hash(&profile.id)
			.await?
			.ok_or_else(|| Error::Internal("credentials row missing".into()))?;
		if !self.hasher.verify(&request.password, &hash)? {
			self.audit(Some(&profile.id), "login_failed", "wrong password", ip)
				.await;
			return Err(Error::Authentication("invalid credentials".into()));
		}

		let now = self.clock.now();
		self.limiter.reset(&email, LOGIN_ACTION).await?;
		self.db.profiles().set_last_login(&profile.id, now).await?;
		self.audit(Some(&profile.id), "login_succeeded", &profile.email, ip)
			.await;
		let pair = self.jwt.issue_pair(&profile.id, profile.role, now)?;
		self.profiles
			.insert(cache_key(&profile.id), profile.clone())
			.await;
		info!(profile_id = %profile.id, "login succeeded");
		Ok((profile, pair))
	}

	/// Rotate a refresh token into a fresh pair. The account must still
	/// be usable at rotation time.
	pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
		let claims = self.jwt.verify(refresh_token, TokenUse::Refresh)?;
		let profile = self
			.db
			.profiles()
			.find_by_id(&claims.sub)
			.await?
			.ok_or_else(|| Error::Authentication("account no longer exists".into()))?;
		if profile.is_locked || !profile.is_active {
			return Err(Error::Authentication("account is not usable".into()));
		}
		self.jwt.issue_pair(&profile.id, profile.role, self.clock.now())
	}

	/// Tokens are stateless; logout is an audit point plus a cache purge.
	pub async fn logout(&self, profile_id: &str, ip: Option<&str>) {
		self.profiles.remove(&cache_key(profile_id)).await;
		self.audit(Some(profile_id), "logout", "session closed", ip).await;
	}

	/// Resolve a bearer token to its live profile, via the TTL cache.
	pub async fn authenticate(&self, access_token: &str) -> Result<Profile> {
		let claims = self.jwt.verify(access_token, TokenUse::Access)?;
		let profile = self.profile(&claims.sub).await.map_err(|e| match e {
			Error::NotFound(_) => Error::Authentication("account no longer exists".into()),
			other => other,
		})?;
		if profile.is_locked || !profile.is_active {
			return Err(Error::Authentication("account is not usable".into()));
		}
		Ok(profile)
	}

	pub async fn profile(&self, profile_id: &str) -> Result<Profile> {
		let key = cache_key(profile_id);
		if let Some(profile) = self.profiles.get(&key).await {
			return Ok(profile);
		}
		let profile = self
			.db
			.profiles()
			.find_by_id(profile_id)
			.await?
			.ok_or_else(|| Error::NotFound(format!("profile {}", profile_id)))?;
		self.profiles.insert(key, profile.clone()).await;
		Ok(profile)
	}

	/// Apply a partial profile update and drop the cached copy.
	pub async fn update_profile(
		&self,
		profile_id: &str,
		request: UpdateProfileRequest,
	) -> Result<Profile> {
		let mut profile = self
			.db
			.profiles()
			.find_by_id(profile_id)
			.await?
			.ok_or_else(|| Error::NotFound(format!("profile {}", profile_id)))?;

		if let Some(email) = request.email {
			validate_email(&email)?;
			let email = email.trim().to_lowercase();
			if email != profile.email {
				if self.db.profiles().email_exists(&email).await? {
					return Err(Error::Conflict("email is already registered".into()));
				}
				profile.email = email;
				profile.email_verified = false;
			}
		}
		if let Some(full_name) = request.full_name {
			if full_name.trim().is_empty() {
				return Err(Error::Validation("full_name cannot be empty".into()));
			}
			profile.full_name = full_name.trim().to_string();
		}
		profile.updated_at = self.clock.now();
		self.db.profiles().update(&profile).await?;
		self.profiles.remove(&cache_key(profile_id)).await;
		Ok(profile)
	}

	pub async fn change_password(
		&self,
		profile_id: &str,
		current: &str,
		new: &str,
		ip: Option<&str>,
	) -> Result<()> {
		validate_password(new)?;
		let hash = self
			.db
			.profiles()
			.password_hash(profile_id)
			.await?
			.ok_or_else(|| Error::NotFound(format!("profile {}", profile_id)))?;
		if !self.hasher.verify(current, &hash)? {
			self.audit(Some(profile_id), "password_change_failed", "wrong password", ip)
				.await;
			return Err(Error::Authentication("current password is wrong".into()));
		}
		let new_hash = self.hasher.hash(new)?;
		self.db.profiles().set_password(profile_id, &new_hash).await?;
		self.audit(Some(profile_id), "password_changed", "password rotated", ip)
			.await;
		Ok(())
	}

	pub async fn security_events(&self, profile_id: &str, limit: u64) -> Result<Vec<SecurityEvent>> {
		self.db.security_events().list_for_profile(profile_id, limit).await
	}

	/// Bootstrap helper: create an admin account if the email is free.
	pub async fn ensure_admin(&self, email: &str, password: &str, full_name: &str) -> Result<()> {
		let email = email.trim().to_lowercase();
		if self.db.profiles().email_exists(&email).await? {
			return Ok(());
		}
		validate_password(password)?;
		let now = self.clock.now();
		let profile = Profile {
			id: Uuid::new_v4().to_string(),
			email,
			full_name: full_name.to_string(),
			role: Role::Admin,
			is_active: true,
			is_locked: false,
			email_verified: true,
			created_at: now,
			updated_at: now,
		};
		let hash = self.hasher.hash(password)?;
		self.db.profiles().insert(&profile, &hash).await?;
		info!(profile_id = %profile.id, "admin account bootstrapped");
		Ok(())
	}

	async fn audit(&self, profile_id: Option<&str>, kind: &str, detail: &str, ip: Option<&str>) {
		let event = SecurityEvent {
			id: Uuid::new_v4().to_string(),
			profile_id: profile_id.map(str::to_string),
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

fn cache_key(profile_id: &str) -> String {
	format!("profile:{}", profile_id)
}
