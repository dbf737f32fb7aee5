//! Environment-driven configuration.
//!
//! All variables share the `EXAMDESK_` prefix. `DATABASE_URL` and
//! `JWT_SECRET` are mandatory; everything else has a sensible default.

use chrono::Duration;
use examdesk_core::{Error, Result};
use examdesk_service::RateLimitConfig;
use std::env;
use std::net::SocketAddr;

/// Prefixed environment reader with typed getters.
#[derive(Debug, Clone, Default)]
pub struct Env {
	prefix: Option<String>,
}

impl Env {
	pub fn new() -> Self {
		Self { prefix: None }
	}

	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}

	fn full_key(&self, key: &str) -> String {
		match &self.prefix {
			Some(prefix) => format!("{}{}", prefix, key),
			None => key.to_string(),
		}
	}

	pub fn str(&self, key: &str, default: &str) -> String {
		env::var(self.full_key(key)).unwrap_or_else(|_| default.to_string())
	}

	pub fn opt_str(&self, key: &str) -> Option<String> {
		env::var(self.full_key(key)).ok().filter(|v| !v.is_empty())
	}

	pub fn require(&self, key: &str) -> Result<String> {
		let full_key = self.full_key(key);
		env::var(&full_key)
			.ok()
			.filter(|v| !v.is_empty())
			.ok_or_else(|| Error::Config(format!("{} must be set", full_key)))
	}

	pub fn int(&self, key: &str, default: i64) -> Result<i64> {
		let full_key = self.full_key(key);
		match env::var(&full_key) {
			Ok(value) => value
				.parse()
				.map_err(|_| Error::Config(format!("{} must be an integer", full_key))),
			Err(_) => Ok(default),
		}
	}
}

/// Admin account created at startup when configured.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
	pub email: String,
	pub password: String,
	pub full_name: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
	pub bind_addr: SocketAddr,
	pub database_url: String,
	pub jwt_secret: String,
	pub access_ttl: Duration,
	pub refresh_ttl: Duration,
	/// Lifetime of freshly issued submission tokens.
	pub submission_token_ttl: Duration,
	/// Origin allowed by the CORS middleware.
	pub client_origin: String,
	pub rate_limit: RateLimitConfig,
	pub profile_cache_ttl: std::time::Duration,
	pub cleanup_interval: std::time::Duration,
	pub admin: Option<AdminBootstrap>,
}

impl Settings {
	pub fn from_env() -> Result<Self> {
		let env = Env::new().with_prefix("EXAMDESK_");

		let bind_addr = env
			.str("BIND_ADDR", "127.0.0.1:8000")
			.parse()
			.map_err(|_| Error::Config("EXAMDESK_BIND_ADDR must be host:port".into()))?;

		let rate_limit = RateLimitConfig {
			max_attempts: env.int("RATE_LIMIT_MAX_ATTEMPTS", 5)?,
			window: Duration::minutes(env.int("RATE_LIMIT_WINDOW_MINUTES", 15)?),
			block: Duration::minutes(env.int("RATE_LIMIT_BLOCK_MINUTES", 15)?),
		};

		let admin = match (env.opt_str("ADMIN_EMAIL"), env.opt_str("ADMIN_PASSWORD")) {
			(Some(email), Some(password)) => Some(AdminBootstrap {
				email,
				password,
				full_name: env.str("ADMIN_NAME", "Administrator"),
			}),
			_ => None,
		};

		Ok(Self {
			bind_addr,
			database_url: env.require("DATABASE_URL")?,
			jwt_secret: env.require("JWT_SECRET")?,
			access_ttl: Duration::minutes(env.int("ACCESS_TTL_MINUTES", 15)?),
			refresh_ttl: Duration::days(env.int("REFRESH_TTL_DAYS", 7)?),
			submission_token_ttl: Duration::days(env.int("SUBMISSION_TOKEN_TTL_DAYS", 7)?),
			client_origin: env.str("CLIENT_ORIGIN", "http://localhost:3000"),
			rate_limit,
			profile_cache_ttl: std::time::Duration::from_secs(
				env.int("PROFILE_CACHE_TTL_SECS", 60)? as u64,
			),
			cleanup_interval: std::time::Duration::from_secs(
				env.int("CLEANUP_INTERVAL_SECS", 3600)? as u64,
			),
			admin,
		})
	}
}
