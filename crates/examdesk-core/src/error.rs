//! Error types shared across the workspace.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias used throughout examdesk.
pub type Result<T> = std::result::Result<T, Error>;

/// Workspace-wide error taxonomy.
///
/// Every variant carries a stable machine-readable code (see
/// [`Error::code`]) that the HTTP boundary maps to a status and that
/// clients switch on to pick a message.
#[derive(Debug, Error)]
pub enum Error {
	/// Missing or malformed input.
	#[error("validation failed: {0}")]
	Validation(String),

	/// Wrong credentials, expired session or bad bearer token.
	#[error("authentication failed: {0}")]
	Authentication(String),

	/// Authenticated but not allowed (wrong role).
	#[error("forbidden: {0}")]
	Forbidden(String),

	/// Entity lookup failed.
	#[error("{0} not found")]
	NotFound(String),

	/// Resource-state conflict (already submitted, email taken).
	#[error("conflict: {0}")]
	Conflict(String),

	/// Token lookup found nothing for the (token, kind) pair.
	#[error("token not recognized")]
	InvalidToken,

	/// Token expiry has passed.
	#[error("token expired")]
	TokenExpired,

	/// Token was explicitly invalidated before this attempt.
	#[error("token invalidated")]
	TokenInvalidated,

	/// Too many attempts for this identifier/action pair.
	#[error("rate limited until {until}")]
	RateLimited {
		/// Instant at which attempts are accepted again.
		until: DateTime<Utc>,
	},

	/// Underlying database failure, surfaced opaquely to clients.
	#[error("database error: {0}")]
	Database(String),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("configuration error: {0}")]
	Config(String),

	#[error("internal error: {0}")]
	Internal(String),
}

impl Error {
	/// Stable code consumed by API clients.
	pub fn code(&self) -> &'static str {
		match self {
			Error::Validation(_) => "VALIDATION_ERROR",
			Error::Authentication(_) => "UNAUTHORIZED",
			Error::Forbidden(_) => "FORBIDDEN",
			Error::NotFound(_) => "NOT_FOUND",
			Error::Conflict(_) => "CONFLICT",
			Error::InvalidToken => "INVALID_TOKEN",
			Error::TokenExpired => "TOKEN_EXPIRED",
			Error::TokenInvalidated => "TOKEN_INVALID",
			Error::RateLimited { .. } => "RATE_LIMITED",
			Error::Database(_) | Error::Serialization(_) | Error::Internal(_) => "SERVER_ERROR",
			Error::Config(_) => "CONFIG_ERROR",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(Error::InvalidToken, "INVALID_TOKEN")]
	#[case(Error::TokenExpired, "TOKEN_EXPIRED")]
	#[case(Error::TokenInvalidated, "TOKEN_INVALID")]
	#[case(Error::Conflict("submission already completed".into()), "CONFLICT")]
	#[case(Error::Database("connection reset".into()), "SERVER_ERROR")]
	fn error_codes_are_stable(#[case] error: Error, #[case] code: &str) {
		assert_eq!(error.code(), code);
	}

	#[rstest]
	fn not_found_message_names_the_entity() {
		let error = Error::NotFound("teacher".into());
		assert_eq!(error.to_string(), "teacher not found");
	}
}
