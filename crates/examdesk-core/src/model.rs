//! Persistent domain model.
//!
//! All ids are UUIDs stored as text; timestamps are `chrono` UTC values
//! serialized as RFC3339 text by the store layer.

use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! string_enum {
	($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
		#[serde(rename_all = "snake_case")]
		pub enum $name {
			$($variant),+
		}

		impl $name {
			pub fn as_str(&self) -> &'static str {
				match self {
					$(Self::$variant => $text),+
				}
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(self.as_str())
			}
		}

		impl FromStr for $name {
			type Err = Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				match s {
					$($text => Ok(Self::$variant),)+
					other => Err(Error::Validation(format!(
						concat!("unknown ", stringify!($name), ": {}"),
						other
					))),
				}
			}
		}
	};
}

string_enum! {
	/// Account role.
	Role {
		Admin => "admin",
		Teacher => "teacher",
	}
}

string_enum! {
	/// Review lifecycle of a submission. `Approved` and `Rejected` are
	/// terminal.
	SubmissionStatus {
		Pending => "pending",
		UnderReview => "under_review",
		Approved => "approved",
		Rejected => "rejected",
	}
}

string_enum! {
	/// Payment lifecycle, only meaningful once a submission is approved.
	PaymentStatus {
		Pending => "pending",
		Processing => "processing",
		Completed => "completed",
		Failed => "failed",
	}
}

string_enum! {
	/// Notification severity, consumed by clients for display.
	Severity {
		Info => "info",
		Success => "success",
		Warning => "warning",
		Error => "error",
	}
}

string_enum! {
	/// What a URL token grants access to.
	TokenKind {
		Submission => "submission",
		Invitation => "invitation",
		Reset => "reset",
		Verification => "verification",
	}
}

/// A user account. Created explicitly during registration, never by a
/// database-side trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
	pub id: String,
	pub email: String,
	pub full_name: String,
	pub role: Role,
	pub is_active: bool,
	pub is_locked: bool,
	pub email_verified: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// An invited teacher. `profile_id` stays empty until the invitee signs
/// up through their token; the submission token is replaced wholesale on
/// regeneration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teacher {
	pub id: String,
	pub profile_id: Option<String>,
	pub submission_token: String,
	pub token_expires_at: DateTime<Utc>,
	pub has_submitted: bool,
	pub invited_by: String,
	pub created_at: DateTime<Utc>,
}

/// Bank details captured verbatim with a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
	pub account_number: String,
	pub routing_code: String,
	pub account_holder: String,
}

/// Subject metadata captured verbatim with a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectDetails {
	pub subject: String,
	pub class_level: String,
	pub board: String,
	pub exam_type: String,
}

/// A teacher's examination-paper submission with its review and payment
/// lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
	pub id: String,
	pub teacher_id: String,
	#[serde(flatten)]
	pub bank: BankDetails,
	#[serde(flatten)]
	pub details: SubjectDetails,
	pub file_name: String,
	pub file_url: String,
	pub status: SubmissionStatus,
	pub review_notes: Option<String>,
	pub payment_status: PaymentStatus,
	pub payment_amount: Option<i64>,
	pub reviewed_by: Option<String>,
	pub reviewed_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
}

/// A durable notification row. Only the read flag is ever mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
	pub id: String,
	pub recipient_id: String,
	pub title: String,
	pub message: String,
	pub severity: Severity,
	pub read: bool,
	pub related_id: Option<String>,
	pub related_kind: Option<String>,
	pub created_at: DateTime<Utc>,
}

/// Validation-tracking record for an issued URL token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlToken {
	pub token: String,
	pub kind: TokenKind,
	pub owner_id: String,
	pub is_valid: bool,
	pub validation_count: i64,
	pub last_ip: Option<String>,
	pub last_user_agent: Option<String>,
	pub expires_at: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
}

/// Per (identifier, action) attempt counter with a rolling window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitRecord {
	pub identifier: String,
	pub action: String,
	pub count: i64,
	pub window_started_at: DateTime<Utc>,
	pub blocked_until: Option<DateTime<Utc>>,
}

/// Audit-trail entry for security-relevant actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
	pub id: String,
	pub profile_id: Option<String>,
	pub kind: String,
	pub detail: String,
	pub ip: Option<String>,
	pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("pending", SubmissionStatus::Pending)]
	#[case("under_review", SubmissionStatus::UnderReview)]
	#[case("approved", SubmissionStatus::Approved)]
	#[case("rejected", SubmissionStatus::Rejected)]
	fn submission_status_round_trips(#[case] text: &str, #[case] status: SubmissionStatus) {
		assert_eq!(text.parse::<SubmissionStatus>().unwrap(), status);
		assert_eq!(status.as_str(), text);
	}

	#[rstest]
	fn unknown_status_is_a_validation_error() {
		let err = "archived".parse::<SubmissionStatus>().unwrap_err();
		assert_eq!(err.code(), "VALIDATION_ERROR");
	}

	#[rstest]
	fn token_kind_serde_uses_snake_case() {
		let json = serde_json::to_string(&TokenKind::Submission).unwrap();
		assert_eq!(json, "\"submission\"");
	}
}
