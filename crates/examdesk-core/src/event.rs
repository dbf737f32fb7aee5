//! Typed workflow events.
//!
//! One variant per event kind, each with its own payload. The fan-out
//! layer renders these into notification rows and broadcasts them to
//! live subscribers; nothing in the system switches on stringly-typed
//! event names.

use crate::model::{PaymentStatus, Severity, SubmissionStatus};
use serde::{Deserialize, Serialize};

/// A workflow state change worth telling someone about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
	/// A teacher completed the submission wizard.
	SubmissionReceived {
		submission_id: String,
		teacher_id: String,
		subject: String,
	},
	/// An admin moved a submission through the review lifecycle.
	ReviewUpdated {
		submission_id: String,
		status: SubmissionStatus,
		notes: Option<String>,
		payment_amount: Option<i64>,
	},
	/// An admin advanced the payment lifecycle.
	PaymentUpdated {
		submission_id: String,
		payment_status: PaymentStatus,
		amount: Option<i64>,
	},
	/// An admin created a teacher invitation.
	TeacherInvited {
		teacher_id: String,
		invited_by: String,
	},
}

impl Event {
	/// Notification title for this event.
	pub fn title(&self) -> String {
		match self {
			Event::SubmissionReceived { .. } => "Submission received".to_string(),
			Event::ReviewUpdated { status, .. } => match status {
				SubmissionStatus::Approved => "Submission approved".to_string(),
				SubmissionStatus::Rejected => "Submission rejected".to_string(),
				_ => "Submission under review".to_string(),
			},
			Event::PaymentUpdated { payment_status, .. } => {
				format!("Payment {}", payment_status)
			}
			Event::TeacherInvited { .. } => "Teacher invited".to_string(),
		}
	}

	/// Notification body for this event.
	pub fn message(&self) -> String {
		match self {
			Event::SubmissionReceived { subject, .. } => format!(
				"Your {} paper was received and is pending review.",
				subject
			),
			Event::ReviewUpdated {
				status,
				notes,
				payment_amount,
				..
			} => {
				let mut message = match status {
					SubmissionStatus::Approved => match payment_amount {
						Some(amount) => format!(
							"Your submission was approved. A payment of {} is being processed.",
							amount
						),
						None => "Your submission was approved.".to_string(),
					},
					SubmissionStatus::Rejected => "Your submission was rejected.".to_string(),
					_ => "Your submission is under review.".to_string(),
				};
				if let Some(notes) = notes {
					message.push(' ');
					message.push_str(notes);
				}
				message
			}
			Event::PaymentUpdated {
				payment_status,
				amount,
				..
			} => match amount {
				Some(amount) => format!("Payment of {} is {}.", amount, payment_status),
				None => format!("Payment is {}.", payment_status),
			},
			Event::TeacherInvited { .. } => {
				"A new teacher invitation was created.".to_string()
			}
		}
	}

	/// Display severity of the notification rendered from this event.
	pub fn severity(&self) -> Severity {
		match self {
			Event::SubmissionReceived { .. } => Severity::Success,
			Event::ReviewUpdated { status, .. } => match status {
				SubmissionStatus::Approved => Severity::Success,
				SubmissionStatus::Rejected => Severity::Error,
				_ => Severity::Info,
			},
			Event::PaymentUpdated { payment_status, .. } => match payment_status {
				PaymentStatus::Completed => Severity::Success,
				PaymentStatus::Failed => Severity::Error,
				_ => Severity::Info,
			},
			Event::TeacherInvited { .. } => Severity::Info,
		}
	}

	/// Related entity id recorded on the notification row.
	pub fn related_id(&self) -> &str {
		match self {
			Event::SubmissionReceived { submission_id, .. } => submission_id,
			Event::ReviewUpdated { submission_id, .. } => submission_id,
			Event::PaymentUpdated { submission_id, .. } => submission_id,
			Event::TeacherInvited { teacher_id, .. } => teacher_id,
		}
	}

	/// Related entity kind recorded on the notification row.
	pub fn related_kind(&self) -> &'static str {
		match self {
			Event::TeacherInvited { .. } => "teacher",
			_ => "submission",
		}
	}
}
