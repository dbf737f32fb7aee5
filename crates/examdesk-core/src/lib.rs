//! Core domain types for examdesk.
//!
//! Everything the other crates agree on lives here: the error taxonomy,
//! the persistent domain model, the typed workflow events and the clock
//! seam used to make expiry behavior testable.

pub mod clock;
pub mod error;
pub mod event;
pub mod model;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use event::Event;
pub use model::{
	BankDetails, Notification, PaymentStatus, Profile, RateLimitRecord, Role, SecurityEvent,
	Severity, SubjectDetails, Submission, SubmissionStatus, Teacher, TokenKind, UrlToken,
};
