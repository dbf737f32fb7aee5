//! Workflow services.
//!
//! Each service owns one slice of the platform: auth and registration,
//! teacher invitations, token validation, the submission recorder, the
//! review/payment state machine, notification fan-out, rate limiting and
//! periodic cleanup. Services hold a [`Database`](examdesk_store::Database)
//! handle plus an injected clock, so everything here is exercised against
//! `sqlite::memory:` in tests.

pub mod auth;
pub mod cleanup;
pub mod notify;
pub mod rate_limit;
pub mod review;
pub mod stats;
pub mod submissions;
pub mod teachers;
pub mod tokens;

pub use auth::{AuthService, LoginRequest, RegisterRequest, UpdateProfileRequest};
pub use cleanup::{CleanupReport, CleanupTask};
pub use notify::NotificationHub;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use review::ReviewService;
pub use stats::{DashboardStats, StatsService};
pub use submissions::{SubmissionRequest, SubmissionService, TokenCheck};
pub use teachers::TeacherDirectory;
pub use tokens::TokenService;
