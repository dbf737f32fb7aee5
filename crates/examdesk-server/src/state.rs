//! Shared application state: every service wired once at startup.

use examdesk_auth::{Argon2Hasher, JwtAuth};
use examdesk_cache::TtlCache;
use examdesk_core::{Clock, SystemClock};
use examdesk_service::{
	AuthService, NotificationHub, RateLimiter, ReviewService, StatsService, SubmissionService,
	TeacherDirectory, TokenService,
};
use examdesk_store::Database;
use std::sync::Arc;

use crate::settings::Settings;

pub struct AppState {
	pub auth: AuthService,
	pub teachers: TeacherDirectory,
	pub submissions: SubmissionService,
	pub review: ReviewService,
	pub hub: NotificationHub,
	pub stats: StatsService,
}

impl AppState {
	pub fn new(db: Database, settings: &Settings) -> Self {
		let clock: Arc<dyn Clock> = Arc::new(SystemClock);
		Self::with_clock(db, settings, clock)
	}

	pub fn with_clock(db: Database, settings: &Settings, clock: Arc<dyn Clock>) -> Self {
		let limiter = RateLimiter::new(db.clone(), settings.rate_limit, clock.clone());
		let tokens = TokenService::new(db.clone(), limiter.clone(), clock.clone());
		let hub = NotificationHub::new(db.clone());
		let jwt = Arc::new(JwtAuth::new(
			settings.jwt_secret.as_bytes(),
			settings.access_ttl,
			settings.refresh_ttl,
		));
		let auth = AuthService::new(
			db.clone(),
			Arc::new(Argon2Hasher::new()),
			jwt,
			limiter,
			TtlCache::with_default_ttl(settings.profile_cache_ttl),
			clock.clone(),
		);
		let teachers = TeacherDirectory::new(
			db.clone(),
			tokens.clone(),
			hub.clone(),
			clock.clone(),
			settings.submission_token_ttl,
		);
		let submissions = SubmissionService::new(db.clone(), tokens, hub.clone(), clock.clone());
		let review = ReviewService::new(db.clone(), hub.clone(), clock);
		let stats = StatsService::new(db);

		Self {
			auth,
			teachers,
			submissions,
			review,
			hub,
			stats,
		}
	}
}
