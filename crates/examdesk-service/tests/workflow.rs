//! End-to-end workflow tests over `sqlite::memory:` with a manual clock.

use chrono::Duration;
use examdesk_auth::{Argon2Hasher, JwtAuth};
use examdesk_cache::TtlCache;
use examdesk_core::{Clock, Error, ManualClock, PaymentStatus, Role, SubmissionStatus, TokenKind};
use examdesk_service::{
	AuthService, CleanupTask, LoginRequest, NotificationHub, RateLimitConfig, RateLimiter,
	RegisterRequest, ReviewService, StatsService, SubmissionRequest, SubmissionService,
	TeacherDirectory, TokenService, UpdateProfileRequest,
};
use examdesk_store::Database;
use std::sync::Arc;

struct Harness {
	db: Database,
	clock: Arc<ManualClock>,
	auth: AuthService,
	teachers: TeacherDirectory,
	submissions: SubmissionService,
	review: ReviewService,
	hub: NotificationHub,
	stats: StatsService,
}

async fn harness_with(config: RateLimitConfig) -> Harness {
	let db = Database::connect("sqlite::memory:").await.unwrap();
	db.create_schema().await.unwrap();
	let clock = Arc::new(ManualClock::starting_now());
	let clock_dyn: Arc<dyn examdesk_core::Clock> = clock.clone();

	let limiter = RateLimiter::new(db.clone(), config, clock_dyn.clone());
	let tokens = TokenService::new(db.clone(), limiter.clone(), clock_dyn.clone());
	let hub = NotificationHub::new(db.clone());
	let jwt = Arc::new(JwtAuth::new(
		b"workflow-test-secret",
		Duration::minutes(15),
		Duration::days(7),
	));
	let auth = AuthService::new(
		db.clone(),
		Arc::new(Argon2Hasher::new()),
		jwt,
		limiter.clone(),
		TtlCache::with_default_ttl(std::time::Duration::from_secs(60)),
		clock_dyn.clone(),
	);
	let teachers = TeacherDirectory::new(
		db.clone(),
		tokens.clone(),
		hub.clone(),
		clock_dyn.clone(),
		Duration::days(7),
	);
	let submissions = SubmissionService::new(db.clone(), tokens, hub.clone(), clock_dyn.clone());
	let review = ReviewService::new(db.clone(), hub.clone(), clock_dyn);
	let stats = StatsService::new(db.clone());

	Harness {
		db,
		clock,
		auth,
		teachers,
		submissions,
		review,
		hub,
		stats,
	}
}

async fn harness() -> Harness {
	// Generous limits so only the dedicated tests exercise blocking.
	harness_with(RateLimitConfig {
		max_attempts: 100,
		window: Duration::minutes(15),
		block: Duration::minutes(15),
	})
	.await
}

async fn bootstrap_admin(h: &Harness) -> String {
	h.auth
		.ensure_admin("admin@example.com", "admin-password", "Admin")
		.await
		.unwrap();
	h.db.profiles()
		.find_by_email("admin@example.com")
		.await
		.unwrap()
		.unwrap()
		.id
}

fn paper() -> SubmissionRequest {
	SubmissionRequest {
		account_number: "001122334455".to_string(),
		routing_code: "EXAM0001".to_string(),
		account_holder: "Priya Sharma".to_string(),
		subject: "Mathematics".to_string(),
		class_level: "10".to_string(),
		board: "CBSE".to_string(),
		exam_type: "half-yearly".to_string(),
		file_name: "maths-half-yearly.pdf".to_string(),
		file_url: "https://files.example/maths-half-yearly.pdf".to_string(),
	}
}

#[tokio::test]
async fn invite_validate_submit_happy_path() {
	let h = harness().await;
	let admin_id = bootstrap_admin(&h).await;

	let teacher = h.teachers.invite(&admin_id).await.unwrap();
	assert!(!teacher.has_submitted);

	let check = h
		.submissions
		.validate_token(&teacher.submission_token, Some("10.0.0.1"), Some("test"))
		.await
		.unwrap();
	assert_eq!(check.teacher_id, teacher.id);
	assert_eq!(check.validation_count, 1);

	let submission = h
		.submissions
		.submit(&teacher.submission_token, Some("10.0.0.1"), None, paper())
		.await
		.unwrap();
	assert_eq!(submission.status, SubmissionStatus::Pending);
	assert_eq!(submission.payment_status, PaymentStatus::Pending);

	// Token is consumed by the submission.
	let err = h
		.submissions
		.validate_token(&teacher.submission_token, Some("10.0.0.1"), None)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::TokenInvalidated));
}

#[tokio::test]
async fn a_token_is_multi_use_until_submission() {
	let h = harness().await;
	let admin_id = bootstrap_admin(&h).await;
	let teacher = h.teachers.invite(&admin_id).await.unwrap();

	for expected_count in 1..=3 {
		let check = h
			.submissions
			.validate_token(&teacher.submission_token, Some("10.0.0.1"), None)
			.await
			.unwrap();
		assert_eq!(check.validation_count, expected_count);
	}
}

#[tokio::test]
async fn expired_tokens_never_validate() {
	let h = harness().await;
	let admin_id = bootstrap_admin(&h).await;
	let teacher = h.teachers.invite(&admin_id).await.unwrap();

	h.clock.advance(Duration::days(8));
	let err = h
		.submissions
		.validate_token(&teacher.submission_token, Some("10.0.0.1"), None)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::TokenExpired));

	// Regeneration issues a fresh, working token.
	let refreshed = h.teachers.regenerate_token(&teacher.id).await.unwrap();
	assert_ne!(refreshed.submission_token, teacher.submission_token);
	h.submissions
		.validate_token(&refreshed.submission_token, Some("10.0.0.1"), None)
		.await
		.unwrap();
}

#[tokio::test]
async fn double_submission_is_rejected() {
	let h = harness().await;
	let admin_id = bootstrap_admin(&h).await;
	let teacher = h.teachers.invite(&admin_id).await.unwrap();

	h.submissions
		.submit(&teacher.submission_token, Some("10.0.0.1"), None, paper())
		.await
		.unwrap();
	let err = h
		.submissions
		.submit(&teacher.submission_token, Some("10.0.0.1"), None, paper())
		.await
		.unwrap_err();
	// The consumed token is refused before the has_submitted guard.
	assert!(matches!(err, Error::TokenInvalidated));
}

#[tokio::test]
async fn submission_fans_out_to_teacher_and_admin() {
	let h = harness().await;
	let admin_id = bootstrap_admin(&h).await;
	let teacher = h.teachers.invite(&admin_id).await.unwrap();

	// Invitation alert for the admin.
	assert_eq!(h.hub.unread_count(&admin_id).await.unwrap(), 1);

	// The teacher claims the invitation with an account.
	let profile = h
		.auth
		.register(
			RegisterRequest {
				email: "priya@example.com".to_string(),
				password: "priya-secret".to_string(),
				full_name: "Priya Sharma".to_string(),
				invite_token: Some(teacher.submission_token.clone()),
			},
			None,
		)
		.await
		.unwrap();
	assert_eq!(profile.role, Role::Teacher);

	let mut live = h.hub.subscribe();
	h.submissions
		.submit(&teacher.submission_token, Some("10.0.0.1"), None, paper())
		.await
		.unwrap();

	// One durable row each, plus a live event.
	assert_eq!(h.hub.unread_count(&profile.id).await.unwrap(), 1);
	assert_eq!(h.hub.unread_count(&admin_id).await.unwrap(), 2);
	assert!(matches!(
		live.try_recv().unwrap(),
		examdesk_core::Event::SubmissionReceived { .. }
	));

	let inbox = h.hub.list(&profile.id, true).await.unwrap();
	assert_eq!(inbox.len(), 1);
	h.hub.mark_read(&inbox[0].id, &profile.id).await.unwrap();
	assert_eq!(h.hub.unread_count(&profile.id).await.unwrap(), 0);
}

#[tokio::test]
async fn review_approval_starts_payment_processing() {
	let h = harness().await;
	let admin_id = bootstrap_admin(&h).await;
	let teacher = h.teachers.invite(&admin_id).await.unwrap();
	let submission = h
		.submissions
		.submit(&teacher.submission_token, Some("10.0.0.1"), None, paper())
		.await
		.unwrap();

	let reviewed = h
		.review
		.review(
			&submission.id,
			&admin_id,
			SubmissionStatus::Approved,
			Some("clean paper".to_string()),
			Some(250_00),
		)
		.await
		.unwrap();
	assert_eq!(reviewed.status, SubmissionStatus::Approved);
	assert_eq!(reviewed.payment_status, PaymentStatus::Processing);
	assert_eq!(reviewed.payment_amount, Some(250_00));
	assert_eq!(reviewed.reviewed_by.as_deref(), Some(admin_id.as_str()));

	// Terminal states do not move.
	let err = h
		.review
		.review(&submission.id, &admin_id, SubmissionStatus::Rejected, None, None)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Conflict(_)));

	let paid = h
		.review
		.update_payment(&submission.id, &admin_id, PaymentStatus::Completed)
		.await
		.unwrap();
	assert_eq!(paid.payment_status, PaymentStatus::Completed);

	let err = h
		.review
		.update_payment(&submission.id, &admin_id, PaymentStatus::Processing)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn payment_is_refused_before_approval() {
	let h = harness().await;
	let admin_id = bootstrap_admin(&h).await;
	let teacher = h.teachers.invite(&admin_id).await.unwrap();
	let submission = h
		.submissions
		.submit(&teacher.submission_token, Some("10.0.0.1"), None, paper())
		.await
		.unwrap();

	let err = h
		.review
		.update_payment(&submission.id, &admin_id, PaymentStatus::Completed)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn rate_limiter_blocks_and_recovers() {
	let h = harness_with(RateLimitConfig {
		max_attempts: 3,
		window: Duration::minutes(15),
		block: Duration::minutes(15),
	})
	.await;
	let admin_id = bootstrap_admin(&h).await;
	let teacher = h.teachers.invite(&admin_id).await.unwrap();

	for _ in 0..3 {
		h.submissions
			.validate_token(&teacher.submission_token, Some("10.9.9.9"), None)
			.await
			.unwrap();
	}
	let err = h
		.submissions
		.validate_token(&teacher.submission_token, Some("10.9.9.9"), None)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::RateLimited { .. }));

	// A different client is unaffected.
	h.submissions
		.validate_token(&teacher.submission_token, Some("10.8.8.8"), None)
		.await
		.unwrap();

	// The block lapses with time.
	h.clock.advance(Duration::minutes(16));
	h.submissions
		.validate_token(&teacher.submission_token, Some("10.9.9.9"), None)
		.await
		.unwrap();
}

#[tokio::test]
async fn login_attempts_are_limited_per_email_across_addresses() {
	let h = harness_with(RateLimitConfig {
		max_attempts: 5,
		window: Duration::minutes(15),
		block: Duration::minutes(15),
	})
	.await;
	h.auth
		.register(
			RegisterRequest {
				email: "victim@example.com".to_string(),
				password: "victim-secret".to_string(),
				full_name: "Victim".to_string(),
				invite_token: None,
			},
			None,
		)
		.await
		.unwrap();

	// Five wrong guesses, each from a different address.
	for n in 0..5 {
		let err = h
			.auth
			.login(
				LoginRequest {
					email: "victim@example.com".to_string(),
					password: "wrong".to_string(),
				},
				Some(&format!("10.0.0.{}", n)),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, Error::Authentication(_)));
	}

	// The sixth attempt is refused even with the right password.
	let err = h
		.auth
		.login(
			LoginRequest {
				email: "victim@example.com".to_string(),
				password: "victim-secret".to_string(),
			},
			Some("10.0.0.5"),
		)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::RateLimited { .. }));

	// Once the block lapses, the real owner gets back in.
	h.clock.advance(Duration::minutes(16));
	h.auth
		.login(
			LoginRequest {
				email: "victim@example.com".to_string(),
				password: "victim-secret".to_string(),
			},
			Some("10.0.0.6"),
		)
		.await
		.unwrap();
}

#[tokio::test]
async fn login_lockout_and_refresh_rotation() {
	let h = harness().await;
	h.auth
		.register(
			RegisterRequest {
				email: "maya@example.com".to_string(),
				password: "maya-secret".to_string(),
				full_name: "Maya".to_string(),
				invite_token: None,
			},
			None,
		)
		.await
		.unwrap();

	let err = h
		.auth
		.login(
			LoginRequest {
				email: "maya@example.com".to_string(),
				password: "wrong".to_string(),
			},
			Some("10.0.0.1"),
		)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Authentication(_)));

	let (profile, pair) = h
		.auth
		.login(
			LoginRequest {
				email: "maya@example.com".to_string(),
				password: "maya-secret".to_string(),
			},
			Some("10.0.0.1"),
		)
		.await
		.unwrap();

	let authed = h.auth.authenticate(&pair.access_token).await.unwrap();
	assert_eq!(authed.id, profile.id);
	// Access tokens are not refresh tokens.
	assert!(h.auth.refresh(&pair.access_token).await.is_err());
	let rotated = h.auth.refresh(&pair.refresh_token).await.unwrap();
	assert!(
		h.auth
			.authenticate(&rotated.access_token)
			.await
			.is_ok()
	);

	// A locked account can no longer sign in.
	h.db.profiles()
		.set_locked(&profile.id, true, h.clock.now())
		.await
		.unwrap();
	let err = h
		.auth
		.login(
			LoginRequest {
				email: "maya@example.com".to_string(),
				password: "maya-secret".to_string(),
			},
			Some("10.0.0.1"),
		)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Forbidden(_)));

	let events = h.auth.security_events(&profile.id, 10).await.unwrap();
	assert!(events.iter().any(|e| e.kind == "login_succeeded"));
	assert!(events.iter().any(|e| e.kind == "login_blocked"));
}

#[tokio::test]
async fn profile_update_round_trips_and_invalidates_the_cache() {
	let h = harness().await;
	let profile = h
		.auth
		.register(
			RegisterRequest {
				email: "ravi@example.com".to_string(),
				password: "ravi-secret".to_string(),
				full_name: "Ravi".to_string(),
				invite_token: None,
			},
			None,
		)
		.await
		.unwrap();

	// Prime the cache.
	h.auth.profile(&profile.id).await.unwrap();

	let updated = h
		.auth
		.update_profile(
			&profile.id,
			UpdateProfileRequest {
				email: Some("ravi.k@example.com".to_string()),
				full_name: Some("Ravi K".to_string()),
			},
		)
		.await
		.unwrap();
	assert_eq!(updated.email, "ravi.k@example.com");
	assert!(!updated.email_verified);

	// The next read sees the new values, not a stale cache entry.
	let fetched = h.auth.profile(&profile.id).await.unwrap();
	assert_eq!(fetched.full_name, "Ravi K");
}

#[tokio::test]
async fn change_password_requires_the_current_one() {
	let h = harness().await;
	let profile = h
		.auth
		.register(
			RegisterRequest {
				email: "nina@example.com".to_string(),
				password: "first-password".to_string(),
				full_name: "Nina".to_string(),
				invite_token: None,
			},
			None,
		)
		.await
		.unwrap();

	let err = h
		.auth
		.change_password(&profile.id, "not-it", "second-password", None)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Authentication(_)));

	h.auth
		.change_password(&profile.id, "first-password", "second-password", None)
		.await
		.unwrap();
	h.auth
		.login(
			LoginRequest {
				email: "nina@example.com".to_string(),
				password: "second-password".to_string(),
			},
			None,
		)
		.await
		.unwrap();
}

#[tokio::test]
async fn registering_with_a_bogus_invite_creates_nothing() {
	let h = harness().await;
	let err = h
		.auth
		.register(
			RegisterRequest {
				email: "ghost@example.com".to_string(),
				password: "ghost-secret".to_string(),
				full_name: "Ghost".to_string(),
				invite_token: Some("deadbeefdeadbeefdeadbeefdeadbeef".to_string()),
			},
			None,
		)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::InvalidToken));
	assert!(
		!h.db
			.profiles()
			.email_exists("ghost@example.com")
			.await
			.unwrap()
	);
}

#[tokio::test]
async fn dead_invite_tokens_cannot_be_claimed_at_registration() {
	let h = harness().await;
	let admin_id = bootstrap_admin(&h).await;

	// A consumed token is refused.
	let consumed = h.teachers.invite(&admin_id).await.unwrap();
	h.submissions
		.submit(&consumed.submission_token, Some("10.0.0.1"), None, paper())
		.await
		.unwrap();
	let err = h
		.auth
		.register(
			RegisterRequest {
				email: "late@example.com".to_string(),
				password: "late-secret".to_string(),
				full_name: "Late".to_string(),
				invite_token: Some(consumed.submission_token.clone()),
			},
			None,
		)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::TokenInvalidated));

	// An expired token is refused the same way the wizard refuses it.
	let expired = h.teachers.invite(&admin_id).await.unwrap();
	h.clock.advance(Duration::days(8));
	let err = h
		.auth
		.register(
			RegisterRequest {
				email: "late@example.com".to_string(),
				password: "late-secret".to_string(),
				full_name: "Late".to_string(),
				invite_token: Some(expired.submission_token.clone()),
			},
			None,
		)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::TokenExpired));

	// Neither attempt created an account or linked a record.
	assert!(
		!h.db
			.profiles()
			.email_exists("late@example.com")
			.await
			.unwrap()
	);
	let unclaimed = h.db.teachers().find_by_id(&expired.id).await.unwrap().unwrap();
	assert!(unclaimed.profile_id.is_none());
}

#[tokio::test]
async fn approval_requires_a_payment_amount() {
	let h = harness().await;
	let admin_id = bootstrap_admin(&h).await;
	let teacher = h.teachers.invite(&admin_id).await.unwrap();
	let submission = h
		.submissions
		.submit(&teacher.submission_token, Some("10.0.0.1"), None, paper())
		.await
		.unwrap();

	let err = h
		.review
		.review(&submission.id, &admin_id, SubmissionStatus::Approved, None, None)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::Validation(_)));

	// The refusal left the submission untouched.
	let unchanged = h.review.get(&submission.id).await.unwrap();
	assert_eq!(unchanged.status, SubmissionStatus::Pending);
	assert_eq!(unchanged.payment_status, PaymentStatus::Pending);
	assert_eq!(unchanged.payment_amount, None);

	// Rejection still needs no amount.
	h.review
		.review(&submission.id, &admin_id, SubmissionStatus::Rejected, None, None)
		.await
		.unwrap();
}

#[tokio::test]
async fn dashboard_stats_aggregate_the_pipeline() {
	let h = harness().await;
	let admin_id = bootstrap_admin(&h).await;

	let t1 = h.teachers.invite(&admin_id).await.unwrap();
	let t2 = h.teachers.invite(&admin_id).await.unwrap();
	let s1 = h
		.submissions
		.submit(&t1.submission_token, Some("10.0.0.1"), None, paper())
		.await
		.unwrap();
	h.submissions
		.submit(&t2.submission_token, Some("10.0.0.1"), None, paper())
		.await
		.unwrap();
	h.review
		.review(&s1.id, &admin_id, SubmissionStatus::Approved, None, Some(100))
		.await
		.unwrap();

	let stats = h.stats.dashboard().await.unwrap();
	assert_eq!(stats.teachers_invited, 2);
	assert_eq!(stats.teachers_submitted, 2);
	assert_eq!(stats.submissions_total, 2);
	assert_eq!(stats.pending, 1);
	assert_eq!(stats.approved, 1);
}

#[tokio::test]
async fn cleanup_prunes_expired_tokens() {
	let h = harness().await;
	let admin_id = bootstrap_admin(&h).await;
	let teacher = h.teachers.invite(&admin_id).await.unwrap();

	h.clock.advance(Duration::days(8));
	let task = CleanupTask::new(
		h.db.clone(),
		h.clock.clone(),
		std::time::Duration::from_secs(3600),
	);
	let report = task.run_once().await.unwrap();
	assert_eq!(report.tokens, 1);

	assert!(
		h.db.url_tokens()
			.find(&teacher.submission_token, TokenKind::Submission)
			.await
			.unwrap()
			.is_none()
	);
}

#[tokio::test]
async fn cleanup_runs_on_a_spawned_task() {
	let h = harness().await;
	let admin_id = bootstrap_admin(&h).await;
	h.teachers.invite(&admin_id).await.unwrap();

	h.clock.advance(Duration::days(8));
	let task = CleanupTask::new(
		h.db.clone(),
		h.clock.clone(),
		std::time::Duration::from_secs(3600),
	);
	// Crossing a task boundary requires the whole pass to be Send.
	let report = tokio::spawn(async move { task.run_once().await })
		.await
		.unwrap()
		.unwrap();
	assert_eq!(report.tokens, 1);
}
