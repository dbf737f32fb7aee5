//! Clock seam.
//!
//! Services never call `Utc::now()` directly; they ask an injected
//! [`Clock`]. Tests use [`ManualClock`] to advance time instead of
//! sleeping through token expiries and rate-limit windows.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
	fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> {
		Utc::now()
	}
}

/// A clock that only moves when told to.
///
/// # Examples
///
/// ```
/// use examdesk_core::{Clock, ManualClock};
/// use chrono::Duration;
///
/// let clock = ManualClock::starting_now();
/// let before = clock.now();
/// clock.advance(Duration::days(8));
/// assert_eq!(clock.now() - before, Duration::days(8));
/// ```
pub struct ManualClock {
	now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
	pub fn new(start: DateTime<Utc>) -> Self {
		Self {
			now: Mutex::new(start),
		}
	}

	pub fn starting_now() -> Self {
		Self::new(Utc::now())
	}

	pub fn advance(&self, by: Duration) {
		let mut now = self.now.lock().expect("clock poisoned");
		*now += by;
	}

	pub fn set(&self, to: DateTime<Utc>) {
		*self.now.lock().expect("clock poisoned") = to;
	}
}

impl Clock for ManualClock {
	fn now(&self) -> DateTime<Utc> {
		*self.now.lock().expect("clock poisoned")
	}
}
