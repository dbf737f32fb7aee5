//! Notification fan-out.
//!
//! Durable row first, live push second. The broadcast channel is
//! best-effort; a subscriber that missed events reconciles through the
//! pull endpoints, and the workflow state change stands either way.

use chrono::{DateTime, Utc};
use examdesk_core::{Event, Notification, Result};
use examdesk_store::Database;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

/// Render an event into one durable row per recipient.
pub fn notification_rows(event: &Event, recipients: &[String], now: DateTime<Utc>) -> Vec<Notification> {
	recipients
		.iter()
		.map(|recipient_id| Notification {
			id: Uuid::new_v4().to_string(),
			recipient_id: recipient_id.clone(),
			title: event.title(),
			message: event.message(),
			severity: event.severity(),
			read: false,
			related_id: Some(event.related_id().to_string()),
			related_kind: Some(event.related_kind().to_string()),
			created_at: now,
		})
		.collect()
}

#[derive(Clone)]
pub struct NotificationHub {
	db: Database,
	sender: broadcast::Sender<Event>,
}

impl NotificationHub {
	pub fn new(db: Database) -> Self {
		let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
		Self { db, sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<Event> {
		self.sender.subscribe()
	}

	/// Persist rows for every recipient, then push the event to live
	/// subscribers.
	pub async fn publish(
		&self,
		event: Event,
		recipients: &[String],
		now: DateTime<Utc>,
	) -> Result<()> {
		for row in notification_rows(&event, recipients, now) {
			self.db.notifications().insert(&row).await?;
		}
		self.broadcast(event);
		Ok(())
	}

	/// Push without persisting, for events whose rows were already
	/// written inside a store transaction.
	pub fn broadcast(&self, event: Event) {
		// No receivers is not an error.
		if self.sender.send(event).is_err() {
			debug!("no live notification subscribers");
		}
	}

	pub async fn list(&self, recipient_id: &str, unread_only: bool) -> Result<Vec<Notification>> {
		self.db
			.notifications()
			.list_for_recipient(recipient_id, unread_only)
			.await
	}

	pub async fn mark_read(&self, id: &str, recipient_id: &str) -> Result<()> {
		self.db.notifications().mark_read(id, recipient_id).await
	}

	pub async fn mark_all_read(&self, recipient_id: &str) -> Result<u64> {
		self.db.notifications().mark_all_read(recipient_id).await
	}

	pub async fn unread_count(&self, recipient_id: &str) -> Result<i64> {
		self.db.notifications().unread_count(recipient_id).await
	}
}
