//! Durable notification rows.

use examdesk_core::{Error, Notification, Result};
use sea_query::{Alias, Expr, ExprTrait, Order, Query, SqliteQueryBuilder};
use sqlx::AnyPool;
use sqlx::any::AnyRow;

use crate::db_err;
use crate::row::{fmt_ts, get_bool, get_i64_at, get_opt_str, get_str, get_ts};

const NOTIFICATION_COLUMNS: [&str; 9] = [
	"id",
	"recipient_id",
	"title",
	"message",
	"severity",
	"is_read",
	"related_id",
	"related_kind",
	"created_at",
];

/// Insert statement shared with the transactional writers in the
/// submission store.
pub(crate) fn insert_sql(notification: &Notification) -> String {
	Query::insert()
		.into_table(Alias::new("notifications"))
		.columns(NOTIFICATION_COLUMNS.map(Alias::new))
		.values(
			[
				Expr::val(notification.id.as_str()),
				Expr::val(notification.recipient_id.as_str()),
				Expr::val(notification.title.as_str()),
				Expr::val(notification.message.as_str()),
				Expr::val(notification.severity.as_str()),
				Expr::val(notification.read),
				Expr::val(notification.related_id.clone()),
				Expr::val(notification.related_kind.clone()),
				Expr::val(fmt_ts(notification.created_at)),
			]
			.into_iter()
			.collect::<Vec<Expr>>(),
		)
		.unwrap()
		.to_owned()
		.to_string(SqliteQueryBuilder)
}

pub struct NotificationStore {
	pool: AnyPool,
}

impl NotificationStore {
	pub(crate) fn new(pool: AnyPool) -> Self {
		Self { pool }
	}

	pub async fn insert(&self, notification: &Notification) -> Result<()> {
		let sql = insert_sql(notification);
		sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		Ok(())
	}

	/// A recipient's notifications, newest first.
	pub async fn list_for_recipient(
		&self,
		recipient_id: &str,
		unread_only: bool,
	) -> Result<Vec<Notification>> {
		let sql = {
			let mut stmt = Query::select()
				.columns(NOTIFICATION_COLUMNS.map(Alias::new))
				.from(Alias::new("notifications"))
				.and_where(Expr::col(Alias::new("recipient_id")).eq(recipient_id))
				.order_by(Alias::new("created_at"), Order::Desc)
				.to_owned();
			if unread_only {
				stmt.and_where(Expr::col(Alias::new("is_read")).eq(false));
			}
			stmt.to_string(SqliteQueryBuilder)
		};
		let rows = sqlx::query(&sql)
			.fetch_all(&self.pool)
			.await
			.map_err(db_err)?;
		rows.iter().map(read_notification).collect()
	}

	/// Mark one notification read, scoped to the recipient so nobody can
	/// touch another account's rows.
	pub async fn mark_read(&self, id: &str, recipient_id: &str) -> Result<()> {
		let sql = Query::update()
			.table(Alias::new("notifications"))
			.values([(Alias::new("is_read"), Expr::val(true))])
			.and_where(Expr::col(Alias::new("id")).eq(id))
			.and_where(Expr::col(Alias::new("recipient_id")).eq(recipient_id))
			.to_string(SqliteQueryBuilder);
		let result = sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		if result.rows_affected() == 0 {
			return Err(Error::NotFound(format!("notification {}", id)));
		}
		Ok(())
	}

	pub async fn mark_all_read(&self, recipient_id: &str) -> Result<u64> {
		let sql = Query::update()
			.table(Alias::new("notifications"))
			.values([(Alias::new("is_read"), Expr::val(true))])
			.and_where(Expr::col(Alias::new("recipient_id")).eq(recipient_id))
			.and_where(Expr::col(Alias::new("is_read")).eq(false))
			.to_string(SqliteQueryBuilder);
		let result = sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		Ok(result.rows_affected())
	}

	pub async fn unread_count(&self, recipient_id: &str) -> Result<i64> {
		let sql = Query::select()
			.expr(Expr::cust("COUNT(*)"))
			.from(Alias::new("notifications"))
			.and_where(Expr::col(Alias::new("recipient_id")).eq(recipient_id))
			.and_where(Expr::col(Alias::new("is_read")).eq(false))
			.to_string(SqliteQueryBuilder);
		let row = sqlx::query(&sql)
			.fetch_one(&self.pool)
			.await
			.map_err(db_err)?;
		get_i64_at(&row, 0)
	}
}

fn read_notification(row: &AnyRow) -> Result<Notification> {
	Ok(Notification {
		id: get_str(row, "id")?,
		recipient_id: get_str(row, "recipient_id")?,
		title: get_str(row, "title")?,
		message: get_str(row, "message")?,
		severity: get_str(row, "severity")?.parse()?,
		read: get_bool(row, "is_read")?,
		related_id: get_opt_str(row, "related_id")?,
		related_kind: get_opt_str(row, "related_kind")?,
		created_at: get_ts(row, "created_at")?,
	})
}
