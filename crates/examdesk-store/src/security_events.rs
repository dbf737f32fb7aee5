//! Append-only security audit trail.

use chrono::{DateTime, Utc};
use examdesk_core::{Result, SecurityEvent};
use sea_query::{Alias, Expr, ExprTrait, Order, Query, SqliteQueryBuilder};
use sqlx::AnyPool;
use sqlx::any::AnyRow;

use crate::db_err;
use crate::row::{fmt_ts, get_opt_str, get_str, get_ts};

const EVENT_COLUMNS: [&str; 6] = ["id", "profile_id", "kind", "detail", "ip", "created_at"];

pub struct SecurityEventStore {
	pool: AnyPool,
}

impl SecurityEventStore {
	pub(crate) fn new(pool: AnyPool) -> Self {
		Self { pool }
	}

	pub async fn insert(&self, event: &SecurityEvent) -> Result<()> {
		let sql = Query::insert()
			.into_table(Alias::new("security_events"))
			.columns(EVENT_COLUMNS.map(Alias::new))
			.values(
				[
					Expr::val(event.id.as_str()),
					Expr::val(event.profile_id.clone()),
					Expr::val(event.kind.as_str()),
					Expr::val(event.detail.as_str()),
					Expr::val(event.ip.clone()),
					Expr::val(fmt_ts(event.created_at)),
				]
				.into_iter()
				.collect::<Vec<Expr>>(),
			)
			.unwrap()
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		Ok(())
	}

	/// Events for one profile, newest first, capped at `limit`.
	pub async fn list_for_profile(&self, profile_id: &str, limit: u64) -> Result<Vec<SecurityEvent>> {
		let sql = Query::select()
			.columns(EVENT_COLUMNS.map(Alias::new))
			.from(Alias::new("security_events"))
			.and_where(Expr::col(Alias::new("profile_id")).eq(profile_id))
			.order_by(Alias::new("created_at"), Order::Desc)
			.limit(limit)
			.to_string(SqliteQueryBuilder);
		let rows = sqlx::query(&sql)
			.fetch_all(&self.pool)
			.await
			.map_err(db_err)?;
		rows.iter().map(read_event).collect()
	}

	pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
		let sql = Query::delete()
			.from_table(Alias::new("security_events"))
			.and_where(Expr::col(Alias::new("created_at")).lt(fmt_ts(cutoff)))
			.to_string(SqliteQueryBuilder);
		let result = sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		Ok(result.rows_affected())
	}
}

fn read_event(row: &AnyRow) -> Result<SecurityEvent> {
	Ok(SecurityEvent {
		id: get_str(row, "id")?,
		profile_id: get_opt_str(row, "profile_id")?,
		kind: get_str(row, "kind")?,
		detail: get_str(row, "detail")?,
		ip: get_opt_str(row, "ip")?,
		created_at: get_ts(row, "created_at")?,
	})
}
