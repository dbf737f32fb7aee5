//! Rate-limit counters, keyed by `(identifier, action)`.

use chrono::{DateTime, Utc};
use examdesk_core::{RateLimitRecord, Result};
use sea_query::{Alias, Expr, ExprTrait, Query, SqliteQueryBuilder};
use sqlx::AnyPool;
use sqlx::any::AnyRow;

use crate::db_err;
use crate::row::{fmt_ts, get_i64, get_opt_ts, get_str, get_ts};

const RATE_LIMIT_COLUMNS: [&str; 5] = [
	"identifier",
	"action",
	"count",
	"window_started_at",
	"blocked_until",
];

pub struct RateLimitStore {
	pool: AnyPool,
}

impl RateLimitStore {
	pub(crate) fn new(pool: AnyPool) -> Self {
		Self { pool }
	}

	pub async fn find(&self, identifier: &str, action: &str) -> Result<Option<RateLimitRecord>> {
		let sql = Query::select()
			.columns(RATE_LIMIT_COLUMNS.map(Alias::new))
			.from(Alias::new("rate_limits"))
			.and_where(Expr::col(Alias::new("identifier")).eq(identifier))
			.and_where(Expr::col(Alias::new("action")).eq(action))
			.to_string(SqliteQueryBuilder);
		let row = sqlx::query(&sql)
			.fetch_optional(&self.pool)
			.await
			.map_err(db_err)?;
		row.as_ref().map(read_record).transpose()
	}

	/// Upsert via delete-then-insert, the portable form for the Any
	/// driver.
	pub async fn save(&self, record: &RateLimitRecord) -> Result<()> {
		let mut tx = self.pool.begin().await.map_err(db_err)?;

		let sql = Query::delete()
			.from_table(Alias::new("rate_limits"))
			.and_where(Expr::col(Alias::new("identifier")).eq(record.identifier.as_str()))
			.and_where(Expr::col(Alias::new("action")).eq(record.action.as_str()))
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(&mut *tx).await.map_err(db_err)?;

		let sql = Query::insert()
			.into_table(Alias::new("rate_limits"))
			.columns(RATE_LIMIT_COLUMNS.map(Alias::new))
			.values(
				[
					Expr::val(record.identifier.as_str()),
					Expr::val(record.action.as_str()),
					Expr::val(record.count),
					Expr::val(fmt_ts(record.window_started_at)),
					Expr::val(record.blocked_until.map(fmt_ts)),
				]
				.into_iter()
				.collect::<Vec<Expr>>(),
			)
			.unwrap()
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(&mut *tx).await.map_err(db_err)?;

		tx.commit().await.map_err(db_err)
	}

	/// Drop counters whose window started before `older_than` and whose
	/// block, if any, has lapsed.
	pub async fn delete_stale(&self, older_than: DateTime<Utc>) -> Result<u64> {
		let cutoff = fmt_ts(older_than);
		let sql = Query::delete()
			.from_table(Alias::new("rate_limits"))
			.and_where(Expr::col(Alias::new("window_started_at")).lt(cutoff.as_str()))
			.and_where(
				Expr::col(Alias::new("blocked_until"))
					.is_null()
					.or(Expr::col(Alias::new("blocked_until")).lt(cutoff.as_str())),
			)
			.to_string(SqliteQueryBuilder);
		let result = sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		Ok(result.rows_affected())
	}
}

fn read_record(row: &AnyRow) -> Result<RateLimitRecord> {
	Ok(RateLimitRecord {
		identifier: get_str(row, "identifier")?,
		action: get_str(row, "action")?,
		count: get_i64(row, "count")?,
		window_started_at: get_ts(row, "window_started_at")?,
		blocked_until: get_opt_ts(row, "blocked_until")?,
	})
}
