//! URL token tracking.
//!
//! One row per issued token, keyed by `(token, kind)`. Validation never
//! consumes a token here; only an explicit `mark_invalid` (or the
//! submission transaction) retires one.

use chrono::{DateTime, Utc};
use examdesk_core::{Result, TokenKind, UrlToken};
use sea_query::{Alias, Expr, ExprTrait, Query, SqliteQueryBuilder};
use sqlx::AnyPool;
use sqlx::any::AnyRow;

use crate::db_err;
use crate::row::{fmt_ts, get_bool, get_i64, get_opt_str, get_str, get_ts};

const TOKEN_COLUMNS: [&str; 9] = [
	"token",
	"kind",
	"owner_id",
	"is_valid",
	"validation_count",
	"last_ip",
	"last_user_agent",
	"expires_at",
	"created_at",
];

pub struct UrlTokenStore {
	pool: AnyPool,
}

impl UrlTokenStore {
	pub(crate) fn new(pool: AnyPool) -> Self {
		Self { pool }
	}

	/// Record a freshly issued token, retiring any earlier token of the
	/// same kind for the same owner. Delete-then-insert keeps this
	/// portable across backends.
	pub async fn save(&self, token: &UrlToken) -> Result<()> {
		let mut tx = self.pool.begin().await.map_err(db_err)?;

		let sql = Query::delete()
			.from_table(Alias::new("url_tokens"))
			.and_where(Expr::col(Alias::new("owner_id")).eq(token.owner_id.as_str()))
			.and_where(Expr::col(Alias::new("kind")).eq(token.kind.as_str()))
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(&mut *tx).await.map_err(db_err)?;

		let sql = Query::insert()
			.into_table(Alias::new("url_tokens"))
			.columns(TOKEN_COLUMNS.map(Alias::new))
			.values(
				[
					Expr::val(token.token.as_str()),
					Expr::val(token.kind.as_str()),
					Expr::val(token.owner_id.as_str()),
					Expr::val(token.is_valid),
					Expr::val(token.validation_count),
					Expr::val(token.last_ip.clone()),
					Expr::val(token.last_user_agent.clone()),
					Expr::val(fmt_ts(token.expires_at)),
					Expr::val(fmt_ts(token.created_at)),
				]
				.into_iter()
				.collect::<Vec<Expr>>(),
			)
			.unwrap()
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(&mut *tx).await.map_err(db_err)?;

		tx.commit().await.map_err(db_err)
	}

	pub async fn find(&self, token: &str, kind: TokenKind) -> Result<Option<UrlToken>> {
		let sql = Query::select()
			.columns(TOKEN_COLUMNS.map(Alias::new))
			.from(Alias::new("url_tokens"))
			.and_where(Expr::col(Alias::new("token")).eq(token))
			.and_where(Expr::col(Alias::new("kind")).eq(kind.as_str()))
			.to_string(SqliteQueryBuilder);
		let row = sqlx::query(&sql)
			.fetch_optional(&self.pool)
			.await
			.map_err(db_err)?;
		row.as_ref().map(read_token).transpose()
	}

	pub async fn mark_invalid(&self, token: &str, kind: TokenKind) -> Result<()> {
		let sql = Query::update()
			.table(Alias::new("url_tokens"))
			.values([(Alias::new("is_valid"), Expr::val(false))])
			.and_where(Expr::col(Alias::new("token")).eq(token))
			.and_where(Expr::col(Alias::new("kind")).eq(kind.as_str()))
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		Ok(())
	}

	/// Bump the validation counter and remember who asked.
	pub async fn record_validation(
		&self,
		token: &str,
		kind: TokenKind,
		ip: Option<&str>,
		user_agent: Option<&str>,
	) -> Result<()> {
		let sql = Query::update()
			.table(Alias::new("url_tokens"))
			.value(
				Alias::new("validation_count"),
				Expr::col(Alias::new("validation_count")).add(1),
			)
			.values([
				(Alias::new("last_ip"), Expr::val(ip)),
				(Alias::new("last_user_agent"), Expr::val(user_agent)),
			])
			.and_where(Expr::col(Alias::new("token")).eq(token))
			.and_where(Expr::col(Alias::new("kind")).eq(kind.as_str()))
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		Ok(())
	}

	/// Drop rows whose expiry has passed. Invalidated-but-live rows stay
	/// for the audit trail until they expire too.
	pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
		let sql = Query::delete()
			.from_table(Alias::new("url_tokens"))
			.and_where(Expr::col(Alias::new("expires_at")).lt(fmt_ts(now)))
			.to_string(SqliteQueryBuilder);
		let result = sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		Ok(result.rows_affected())
	}
}

fn read_token(row: &AnyRow) -> Result<UrlToken> {
	Ok(UrlToken {
		token: get_str(row, "token")?,
		kind: get_str(row, "kind")?.parse()?,
		owner_id: get_str(row, "owner_id")?,
		is_valid: get_bool(row, "is_valid")?,
		validation_count: get_i64(row, "validation_count")?,
		last_ip: get_opt_str(row, "last_ip")?,
		last_user_agent: get_opt_str(row, "last_user_agent")?,
		expires_at: get_ts(row, "expires_at")?,
		created_at: get_ts(row, "created_at")?,
	})
}
