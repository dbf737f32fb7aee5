//! Invited teachers and their submission tokens.

use chrono::{DateTime, Utc};
use examdesk_core::{Error, Result, Teacher};
use sea_query::{Alias, Expr, ExprTrait, Order, Query, SqliteQueryBuilder};
use sqlx::AnyPool;
use sqlx::any::AnyRow;

use crate::db_err;
use crate::row::{fmt_ts, get_bool, get_opt_str, get_str, get_ts};

const TEACHER_COLUMNS: [&str; 7] = [
	"id",
	"profile_id",
	"submission_token",
	"token_expires_at",
	"has_submitted",
	"invited_by",
	"created_at",
];

pub struct TeacherStore {
	pool: AnyPool,
}

impl TeacherStore {
	pub(crate) fn new(pool: AnyPool) -> Self {
		Self { pool }
	}

	pub async fn insert(&self, teacher: &Teacher) -> Result<()> {
		let sql = Query::insert()
			.into_table(Alias::new("teachers"))
			.columns(TEACHER_COLUMNS.map(Alias::new))
			.values(
				[
					Expr::val(teacher.id.as_str()),
					Expr::val(teacher.profile_id.clone()),
					Expr::val(teacher.submission_token.as_str()),
					Expr::val(fmt_ts(teacher.token_expires_at)),
					Expr::val(teacher.has_submitted),
					Expr::val(teacher.invited_by.as_str()),
					Expr::val(fmt_ts(teacher.created_at)),
				]
				.into_iter()
				.collect::<Vec<Expr>>(),
			)
			.unwrap()
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		Ok(())
	}

	pub async fn find_by_id(&self, id: &str) -> Result<Option<Teacher>> {
		self.find_where(Expr::col(Alias::new("id")).eq(id)).await
	}

	pub async fn find_by_token(&self, token: &str) -> Result<Option<Teacher>> {
		self.find_where(Expr::col(Alias::new("submission_token")).eq(token))
			.await
	}

	pub async fn find_by_profile(&self, profile_id: &str) -> Result<Option<Teacher>> {
		self.find_where(Expr::col(Alias::new("profile_id")).eq(profile_id))
			.await
	}

	/// All invited teachers, newest first.
	pub async fn list(&self) -> Result<Vec<Teacher>> {
		let sql = Query::select()
			.columns(TEACHER_COLUMNS.map(Alias::new))
			.from(Alias::new("teachers"))
			.order_by(Alias::new("created_at"), Order::Desc)
			.to_string(SqliteQueryBuilder);
		let rows = sqlx::query(&sql)
			.fetch_all(&self.pool)
			.await
			.map_err(db_err)?;
		rows.iter().map(read_teacher).collect()
	}

	/// Replace the submission token wholesale. Regeneration exists to let
	/// the teacher submit again, so the submitted flag is cleared too.
	pub async fn update_token(
		&self,
		teacher_id: &str,
		token: &str,
		expires_at: DateTime<Utc>,
	) -> Result<()> {
		let sql = Query::update()
			.table(Alias::new("teachers"))
			.values([
				(Alias::new("submission_token"), Expr::val(token)),
				(Alias::new("token_expires_at"), Expr::val(fmt_ts(expires_at))),
				(Alias::new("has_submitted"), Expr::val(false)),
			])
			.and_where(Expr::col(Alias::new("id")).eq(teacher_id))
			.to_string(SqliteQueryBuilder);
		let result = sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		if result.rows_affected() == 0 {
			return Err(Error::NotFound(format!("teacher {}", teacher_id)));
		}
		Ok(())
	}

	/// Claim the teacher record for a newly registered profile. Fails with
	/// a conflict if some other profile got there first.
	pub async fn link_profile(&self, teacher_id: &str, profile_id: &str) -> Result<()> {
		let sql = Query::update()
			.table(Alias::new("teachers"))
			.values([(Alias::new("profile_id"), Expr::val(profile_id))])
			.and_where(Expr::col(Alias::new("id")).eq(teacher_id))
			.and_where(Expr::col(Alias::new("profile_id")).is_null())
			.to_string(SqliteQueryBuilder);
		let result = sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		if result.rows_affected() == 0 {
			return Err(Error::Conflict(
				"invitation already claimed by another account".into(),
			));
		}
		Ok(())
	}

	pub async fn count(&self) -> Result<i64> {
		self.count_where(None).await
	}

	pub async fn count_submitted(&self) -> Result<i64> {
		self.count_where(Some(Expr::col(Alias::new("has_submitted")).eq(true)))
			.await
	}

	async fn count_where(&self, predicate: Option<Expr>) -> Result<i64> {
		let sql = {
			let mut stmt = Query::select()
				.expr(Expr::cust("COUNT(*)"))
				.from(Alias::new("teachers"))
				.to_owned();
			if let Some(predicate) = predicate {
				stmt.and_where(predicate);
			}
			stmt.to_string(SqliteQueryBuilder)
		};
		let row = sqlx::query(&sql)
			.fetch_one(&self.pool)
			.await
			.map_err(db_err)?;
		crate::row::get_i64_at(&row, 0)
	}

	async fn find_where(&self, predicate: Expr) -> Result<Option<Teacher>> {
		let sql = Query::select()
			.columns(TEACHER_COLUMNS.map(Alias::new))
			.from(Alias::new("teachers"))
			.and_where(predicate)
			.to_string(SqliteQueryBuilder);
		let row = sqlx::query(&sql)
			.fetch_optional(&self.pool)
			.await
			.map_err(db_err)?;
		row.as_ref().map(read_teacher).transpose()
	}
}

fn read_teacher(row: &AnyRow) -> Result<Teacher> {
	Ok(Teacher {
		id: get_str(row, "id")?,
		profile_id: get_opt_str(row, "profile_id")?,
		submission_token: get_str(row, "submission_token")?,
		token_expires_at: get_ts(row, "token_expires_at")?,
		has_submitted: get_bool(row, "has_submitted")?,
		invited_by: get_str(row, "invited_by")?,
		created_at: get_ts(row, "created_at")?,
	})
}
