//! Profile accounts and their credentials.
//!
//! Credentials live in their own table so profile reads never touch the
//! password hash. Registration writes both rows in one transaction.

use chrono::{DateTime, Utc};
use examdesk_core::{Profile, Result};
use sea_query::{Alias, Expr, ExprTrait, Query, SqliteQueryBuilder};
use sqlx::AnyPool;
use sqlx::any::AnyRow;

use crate::db_err;
use crate::row::{fmt_ts, get_bool, get_str, get_ts};

const PROFILE_COLUMNS: [&str; 9] = [
	"id",
	"email",
	"full_name",
	"role",
	"is_active",
	"is_locked",
	"email_verified",
	"created_at",
	"updated_at",
];

pub struct ProfileStore {
	pool: AnyPool,
}

impl ProfileStore {
	pub(crate) fn new(pool: AnyPool) -> Self {
		Self { pool }
	}

	/// Insert the profile and its credentials row atomically.
	pub async fn insert(&self, profile: &Profile, password_hash: &str) -> Result<()> {
		let mut tx = self.pool.begin().await.map_err(db_err)?;

		let sql = Query::insert()
			.into_table(Alias::new("profiles"))
			.columns(PROFILE_COLUMNS.map(Alias::new))
			.values(
				[
					Expr::val(profile.id.as_str()),
					Expr::val(profile.email.as_str()),
					Expr::val(profile.full_name.as_str()),
					Expr::val(profile.role.as_str()),
					Expr::val(profile.is_active),
					Expr::val(profile.is_locked),
					Expr::val(profile.email_verified),
					Expr::val(fmt_ts(profile.created_at)),
					Expr::val(fmt_ts(profile.updated_at)),
				]
				.into_iter()
				.collect::<Vec<Expr>>(),
			)
			.unwrap()
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(&mut *tx).await.map_err(db_err)?;

		let sql = Query::insert()
			.into_table(Alias::new("credentials"))
			.columns([Alias::new("profile_id"), Alias::new("password_hash")])
			.values(
				[Expr::val(profile.id.as_str()), Expr::val(password_hash)]
					.into_iter()
					.collect::<Vec<Expr>>(),
			)
			.unwrap()
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(&mut *tx).await.map_err(db_err)?;

		tx.commit().await.map_err(db_err)
	}

	pub async fn find_by_id(&self, id: &str) -> Result<Option<Profile>> {
		self.find_where(Expr::col(Alias::new("id")).eq(id)).await
	}

	pub async fn find_by_email(&self, email: &str) -> Result<Option<Profile>> {
		self.find_where(Expr::col(Alias::new("email")).eq(email)).await
	}

	pub async fn email_exists(&self, email: &str) -> Result<bool> {
		Ok(self.find_by_email(email).await?.is_some())
	}

	pub async fn password_hash(&self, profile_id: &str) -> Result<Option<String>> {
		let sql = Query::select()
			.column(Alias::new("password_hash"))
			.from(Alias::new("credentials"))
			.and_where(Expr::col(Alias::new("profile_id")).eq(profile_id))
			.to_string(SqliteQueryBuilder);
		let row = sqlx::query(&sql)
			.fetch_optional(&self.pool)
			.await
			.map_err(db_err)?;
		match row {
			Some(row) => get_str(&row, "password_hash").map(Some),
			None => Ok(None),
		}
	}

	/// Rewrite the mutable profile columns from `profile`.
	pub async fn update(&self, profile: &Profile) -> Result<()> {
		let sql = Query::update()
			.table(Alias::new("profiles"))
			.values([
				(Alias::new("email"), Expr::val(profile.email.as_str())),
				(Alias::new("full_name"), Expr::val(profile.full_name.as_str())),
				(Alias::new("is_active"), Expr::val(profile.is_active)),
				(Alias::new("is_locked"), Expr::val(profile.is_locked)),
				(Alias::new("email_verified"), Expr::val(profile.email_verified)),
				(Alias::new("updated_at"), Expr::val(fmt_ts(profile.updated_at))),
			])
			.and_where(Expr::col(Alias::new("id")).eq(profile.id.as_str()))
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		Ok(())
	}

	pub async fn set_password(&self, profile_id: &str, password_hash: &str) -> Result<()> {
		let sql = Query::update()
			.table(Alias::new("credentials"))
			.values([(Alias::new("password_hash"), Expr::val(password_hash))])
			.and_where(Expr::col(Alias::new("profile_id")).eq(profile_id))
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		Ok(())
	}

	pub async fn set_last_login(&self, profile_id: &str, at: DateTime<Utc>) -> Result<()> {
		let sql = Query::update()
			.table(Alias::new("credentials"))
			.values([(Alias::new("last_login"), Expr::val(fmt_ts(at)))])
			.and_where(Expr::col(Alias::new("profile_id")).eq(profile_id))
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		Ok(())
	}

	pub async fn set_locked(&self, profile_id: &str, locked: bool, at: DateTime<Utc>) -> Result<()> {
		let sql = Query::update()
			.table(Alias::new("profiles"))
			.values([
				(Alias::new("is_locked"), Expr::val(locked)),
				(Alias::new("updated_at"), Expr::val(fmt_ts(at))),
			])
			.and_where(Expr::col(Alias::new("id")).eq(profile_id))
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(&self.pool).await.map_err(db_err)?;
		Ok(())
	}

	async fn find_where(&self, predicate: Expr) -> Result<Option<Profile>> {
		let sql = Query::select()
			.columns(PROFILE_COLUMNS.map(Alias::new))
			.from(Alias::new("profiles"))
			.and_where(predicate)
			.to_string(SqliteQueryBuilder);
		let row = sqlx::query(&sql)
			.fetch_optional(&self.pool)
			.await
			.map_err(db_err)?;
		row.map(|row| read_profile(&row)).transpose()
	}
}

fn read_profile(row: &AnyRow) -> Result<Profile> {
	Ok(Profile {
		id: get_str(row, "id")?,
		email: get_str(row, "email")?,
		full_name: get_str(row, "full_name")?,
		role: get_str(row, "role")?.parse()?,
		is_active: get_bool(row, "is_active")?,
		is_locked: get_bool(row, "is_locked")?,
		email_verified: get_bool(row, "email_verified")?,
		created_at: get_ts(row, "created_at")?,
		updated_at: get_ts(row, "updated_at")?,
	})
}
