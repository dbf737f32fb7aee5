//! Schema creation.
//!
//! Every statement is `IF NOT EXISTS`, so startup can run this
//! unconditionally against an existing database. Boolean flags are
//! INTEGER 0/1 columns; the Any driver cannot decode sqlite's BOOLEAN
//! type, and the row readers accept either representation.

use examdesk_core::Result;
use sea_query::{Alias, ColumnDef, Index, SqliteQueryBuilder, Table};
use sqlx::AnyPool;

pub(crate) async fn create_all(pool: &AnyPool) -> Result<()> {
	for sql in statements() {
		sqlx::query(&sql).execute(pool).await.map_err(crate::db_err)?;
	}
	Ok(())
}

fn statements() -> Vec<String> {
	let mut stmts = Vec::new();

	stmts.push(
		Table::create()
			.table(Alias::new("profiles"))
			.if_not_exists()
			.col(
				ColumnDef::new(Alias::new("id"))
					.string_len(36)
					.not_null()
					.primary_key(),
			)
			.col(
				ColumnDef::new(Alias::new("email"))
					.string_len(255)
					.not_null()
					.unique_key(),
			)
			.col(ColumnDef::new(Alias::new("full_name")).string_len(255).not_null())
			.col(ColumnDef::new(Alias::new("role")).string_len(16).not_null())
			.col(ColumnDef::new(Alias::new("is_active")).integer().not_null())
			.col(ColumnDef::new(Alias::new("is_locked")).integer().not_null())
			.col(ColumnDef::new(Alias::new("email_verified")).integer().not_null())
			.col(ColumnDef::new(Alias::new("created_at")).string_len(40).not_null())
			.col(ColumnDef::new(Alias::new("updated_at")).string_len(40).not_null())
			.to_string(SqliteQueryBuilder),
	);

	stmts.push(
		Table::create()
			.table(Alias::new("credentials"))
			.if_not_exists()
			.col(
				ColumnDef::new(Alias::new("profile_id"))
					.string_len(36)
					.not_null()
					.primary_key(),
			)
			.col(ColumnDef::new(Alias::new("password_hash")).text().not_null())
			.col(ColumnDef::new(Alias::new("last_login")).string_len(40))
			.to_string(SqliteQueryBuilder),
	);

	stmts.push(
		Table::create()
			.table(Alias::new("teachers"))
			.if_not_exists()
			.col(
				ColumnDef::new(Alias::new("id"))
					.string_len(36)
					.not_null()
					.primary_key(),
			)
			.col(ColumnDef::new(Alias::new("profile_id")).string_len(36))
			.col(
				ColumnDef::new(Alias::new("submission_token"))
					.string_len(64)
					.not_null()
					.unique_key(),
			)
			.col(
				ColumnDef::new(Alias::new("token_expires_at"))
					.string_len(40)
					.not_null(),
			)
			.col(ColumnDef::new(Alias::new("has_submitted")).integer().not_null())
			.col(ColumnDef::new(Alias::new("invited_by")).string_len(36).not_null())
			.col(ColumnDef::new(Alias::new("created_at")).string_len(40).not_null())
			.to_string(SqliteQueryBuilder),
	);

	stmts.push(
		Table::create()
			.table(Alias::new("submissions"))
			.if_not_exists()
			.col(
				ColumnDef::new(Alias::new("id"))
					.string_len(36)
					.not_null()
					.primary_key(),
			)
			.col(ColumnDef::new(Alias::new("teacher_id")).string_len(36).not_null())
			.col(
				ColumnDef::new(Alias::new("account_number"))
					.string_len(64)
					.not_null(),
			)
			.col(ColumnDef::new(Alias::new("routing_code")).string_len(32).not_null())
			.col(
				ColumnDef::new(Alias::new("account_holder"))
					.string_len(255)
					.not_null(),
			)
			.col(ColumnDef::new(Alias::new("subject")).string_len(128).not_null())
			.col(ColumnDef::new(Alias::new("class_level")).string_len(64).not_null())
			.col(ColumnDef::new(Alias::new("board")).string_len(128).not_null())
			.col(ColumnDef::new(Alias::new("exam_type")).string_len(64).not_null())
			.col(ColumnDef::new(Alias::new("file_name")).string_len(255).not_null())
			.col(ColumnDef::new(Alias::new("file_url")).text().not_null())
			.col(ColumnDef::new(Alias::new("status")).string_len(16).not_null())
			.col(ColumnDef::new(Alias::new("review_notes")).text())
			.col(
				ColumnDef::new(Alias::new("payment_status"))
					.string_len(16)
					.not_null(),
			)
			.col(ColumnDef::new(Alias::new("payment_amount")).big_integer())
			.col(ColumnDef::new(Alias::new("reviewed_by")).string_len(36))
			.col(ColumnDef::new(Alias::new("reviewed_at")).string_len(40))
			.col(ColumnDef::new(Alias::new("created_at")).string_len(40).not_null())
			.to_string(SqliteQueryBuilder),
	);

	stmts.push(
		Table::create()
			.table(Alias::new("notifications"))
			.if_not_exists()
			.col(
				ColumnDef::new(Alias::new("id"))
					.string_len(36)
					.not_null()
					.primary_key(),
			)
			.col(
				ColumnDef::new(Alias::new("recipient_id"))
					.string_len(36)
					.not_null(),
			)
			.col(ColumnDef::new(Alias::new("title")).string_len(255).not_null())
			.col(ColumnDef::new(Alias::new("message")).text().not_null())
			.col(ColumnDef::new(Alias::new("severity")).string_len(16).not_null())
			.col(ColumnDef::new(Alias::new("is_read")).integer().not_null())
			.col(ColumnDef::new(Alias::new("related_id")).string_len(36))
			.col(ColumnDef::new(Alias::new("related_kind")).string_len(32))
			.col(ColumnDef::new(Alias::new("created_at")).string_len(40).not_null())
			.to_string(SqliteQueryBuilder),
	);

	stmts.push(
		Table::create()
			.table(Alias::new("url_tokens"))
			.if_not_exists()
			.col(ColumnDef::new(Alias::new("token")).string_len(64).not_null())
			.col(ColumnDef::new(Alias::new("kind")).string_len(16).not_null())
			.col(ColumnDef::new(Alias::new("owner_id")).string_len(36).not_null())
			.col(ColumnDef::new(Alias::new("is_valid")).integer().not_null())
			.col(
				ColumnDef::new(Alias::new("validation_count"))
					.big_integer()
					.not_null(),
			)
			.col(ColumnDef::new(Alias::new("last_ip")).string_len(64))
			.col(ColumnDef::new(Alias::new("last_user_agent")).string_len(255))
			.col(ColumnDef::new(Alias::new("expires_at")).string_len(40).not_null())
			.col(ColumnDef::new(Alias::new("created_at")).string_len(40).not_null())
			.primary_key(Index::create().col(Alias::new("token")).col(Alias::new("kind")))
			.to_string(SqliteQueryBuilder),
	);

	stmts.push(
		Table::create()
			.table(Alias::new("rate_limits"))
			.if_not_exists()
			.col(
				ColumnDef::new(Alias::new("identifier"))
					.string_len(255)
					.not_null(),
			)
			.col(ColumnDef::new(Alias::new("action")).string_len(64).not_null())
			.col(ColumnDef::new(Alias::new("count")).big_integer().not_null())
			.col(
				ColumnDef::new(Alias::new("window_started_at"))
					.string_len(40)
					.not_null(),
			)
			.col(ColumnDef::new(Alias::new("blocked_until")).string_len(40))
			.primary_key(
				Index::create()
					.col(Alias::new("identifier"))
					.col(Alias::new("action")),
			)
			.to_string(SqliteQueryBuilder),
	);

	stmts.push(
		Table::create()
			.table(Alias::new("security_events"))
			.if_not_exists()
			.col(
				ColumnDef::new(Alias::new("id"))
					.string_len(36)
					.not_null()
					.primary_key(),
			)
			.col(ColumnDef::new(Alias::new("profile_id")).string_len(36))
			.col(ColumnDef::new(Alias::new("kind")).string_len(64).not_null())
			.col(ColumnDef::new(Alias::new("detail")).text().not_null())
			.col(ColumnDef::new(Alias::new("ip")).string_len(64))
			.col(ColumnDef::new(Alias::new("created_at")).string_len(40).not_null())
			.to_string(SqliteQueryBuilder),
	);

	for (name, table, col) in [
		("idx_submissions_teacher", "submissions", "teacher_id"),
		("idx_notifications_recipient", "notifications", "recipient_id"),
		("idx_url_tokens_expires", "url_tokens", "expires_at"),
		("idx_security_events_profile", "security_events", "profile_id"),
	] {
		stmts.push(
			Index::create()
				.if_not_exists()
				.name(name)
				.table(Alias::new(table))
				.col(Alias::new(col))
				.to_string(SqliteQueryBuilder),
		);
	}

	stmts
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_table_is_idempotent() {
		for sql in statements() {
			assert!(sql.contains("IF NOT EXISTS"), "not idempotent: {}", sql);
		}
	}
}
