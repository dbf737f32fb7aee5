//! Submissions and their review/payment lifecycle.

use examdesk_core::{
	BankDetails, Error, Result, SubjectDetails, Submission, SubmissionStatus, Notification,
};
use sea_query::{Alias, Expr, ExprTrait, Order, Query, SqliteQueryBuilder};
use sqlx::AnyPool;
use sqlx::any::AnyRow;

use crate::db_err;
use crate::row::{fmt_ts, get_i64_at, get_opt_i64, get_opt_str, get_opt_ts, get_str, get_ts};

const SUBMISSION_COLUMNS: [&str; 18] = [
	"id",
	"teacher_id",
	"account_number",
	"routing_code",
	"account_holder",
	"subject",
	"class_level",
	"board",
	"exam_type",
	"file_name",
	"file_url",
	"status",
	"review_notes",
	"payment_status",
	"payment_amount",
	"reviewed_by",
	"reviewed_at",
	"created_at",
];

pub struct SubmissionStore {
	pool: AnyPool,
}

impl SubmissionStore {
	pub(crate) fn new(pool: AnyPool) -> Self {
		Self { pool }
	}

	/// Record a submission atomically: flip the teacher's submitted flag,
	/// insert the submission, invalidate the submission token and write
	/// the notification rows. The flag update doubles as the one-per-token
	/// guard; losing the race rolls everything back as a conflict.
	pub async fn record(
		&self,
		submission: &Submission,
		token: &str,
		notifications: &[Notification],
	) -> Result<()> {
		let mut tx = self.pool.begin().await.map_err(db_err)?;

		let sql = Query::update()
			.table(Alias::new("teachers"))
			.values([(Alias::new("has_submitted"), Expr::val(true))])
			.and_where(Expr::col(Alias::new("id")).eq(submission.teacher_id.as_str()))
			.and_where(Expr::col(Alias::new("has_submitted")).eq(false))
			.to_string(SqliteQueryBuilder);
		let result = sqlx::query(&sql).execute(&mut *tx).await.map_err(db_err)?;
		if result.rows_affected() == 0 {
			return Err(Error::Conflict(
				"a submission has already been recorded for this token".into(),
			));
		}

		let sql = insert_sql(submission);
		sqlx::query(&sql).execute(&mut *tx).await.map_err(db_err)?;

		let sql = Query::update()
			.table(Alias::new("url_tokens"))
			.values([(Alias::new("is_valid"), Expr::val(false))])
			.and_where(Expr::col(Alias::new("token")).eq(token))
			.and_where(Expr::col(Alias::new("kind")).eq("submission"))
			.to_string(SqliteQueryBuilder);
		sqlx::query(&sql).execute(&mut *tx).await.map_err(db_err)?;

		for notification in notifications {
			let sql = crate::notifications::insert_sql(notification);
			sqlx::query(&sql).execute(&mut *tx).await.map_err(db_err)?;
		}

		tx.commit().await.map_err(db_err)
	}

	pub async fn find_by_id(&self, id: &str) -> Result<Option<Submission>> {
		let sql = Query::select()
			.columns(SUBMISSION_COLUMNS.map(Alias::new))
			.from(Alias::new("submissions"))
			.and_where(Expr::col(Alias::new("id")).eq(id))
			.to_string(SqliteQueryBuilder);
		let row = sqlx::query(&sql)
			.fetch_optional(&self.pool)
			.await
			.map_err(db_err)?;
		row.as_ref().map(read_submission).transpose()
	}

	/// All submissions, newest first, optionally filtered by status.
	pub async fn list(&self, status: Option<SubmissionStatus>) -> Result<Vec<Submission>> {
		let sql = {
			let mut stmt = Query::select()
				.columns(SUBMISSION_COLUMNS.map(Alias::new))
				.from(Alias::new("submissions"))
				.order_by(Alias::new("created_at"), Order::Desc)
				.to_owned();
			if let Some(status) = status {
				stmt.and_where(Expr::col(Alias::new("status")).eq(status.as_str()));
			}
			stmt.to_string(SqliteQueryBuilder)
		};
		let rows = sqlx::query(&sql)
			.fetch_all(&self.pool)
			.await
			.map_err(db_err)?;
		rows.iter().map(read_submission).collect()
	}

	pub async fn find_by_teacher(&self, teacher_id: &str) -> Result<Vec<Submission>> {
		let sql = Query::select()
			.columns(SUBMISSION_COLUMNS.map(Alias::new))
			.from(Alias::new("submissions"))
			.and_where(Expr::col(Alias::new("teacher_id")).eq(teacher_id))
			.order_by(Alias::new("created_at"), Order::Desc)
			.to_string(SqliteQueryBuilder);
		let rows = sqlx::query(&sql)
			.fetch_all(&self.pool)
			.await
			.map_err(db_err)?;
		rows.iter().map(read_submission).collect()
	}

	/// Persist the review and payment columns from an already-mutated
	/// submission, together with its notification rows.
	pub async fn update_review(
		&self,
		submission: &Submission,
		notifications: &[Notification],
	) -> Result<()> {
		let mut tx = self.pool.begin().await.map_err(db_err)?;

		let sql = Query::update()
			.table(Alias::new("submissions"))
			.values([
				(Alias::new("status"), Expr::val(submission.status.as_str())),
				(Alias::new("review_notes"), Expr::val(submission.review_notes.clone())),
				(
					Alias::new("payment_status"),
					Expr::val(submission.payment_status.as_str()),
				),
				(Alias::new("payment_amount"), Expr::val(submission.payment_amount)),
				(Alias::new("reviewed_by"), Expr::val(submission.reviewed_by.clone())),
				(
					Alias::new("reviewed_at"),
					Expr::val(submission.reviewed_at.map(fmt_ts)),
				),
			])
			.and_where(Expr::col(Alias::new("id")).eq(submission.id.as_str()))
			.to_string(SqliteQueryBuilder);
		let result = sqlx::query(&sql).execute(&mut *tx).await.map_err(db_err)?;
		if result.rows_affected() == 0 {
			return Err(Error::NotFound(format!("submission {}", submission.id)));
		}

		for notification in notifications {
			let sql = crate::notifications::insert_sql(notification);
			sqlx::query(&sql).execute(&mut *tx).await.map_err(db_err)?;
		}

		tx.commit().await.map_err(db_err)
	}

	/// Submission counts grouped by review status.
	pub async fn status_counts(&self) -> Result<Vec<(SubmissionStatus, i64)>> {
		let sql = Query::select()
			.column(Alias::new("status"))
			.expr(Expr::cust("COUNT(*)"))
			.from(Alias::new("submissions"))
			.group_by_col(Alias::new("status"))
			.to_string(SqliteQueryBuilder);
		let rows = sqlx::query(&sql)
			.fetch_all(&self.pool)
			.await
			.map_err(db_err)?;
		rows.iter()
			.map(|row| Ok((get_str(row, "status")?.parse()?, get_i64_at(row, 1)?)))
			.collect()
	}
}

fn insert_sql(submission: &Submission) -> String {
	Query::insert()
		.into_table(Alias::new("submissions"))
		.columns(SUBMISSION_COLUMNS.map(Alias::new))
		.values(
			[
				Expr::val(submission.id.as_str()),
				Expr::val(submission.teacher_id.as_str()),
				Expr::val(submission.bank.account_number.as_str()),
				Expr::val(submission.bank.routing_code.as_str()),
				Expr::val(submission.bank.account_holder.as_str()),
				Expr::val(submission.details.subject.as_str()),
				Expr::val(submission.details.class_level.as_str()),
				Expr::val(submission.details.board.as_str()),
				Expr::val(submission.details.exam_type.as_str()),
				Expr::val(submission.file_name.as_str()),
				Expr::val(submission.file_url.as_str()),
				Expr::val(submission.status.as_str()),
				Expr::val(submission.review_notes.clone()),
				Expr::val(submission.payment_status.as_str()),
				Expr::val(submission.payment_amount),
				Expr::val(submission.reviewed_by.clone()),
				Expr::val(submission.reviewed_at.map(fmt_ts)),
				Expr::val(fmt_ts(submission.created_at)),
			]
			.into_iter()
			.collect::<Vec<Expr>>(),
		)
		.unwrap()
		.to_owned()
		.to_string(SqliteQueryBuilder)
}

fn read_submission(row: &AnyRow) -> Result<Submission> {
	Ok(Submission {
		id: get_str(row, "id")?,
		teacher_id: get_str(row, "teacher_id")?,
		bank: BankDetails {
			account_number: get_str(row, "account_number")?,
			routing_code: get_str(row, "routing_code")?,
			account_holder: get_str(row, "account_holder")?,
		},
		details: SubjectDetails {
			subject: get_str(row, "subject")?,
			class_level: get_str(row, "class_level")?,
			board: get_str(row, "board")?,
			exam_type: get_str(row, "exam_type")?,
		},
		file_name: get_str(row, "file_name")?,
		file_url: get_str(row, "file_url")?,
		status: get_str(row, "status")?.parse()?,
		review_notes: get_opt_str(row, "review_notes")?,
		payment_status: get_str(row, "payment_status")?.parse()?,
		payment_amount: get_opt_i64(row, "payment_amount")?,
		reviewed_by: get_opt_str(row, "reviewed_by")?,
		reviewed_at: get_opt_ts(row, "reviewed_at")?,
		created_at: get_ts(row, "created_at")?,
	})
}
