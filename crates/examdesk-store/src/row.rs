//! Row-decoding helpers shared by the stores.

use chrono::{DateTime, Utc};
use examdesk_core::{Error, Result};
use sqlx::Row;
use sqlx::any::AnyRow;

pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
	ts.to_rfc3339()
}

pub(crate) fn parse_ts(text: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(text)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| Error::Database(format!("bad timestamp {:?}: {}", text, e)))
}

pub(crate) fn get_str(row: &AnyRow, col: &str) -> Result<String> {
	row.try_get::<String, _>(col).map_err(crate::db_err)
}

pub(crate) fn get_opt_str(row: &AnyRow, col: &str) -> Result<Option<String>> {
	row.try_get::<Option<String>, _>(col).map_err(crate::db_err)
}

pub(crate) fn get_i64(row: &AnyRow, col: &str) -> Result<i64> {
	row.try_get::<i64, _>(col).map_err(crate::db_err)
}

pub(crate) fn get_opt_i64(row: &AnyRow, col: &str) -> Result<Option<i64>> {
	row.try_get::<Option<i64>, _>(col).map_err(crate::db_err)
}

/// For aggregate expressions that come back without a usable column name.
pub(crate) fn get_i64_at(row: &AnyRow, index: usize) -> Result<i64> {
	row.try_get::<i64, _>(index).map_err(crate::db_err)
}

/// sqlite reports BOOLEAN columns as integers through the Any driver.
pub(crate) fn get_bool(row: &AnyRow, col: &str) -> Result<bool> {
	if let Ok(flag) = row.try_get::<bool, _>(col) {
		return Ok(flag);
	}
	get_i64(row, col).map(|v| v != 0)
}

pub(crate) fn get_ts(row: &AnyRow, col: &str) -> Result<DateTime<Utc>> {
	parse_ts(&get_str(row, col)?)
}

pub(crate) fn get_opt_ts(row: &AnyRow, col: &str) -> Result<Option<DateTime<Utc>>> {
	match get_opt_str(row, col)? {
		Some(text) => parse_ts(&text).map(Some),
		None => Ok(None),
	}
}
