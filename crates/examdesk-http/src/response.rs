use bytes::Bytes;
use examdesk_core::Error;
use hyper::header::CONTENT_TYPE;
use hyper::{HeaderMap, StatusCode};
use serde::Serialize;

/// A buffered HTTP response.
pub struct Response {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl Response {
	pub fn new(status: StatusCode) -> Self {
		Self {
			status,
			headers: HeaderMap::new(),
			body: Bytes::new(),
		}
	}

	pub fn ok() -> Self {
		Self::new(StatusCode::OK)
	}

	pub fn created() -> Self {
		Self::new(StatusCode::CREATED)
	}

	pub fn no_content() -> Self {
		Self::new(StatusCode::NO_CONTENT)
	}

	pub fn not_found() -> Self {
		Self::new(StatusCode::NOT_FOUND)
	}

	pub fn internal_server_error() -> Self {
		Self::new(StatusCode::INTERNAL_SERVER_ERROR)
	}

	pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
		self.body = body.into();
		self
	}

	pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
		if let Ok(value) = value.parse() {
			self.headers.insert(name, value);
		}
		self
	}

	/// 200 response with a JSON body.
	pub fn json<T: Serialize>(value: &T) -> Self {
		Self::json_with_status(StatusCode::OK, value)
	}

	/// JSON body with an explicit status.
	pub fn json_with_status<T: Serialize>(status: StatusCode, value: &T) -> Self {
		match serde_json::to_vec(value) {
			Ok(body) => {
				let mut response = Self::new(status).with_body(body);
				response
					.headers
					.insert(CONTENT_TYPE, "application/json".parse().expect("static header"));
				response
			}
			Err(e) => Self::from_error(&Error::Serialization(e)),
		}
	}

	/// Render a workspace error as `{ "error": { "code", "message" } }`.
	///
	/// Server-side failures are logged by the caller and surfaced with an
	/// opaque message; everything else passes its display text through.
	pub fn from_error(error: &Error) -> Self {
		let status = match error {
			Error::Validation(_) => StatusCode::BAD_REQUEST,
			Error::Authentication(_) => StatusCode::UNAUTHORIZED,
			Error::Forbidden(_) => StatusCode::FORBIDDEN,
			Error::NotFound(_) => StatusCode::NOT_FOUND,
			Error::Conflict(_) => StatusCode::CONFLICT,
			Error::InvalidToken | Error::TokenExpired | Error::TokenInvalidated => {
				StatusCode::GONE
			}
			Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
			Error::Database(_)
			| Error::Serialization(_)
			| Error::Config(_)
			| Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		};
		let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
			"internal server error".to_string()
		} else {
			error.to_string()
		};
		let body = serde_json::json!({
			"error": { "code": error.code(), "message": message }
		});
		// Serializing a json! literal cannot fail
		let bytes = serde_json::to_vec(&body).expect("static error body");
		let mut response = Self::new(status).with_body(bytes);
		response
			.headers
			.insert(CONTENT_TYPE, "application/json".parse().expect("static header"));
		response
	}
}
