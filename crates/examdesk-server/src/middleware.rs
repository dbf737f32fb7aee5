//! Request logging and CORS.

use async_trait::async_trait;
use examdesk_core::Result;
use examdesk_http::{Handler, Middleware, Request, Response};
use hyper::{Method, StatusCode};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Logs one line per request with method, path, status and latency.
pub struct RequestLog;

#[async_trait]
impl Middleware for RequestLog {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		let method = request.method.clone();
		let path = request.path().to_string();
		let started = Instant::now();
		let response = next.handle(request).await?;
		info!(
			%method,
			path,
			status = response.status.as_u16(),
			elapsed_ms = started.elapsed().as_millis() as u64,
			"request"
		);
		Ok(response)
	}
}

/// Single-origin CORS: answers preflights and stamps the headers on
/// every response.
pub struct Cors {
	origin: String,
}

impl Cors {
	pub fn new(origin: impl Into<String>) -> Self {
		Self {
			origin: origin.into(),
		}
	}

	fn apply(&self, response: Response) -> Response {
		response
			.with_header("access-control-allow-origin", &self.origin)
			.with_header("access-control-allow-methods", "GET, POST, PUT, OPTIONS")
			.with_header("access-control-allow-headers", "authorization, content-type")
	}
}

#[async_trait]
impl Middleware for Cors {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
		if request.method == Method::OPTIONS {
			return Ok(self.apply(Response::new(StatusCode::NO_CONTENT)));
		}
		let response = next.handle(request).await?;
		Ok(self.apply(response))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Ok200;

	#[async_trait]
	impl Handler for Ok200 {
		async fn handle(&self, _request: Request) -> Result<Response> {
			Ok(Response::ok())
		}
	}

	#[tokio::test]
	async fn preflight_short_circuits() {
		let cors = Cors::new("http://localhost:3000");
		let mut request = Request::get("/api/anything");
		request.method = Method::OPTIONS;
		let response = cors.process(request, Arc::new(Ok200)).await.unwrap();
		assert_eq!(response.status, StatusCode::NO_CONTENT);
		assert_eq!(
			response.headers.get("access-control-allow-origin").unwrap(),
			"http://localhost:3000"
		);
	}

	#[tokio::test]
	async fn responses_carry_the_origin() {
		let cors = Cors::new("https://app.example");
		let response = cors
			.process(Request::get("/"), Arc::new(Ok200))
			.await
			.unwrap();
		assert_eq!(response.status, StatusCode::OK);
		assert_eq!(
			response.headers.get("access-control-allow-origin").unwrap(),
			"https://app.example"
		);
	}
}
