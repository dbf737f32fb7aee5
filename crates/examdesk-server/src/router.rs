//! Method plus path-pattern routing with `:name` parameter segments.

use async_trait::async_trait;
use examdesk_core::{Error, Result};
use examdesk_http::{Handler, Request, Response};
use hyper::{Method, StatusCode};
use std::sync::Arc;

enum Segment {
	Literal(String),
	Param(String),
}

struct Route {
	method: Method,
	segments: Vec<Segment>,
	handler: Arc<dyn Handler>,
}

impl Route {
	fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
		let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
		let empty = path.trim_matches('/').is_empty();
		let count = if empty { 0 } else { parts.len() };
		if count != self.segments.len() {
			return None;
		}
		let mut params = Vec::new();
		for (segment, part) in self.segments.iter().zip(parts) {
			match segment {
				Segment::Literal(text) if text == part => {}
				Segment::Literal(_) => return None,
				Segment::Param(name) => params.push((name.clone(), part.to_string())),
			}
		}
		Some(params)
	}
}

/// Dispatches requests to the first route whose method and pattern
/// match, filling `path_params` from `:name` segments.
#[derive(Default)]
pub struct Router {
	routes: Vec<Route>,
}

impl Router {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn route(
		mut self,
		method: Method,
		pattern: &str,
		handler: Arc<dyn Handler>,
	) -> Self {
		let segments = pattern
			.trim_matches('/')
			.split('/')
			.filter(|s| !s.is_empty())
			.map(|s| match s.strip_prefix(':') {
				Some(name) => Segment::Param(name.to_string()),
				None => Segment::Literal(s.to_string()),
			})
			.collect();
		self.routes.push(Route {
			method,
			segments,
			handler,
		});
		self
	}

	pub fn get(self, pattern: &str, handler: Arc<dyn Handler>) -> Self {
		self.route(Method::GET, pattern, handler)
	}

	pub fn post(self, pattern: &str, handler: Arc<dyn Handler>) -> Self {
		self.route(Method::POST, pattern, handler)
	}

	pub fn put(self, pattern: &str, handler: Arc<dyn Handler>) -> Self {
		self.route(Method::PUT, pattern, handler)
	}
}

#[async_trait]
impl Handler for Router {
	async fn handle(&self, mut request: Request) -> Result<Response> {
		let path = request.path().to_string();
		let mut path_matched = false;
		for route in &self.routes {
			let Some(params) = route.matches(&path) else {
				continue;
			};
			path_matched = true;
			if route.method != request.method {
				continue;
			}
			for (name, value) in params {
				request.set_path_param(name, value);
			}
			return route.handler.handle(request).await;
		}
		if path_matched {
			return Ok(Response::new(StatusCode::METHOD_NOT_ALLOWED));
		}
		Ok(Response::from_error(&Error::NotFound("resource".into())))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct ParamEcho;

	#[async_trait]
	impl Handler for ParamEcho {
		async fn handle(&self, request: Request) -> Result<Response> {
			Ok(Response::ok().with_body(request.path_param("id")?.to_string()))
		}
	}

	struct Static(&'static str);

	#[async_trait]
	impl Handler for Static {
		async fn handle(&self, _request: Request) -> Result<Response> {
			Ok(Response::ok().with_body(self.0))
		}
	}

	fn router() -> Router {
		Router::new()
			.get("/api/submissions", Arc::new(Static("list")))
			.get("/api/submissions/:id", Arc::new(ParamEcho))
			.put("/api/submissions/:id/review", Arc::new(ParamEcho))
	}

	#[tokio::test]
	async fn literal_routes_dispatch() {
		let response = router()
			.handle(Request::get("/api/submissions"))
			.await
			.unwrap();
		assert_eq!(&response.body[..], b"list");
	}

	#[tokio::test]
	async fn param_segments_bind() {
		let response = router()
			.handle(Request::get("/api/submissions/s-42"))
			.await
			.unwrap();
		assert_eq!(&response.body[..], b"s-42");
	}

	#[tokio::test]
	async fn nested_param_routes_match_by_length() {
		let mut request = Request::get("/api/submissions/s-7/review");
		request.method = Method::PUT;
		let response = router().handle(request).await.unwrap();
		assert_eq!(&response.body[..], b"s-7");
	}

	#[tokio::test]
	async fn unknown_path_is_404() {
		let response = router().handle(Request::get("/api/nope")).await.unwrap();
		assert_eq!(response.status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn wrong_method_is_405() {
		let mut request = Request::get("/api/submissions/s-7/review");
		request.method = Method::GET;
		let response = router().handle(request).await.unwrap();
		assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
	}
}
