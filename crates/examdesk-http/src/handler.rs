use crate::{Request, Response};
use async_trait::async_trait;
use examdesk_core::Result;
use std::sync::Arc;

/// Core request-processing seam. Routers, middleware chains and leaf
/// handlers all implement this.
#[async_trait]
pub trait Handler: Send + Sync {
	async fn handle(&self, request: Request) -> Result<Response>;
}

#[async_trait]
impl<T: Handler + ?Sized> Handler for Arc<T> {
	async fn handle(&self, request: Request) -> Result<Response> {
		(**self).handle(request).await
	}
}

/// Wraps request handling; composition instead of inheritance.
#[async_trait]
pub trait Middleware: Send + Sync {
	async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response>;
}

/// Composes middleware around a handler, applied in the order added.
pub struct MiddlewareChain {
	middlewares: Vec<Arc<dyn Middleware>>,
	handler: Arc<dyn Handler>,
}

impl MiddlewareChain {
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self {
			middlewares: Vec::new(),
			handler,
		}
	}

	pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middlewares.push(middleware);
		self
	}
}

struct ComposedHandler {
	middleware: Arc<dyn Middleware>,
	next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for ComposedHandler {
	async fn handle(&self, request: Request) -> Result<Response> {
		self.middleware.process(request, self.next.clone()).await
	}
}

#[async_trait]
impl Handler for MiddlewareChain {
	async fn handle(&self, request: Request) -> Result<Response> {
		let mut current: Arc<dyn Handler> = self.handler.clone();
		for middleware in self.middlewares.iter().rev() {
			current = Arc::new(ComposedHandler {
				middleware: middleware.clone(),
				next: current,
			});
		}
		current.handle(request).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct EchoHandler {
		body: String,
	}

	#[async_trait]
	impl Handler for EchoHandler {
		async fn handle(&self, _request: Request) -> Result<Response> {
			Ok(Response::ok().with_body(self.body.clone()))
		}
	}

	struct PrefixMiddleware {
		prefix: String,
	}

	#[async_trait]
	impl Middleware for PrefixMiddleware {
		async fn process(&self, request: Request, next: Arc<dyn Handler>) -> Result<Response> {
			let response = next.handle(request).await?;
			let body = String::from_utf8(response.body.to_vec()).unwrap_or_default();
			Ok(Response::ok().with_body(format!("{}{}", self.prefix, body)))
		}
	}

	#[tokio::test]
	async fn empty_chain_is_the_handler() {
		let chain = MiddlewareChain::new(Arc::new(EchoHandler {
			body: "hello".into(),
		}));
		let response = chain.handle(Request::get("/")).await.unwrap();
		assert_eq!(&response.body[..], b"hello");
	}

	#[tokio::test]
	async fn middleware_runs_in_the_order_added() {
		let chain = MiddlewareChain::new(Arc::new(EchoHandler {
			body: "base".into(),
		}))
		.with_middleware(Arc::new(PrefixMiddleware {
			prefix: "outer:".into(),
		}))
		.with_middleware(Arc::new(PrefixMiddleware {
			prefix: "inner:".into(),
		}));

		let response = chain.handle(Request::get("/")).await.unwrap();
		let body = String::from_utf8(response.body.to_vec()).unwrap();
		assert_eq!(body, "outer:inner:base");
	}
}
