//! The hyper server loop.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper_util::rt::TokioIo;
use examdesk_http::{Handler, Middleware, MiddlewareChain, Request, Response};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

/// One-connection-per-task HTTP/1.1 server around a [`Handler`].
pub struct HttpServer {
	handler: Arc<dyn Handler>,
	middlewares: Vec<Arc<dyn Middleware>>,
}

impl HttpServer {
	pub fn new(handler: Arc<dyn Handler>) -> Self {
		Self {
			handler,
			middlewares: Vec::new(),
		}
	}

	/// Middlewares run in the order added, outermost first.
	pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
		self.middlewares.push(middleware);
		self
	}

	fn build_handler(&self) -> Arc<dyn Handler> {
		if self.middlewares.is_empty() {
			return self.handler.clone();
		}
		let mut chain = MiddlewareChain::new(self.handler.clone());
		for middleware in &self.middlewares {
			chain = chain.with_middleware(middleware.clone());
		}
		Arc::new(chain)
	}

	/// Accept connections until `shutdown` resolves; in-flight
	/// connections finish on their own tasks.
	pub async fn listen_with_shutdown(
		self,
		addr: SocketAddr,
		shutdown: impl Future<Output = ()>,
	) -> std::io::Result<()> {
		let listener = TcpListener::bind(addr).await?;
		info!(%addr, "server listening");
		let handler = self.build_handler();
		tokio::pin!(shutdown);

		loop {
			tokio::select! {
				accepted = listener.accept() => {
					let (stream, peer) = accepted?;
					let handler = handler.clone();
					tokio::task::spawn(async move {
						if let Err(error) = handle_connection(stream, peer, handler).await {
							debug!(%peer, %error, "connection ended with error");
						}
					});
				}
				_ = &mut shutdown => {
					info!("shutdown signal received, no longer accepting connections");
					return Ok(());
				}
			}
		}
	}

	pub async fn listen(self, addr: SocketAddr) -> std::io::Result<()> {
		self.listen_with_shutdown(addr, std::future::pending()).await
	}
}

async fn handle_connection(
	stream: TcpStream,
	peer: SocketAddr,
	handler: Arc<dyn Handler>,
) -> hyper::Result<()> {
	let io = TokioIo::new(stream);
	let service = RequestService {
		handler,
		remote_addr: peer,
	};
	http1::Builder::new().serve_connection(io, service).await
}

struct RequestService {
	handler: Arc<dyn Handler>,
	remote_addr: SocketAddr,
}

impl Service<hyper::Request<Incoming>> for RequestService {
	type Response = hyper::Response<Full<Bytes>>;
	type Error = hyper::http::Error;
	type Future = Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

	fn call(&self, req: hyper::Request<Incoming>) -> Self::Future {
		let handler = self.handler.clone();
		let remote_addr = self.remote_addr;

		Box::pin(async move {
			let (parts, body) = req.into_parts();
			let body = match body.collect().await {
				Ok(collected) => collected.to_bytes(),
				Err(error) => {
					debug!(%error, "failed to read request body");
					Bytes::new()
				}
			};

			let mut request = Request::new(parts.method, parts.uri, parts.version, parts.headers, body);
			request.remote_addr = Some(remote_addr);

			let response = match handler.handle(request).await {
				Ok(response) => response,
				Err(err) => {
					if err.code() == "SERVER_ERROR" || err.code() == "CONFIG_ERROR" {
						error!(%err, "request failed");
					}
					Response::from_error(&err)
				}
			};

			let mut builder = hyper::Response::builder().status(response.status);
			for (name, value) in response.headers.iter() {
				builder = builder.header(name, value);
			}
			builder.body(Full::new(response.body))
		})
	}
}
