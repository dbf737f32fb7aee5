use bytes::Bytes;
use examdesk_core::{Error, Result};
use hyper::header::{AUTHORIZATION, USER_AGENT};
use hyper::{HeaderMap, Method, Uri, Version};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::net::SocketAddr;

/// A buffered HTTP request.
///
/// Bodies are collected before the handler runs; uploads in this system
/// are small (one question paper), so streaming bodies are not needed.
#[derive(Debug)]
pub struct Request {
	pub method: Method,
	pub uri: Uri,
	pub version: Version,
	pub headers: HeaderMap,
	pub body: Bytes,
	pub remote_addr: Option<SocketAddr>,
	/// Filled by the router from `:name` pattern segments.
	pub path_params: HashMap<String, String>,
	query_params: HashMap<String, String>,
}

impl Request {
	pub fn new(
		method: Method,
		uri: Uri,
		version: Version,
		headers: HeaderMap,
		body: Bytes,
	) -> Self {
		let query_params = Self::parse_query_params(&uri);
		Self {
			method,
			uri,
			version,
			headers,
			body,
			remote_addr: None,
			path_params: HashMap::new(),
			query_params,
		}
	}

	/// Convenience constructor for tests and internal dispatch.
	pub fn get(uri: &str) -> Self {
		Self::new(
			Method::GET,
			uri.parse().expect("static test uri"),
			Version::HTTP_11,
			HeaderMap::new(),
			Bytes::new(),
		)
	}

	fn parse_query_params(uri: &Uri) -> HashMap<String, String> {
		uri.query()
			.map(|q| {
				q.split('&')
					.filter_map(|pair| {
						// Split on the first '=' only so '=' survives in values
						let mut parts = pair.splitn(2, '=');
						Some((
							parts.next()?.to_string(),
							parts.next().unwrap_or("").to_string(),
						))
					})
					.collect()
			})
			.unwrap_or_default()
	}

	pub fn path(&self) -> &str {
		self.uri.path()
	}

	pub fn query_param(&self, name: &str) -> Option<&str> {
		self.query_params.get(name).map(String::as_str)
	}

	pub fn path_param(&self, name: &str) -> Result<&str> {
		self.path_params
			.get(name)
			.map(String::as_str)
			.ok_or_else(|| Error::Internal(format!("missing path parameter `{}`", name)))
	}

	pub fn set_path_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
		self.path_params.insert(name.into(), value.into());
	}

	/// Deserialize the body as JSON.
	pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
		if self.body.is_empty() {
			return Err(Error::Validation("request body is empty".into()));
		}
		serde_json::from_slice(&self.body)
			.map_err(|e| Error::Validation(format!("invalid JSON body: {}", e)))
	}

	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|v| v.to_str().ok())
	}

	/// Bearer token from the Authorization header.
	pub fn bearer_token(&self) -> Option<&str> {
		self.headers
			.get(AUTHORIZATION)
			.and_then(|v| v.to_str().ok())
			.and_then(|v| v.strip_prefix("Bearer "))
			.map(str::trim)
			.filter(|t| !t.is_empty())
	}

	pub fn user_agent(&self) -> Option<&str> {
		self.headers.get(USER_AGENT).and_then(|v| v.to_str().ok())
	}

	/// Best-effort client IP for audit and rate limiting.
	///
	/// Order: first entry of X-Forwarded-For, then X-Real-IP, then the
	/// socket peer address. Proxy headers must come from a trusted edge.
	pub fn client_ip(&self) -> String {
		if let Some(xff) = self.header("x-forwarded-for")
			&& let Some(first) = xff.split(',').next()
		{
			let first = first.trim();
			if !first.is_empty() {
				return first.to_string();
			}
		}
		if let Some(real_ip) = self.header("x-real-ip") {
			let real_ip = real_ip.trim();
			if !real_ip.is_empty() {
				return real_ip.to_string();
			}
		}
		self.remote_addr
			.map(|addr| addr.ip().to_string())
			.unwrap_or_else(|| "127.0.0.1".to_string())
	}
}
