//! Minimal HTTP abstractions over the `hyper` types.
//!
//! A [`Request`] is a fully-buffered request plus router-filled path
//! parameters; a [`Response`] is a status, headers and a byte body.
//! [`Handler`] is the core seam all request processing implements, and
//! [`MiddlewareChain`] composes [`Middleware`] around a handler.

mod handler;
mod request;
mod response;

pub use handler::{Handler, Middleware, MiddlewareChain};
pub use request::Request;
pub use response::Response;
