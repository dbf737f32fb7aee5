//! HTTP surface of examdesk: settings, router, middleware, handlers and
//! the hyper server loop.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;
pub mod settings;
pub mod state;

pub use router::Router;
pub use server::HttpServer;
pub use settings::Settings;
pub use state::AppState;
