use examdesk_server::handlers::routes;
use examdesk_server::middleware::{Cors, RequestLog};
use examdesk_server::{AppState, HttpServer, Settings};
use examdesk_service::CleanupTask;
use examdesk_store::Database;
use examdesk_core::SystemClock;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
		.init();

	let settings = Settings::from_env()?;

	let db = Database::connect(&settings.database_url).await?;
	db.create_schema().await?;

	let state = Arc::new(AppState::new(db.clone(), &settings));

	if let Some(admin) = &settings.admin {
		state
			.auth
			.ensure_admin(&admin.email, &admin.password, &admin.full_name)
			.await?;
		info!(email = %admin.email, "admin account ready");
	}

	let cleanup = CleanupTask::new(db, Arc::new(SystemClock), settings.cleanup_interval).spawn();

	let server = HttpServer::new(Arc::new(routes(state)))
		.with_middleware(Arc::new(RequestLog))
		.with_middleware(Arc::new(Cors::new(settings.client_origin.clone())));

	server
		.listen_with_shutdown(settings.bind_addr, async {
			let _ = tokio::signal::ctrl_c().await;
		})
		.await?;

	cleanup.abort();
	info!("shutdown complete");
	Ok(())
}
