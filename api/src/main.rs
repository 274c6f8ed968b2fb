use {api::init, tracing::info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let state = init::init_all()?;
	init::warm_up_markets(&state).await;

	let exchange_id = state.service.exchange_id().to_string();
	let addr = api::config::get_config().server.get_addr();
	let listener = tokio::net::TcpListener::bind(&addr).await?;
	info!("🚀 Market data API is running at {}", listener.local_addr()?);

	let app = api::server::app(state);
	axum::serve(listener, app).with_graceful_shutdown(common::graceful::shutdown_signal()).await?;

	info!("Connection to {} closed, API service stopped", exchange_id);
	Ok(())
}
