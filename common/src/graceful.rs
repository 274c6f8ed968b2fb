use {tokio::signal, tracing::info};

/// 等待 SIGINT / SIGTERM，返回后由调用方执行停机收尾
///
/// # 示例
/// ```ignore
/// axum::serve(listener, app).with_graceful_shutdown(common::graceful::shutdown_signal()).await?;
/// ```
pub async fn shutdown_signal() {
	#[cfg(unix)]
	{
		use tokio::signal::unix::{SignalKind, signal};
		let mut sigterm = match signal(SignalKind::terminate()) {
			Ok(sigterm) => sigterm,
			Err(e) => {
				info!("Failed to create SIGTERM signal handler: {}", e);
				let _ = signal::ctrl_c().await;
				info!("Received SIGINT, starting graceful shutdown...");
				return;
			}
		};
		tokio::select! {
			_ = signal::ctrl_c() => {
				info!("Received SIGINT, starting graceful shutdown...");
			}
			_ = sigterm.recv() => {
				info!("Received SIGTERM, starting graceful shutdown...");
			}
		}
	}
	#[cfg(not(unix))]
	{
		let _ = signal::ctrl_c().await;
		info!("Received SIGINT, starting graceful shutdown...");
	}
}
