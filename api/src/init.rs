use {
	crate::{
		cache::TtlCache,
		config::{get_config, load_config},
		exchange::BinanceClient,
		server::AppState,
		service::{CachePolicy, MarketDataService},
	},
	common::common_env,
	std::{sync::Arc, time::Duration},
	tracing::{info, warn},
};

pub fn init_all() -> anyhow::Result<AppState> {
	init_load()?;
	init_logging()?;
	init_state()
}

fn init_load() -> anyhow::Result<()> {
	common_env::load_common_env()?;
	load_config(common::consts::API_CONFIG_PATH)?;
	Ok(())
}

fn init_logging() -> anyhow::Result<()> {
	common::logging::init_logging(&get_config().logging)
}

/// 缓存实例在这里创建，通过 AppState 交给所有 handler
fn init_state() -> anyhow::Result<AppState> {
	let config = get_config();
	let exchange = Arc::new(BinanceClient::new(&config.exchange)?);
	let cache = TtlCache::new(Duration::from_millis(config.cache.default_ttl_ms));
	let service = MarketDataService::new(exchange, cache, CachePolicy::from(&config.cache), config.exchange.request_timeout());
	info!("Market data service initialized (exchange: {}, default ttl: {}ms)", config.exchange.id, config.cache.default_ttl_ms);
	Ok(AppState::new(Arc::new(service), common_env::get_common_env().api_key().map(str::to_string)))
}

/// 启动时预加载市场列表，失败只告警，首个请求会重试
pub async fn warm_up_markets(state: &AppState) {
	match state.service.markets().await {
		Ok(markets) => info!("Loaded {} markets from {} into cache", markets.len(), state.service.exchange_id()),
		Err(e) => warn!("Failed to preload markets: {}", e),
	}
}
