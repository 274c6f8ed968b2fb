//! 行情服务：校验参数 -> 查缓存 -> 未命中时请求交易所 -> 整形 -> 写缓存
//!
//! 校验总是在缓存之前完成，上游失败不会写入缓存。并发的相同请求可能同时未命中并各自请求上游，
//! 最后一次 set 生效。

use {
	crate::{
		api_error::ApiError,
		api_types::{HistoricalResponse, OhlcvDataPoint, SystemStatusResponse, TickerResponse},
		cache::TtlCache,
		config::CacheConfig,
		exchange::{Exchange, ExchangeError, ExchangeStatus, MarketInfo, Markets},
		key::{markets_key, normalize_symbol, ohlcv_key, ticker_key},
	},
	chrono::Utc,
	std::{future::Future, sync::Arc, time::Duration},
	tracing::{debug, error, warn},
};

/// 缓存里存放的响应，ticker / 历史数据 / 市场列表共用一个缓存实例
#[derive(Debug, Clone)]
pub enum CachedValue {
	Markets(Arc<Markets>),
	Ticker(TickerResponse),
	Historical(HistoricalResponse),
}

/// 不同数据的 TTL；ticker 使用缓存的默认 TTL
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
	pub historical_ttl: Duration,
	pub markets_ttl: Duration,
}

impl From<&CacheConfig> for CachePolicy {
	fn from(config: &CacheConfig) -> Self {
		Self { historical_ttl: Duration::from_secs(config.historical_ttl_secs), markets_ttl: Duration::from_secs(config.markets_ttl_secs) }
	}
}

pub struct MarketDataService {
	exchange: Arc<dyn Exchange>,
	cache: TtlCache<CachedValue>,
	policy: CachePolicy,
	upstream_timeout: Duration,
}

impl MarketDataService {
	pub fn new(exchange: Arc<dyn Exchange>, cache: TtlCache<CachedValue>, policy: CachePolicy, upstream_timeout: Duration) -> Self {
		Self { exchange, cache, policy, upstream_timeout }
	}

	pub fn exchange_id(&self) -> &str {
		self.exchange.id()
	}

	pub fn cache(&self) -> &TtlCache<CachedValue> {
		&self.cache
	}

	/// 健康检查，不走缓存
	pub async fn system_status(&self) -> Result<SystemStatusResponse, ApiError> {
		let result = async {
			let status = self.upstream(self.exchange.fetch_status()).await?;
			let exchange_time = self.upstream(self.exchange.fetch_time()).await?;
			Ok::<_, ExchangeError>((status, exchange_time))
		}
		.await;

		match result {
			Ok((status, exchange_time_ms)) => Ok(SystemStatusResponse {
				status: "online".to_string(),
				server_time_ms: Utc::now().timestamp_millis(),
				exchange_id: self.exchange_id().to_string(),
				exchange_status: match status {
					ExchangeStatus::Ok => "connected".to_string(),
					ExchangeStatus::Maintenance => "maintenance".to_string(),
				},
				exchange_time_ms,
				cache_ttl_seconds: self.cache.default_ttl_ms() as f64 / 1000.0,
			}),
			Err(e) => {
				error!("Exchange status check failed: {}", e);
				Err(ApiError::Unavailable(format!("Exchange connection failed: {}", e)))
			}
		}
	}

	/// 市场列表，用于校验交易对
	pub async fn markets(&self) -> Result<Arc<Markets>, ApiError> {
		let key = markets_key(self.exchange_id());
		if let Some(CachedValue::Markets(markets)) = self.cache.get(&key) {
			return Ok(markets);
		}

		let markets = self.upstream(self.exchange.load_markets()).await.map_err(|e| {
			error!("Failed to load {} markets: {}", self.exchange_id(), e);
			ApiError::Unavailable(format!("Failed to load exchange markets. Exchange Error: {}", e))
		})?;
		let markets = Arc::new(markets);
		self.cache.set_with_ttl(key, CachedValue::Markets(markets.clone()), self.policy.markets_ttl);
		debug!("Loaded {} markets from {}", markets.len(), self.exchange_id());
		Ok(markets)
	}

	/// 交易对转大写后必须在市场列表中
	pub fn validate_symbol(&self, markets: &Markets, symbol: &str) -> Result<MarketInfo, ApiError> {
		let symbol = normalize_symbol(symbol);
		let market = markets.get(&symbol).cloned().ok_or_else(|| ApiError::NotFound(format!("Symbol '{}' not found on {}. Example: BTC/USDT", symbol, self.exchange_id())))?;
		// 停牌的交易对仍然放行，交易所会返回最后的行情
		if !market.active {
			warn!("Symbol {} is not trading on {}", market.symbol, self.exchange_id());
		}
		Ok(market)
	}

	pub fn validate_timeframe(&self, timeframe: &str) -> Result<(), ApiError> {
		let supported = self.exchange.timeframes();
		if supported.iter().any(|tf| *tf == timeframe) {
			return Ok(());
		}
		Err(ApiError::InvalidRequest(format!("Invalid timeframe: '{}'. Supported: {}", timeframe, supported.join(", "))))
	}

	pub async fn realtime_price(&self, symbol: &str) -> Result<TickerResponse, ApiError> {
		let markets = self.markets().await?;
		let market = self.validate_symbol(&markets, symbol)?;

		let cache_key = ticker_key(&market.symbol);
		if let Some(CachedValue::Ticker(ticker)) = self.cache.get(&cache_key) {
			debug!("cache hit: {}", cache_key);
			return Ok(ticker);
		}
		debug!("cache miss: {}", cache_key);

		let ticker = self.upstream(self.exchange.fetch_ticker(&market)).await.map_err(|e| fetch_error(&market.symbol, e, "Internal Server Error"))?;

		let response = TickerResponse { symbol: ticker.symbol, price: ticker.last, timestamp_ms: ticker.timestamp, source_exchange: self.exchange_id().to_string() };
		self.cache.set(cache_key, CachedValue::Ticker(response.clone()));
		Ok(response)
	}

	pub async fn historical(&self, symbol: &str, timeframe: &str, limit: u32) -> Result<HistoricalResponse, ApiError> {
		let markets = self.markets().await?;
		let market = self.validate_symbol(&markets, symbol)?;
		self.validate_timeframe(timeframe)?;

		let cache_key = ohlcv_key(&market.symbol, timeframe, limit);
		if let Some(CachedValue::Historical(historical)) = self.cache.get(&cache_key) {
			debug!("cache hit: {}", cache_key);
			return Ok(historical);
		}
		debug!("cache miss: {}", cache_key);

		let candles = self.upstream(self.exchange.fetch_ohlcv(&market, timeframe, limit)).await.map_err(|e| fetch_error(&market.symbol, e, "A network or processing error occurred"))?;

		if candles.is_empty() {
			return Err(ApiError::NotFound(format!("No historical data found for {} at timeframe {}.", market.symbol, timeframe)));
		}

		let data: Vec<OhlcvDataPoint> = candles
			.into_iter()
			.map(|c| OhlcvDataPoint { timestamp_ms: c.timestamp, open: c.open, high: c.high, low: c.low, close: c.close, volume: c.volume })
			.collect();
		let response = HistoricalResponse { symbol: market.symbol, timeframe: timeframe.to_string(), count: data.len(), data, source_exchange: self.exchange_id().to_string() };

		// 历史 K 线基本不变，TTL 比 ticker 长
		self.cache.set_with_ttl(cache_key, CachedValue::Historical(response.clone()), self.policy.historical_ttl);
		Ok(response)
	}

	async fn upstream<T>(&self, fut: impl Future<Output = Result<T, ExchangeError>>) -> Result<T, ExchangeError> {
		tokio::time::timeout(self.upstream_timeout, fut).await.map_err(|_| ExchangeError::Timeout)?
	}
}

/// 交易所拒绝 -> 400，其它 -> 500
fn fetch_error(symbol: &str, e: ExchangeError, internal_prefix: &str) -> ApiError {
	if e.is_exchange_error() {
		warn!("Exchange rejected request for {}: {}", symbol, e);
		ApiError::Exchange(format!("Exchange Error for {}: {}", symbol, e))
	} else {
		error!("Upstream fetch failed for {}: {}", symbol, e);
		ApiError::Internal(format!("{}: {}", internal_prefix, e))
	}
}
