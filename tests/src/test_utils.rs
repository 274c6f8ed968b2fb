use {
	api::{
		cache::{ManualClock, TtlCache},
		exchange::{Candle, Exchange, ExchangeError, ExchangeStatus, MarketInfo, Markets, Ticker, binance::BINANCE_TIMEFRAMES},
		server::{AppState, app},
		service::{CachePolicy, MarketDataService},
	},
	async_trait::async_trait,
	axum::{
		Router,
		body::Body,
		http::{Request, StatusCode},
	},
	serde_json::Value,
	std::{
		collections::HashMap,
		sync::{
			Arc, Mutex,
			atomic::{AtomicUsize, Ordering},
		},
		time::Duration,
	},
	tower::ServiceExt,
};

pub const START_MS: i64 = 1_700_000_000_000;
pub const EXCHANGE_TIME_MS: i64 = 1_700_000_000_500;
pub const BASE_PRICE: f64 = 65000.5;
pub const CANDLE_INTERVAL_MS: i64 = 60_000;

/// 进程内假交易所：记录调用次数，每次 fetch_ticker 返回不同的价格
pub struct FakeExchange {
	markets: Markets,
	candles: Mutex<Vec<Candle>>,
	ticker_error: Mutex<Option<ExchangeError>>,
	ohlcv_error: Mutex<Option<ExchangeError>>,
	status_error: Mutex<Option<ExchangeError>>,
	markets_error: Mutex<Option<ExchangeError>>,
	delay: Mutex<Option<Duration>>,
	last_ohlcv_args: Mutex<Option<(String, String, u32)>>,
	pub markets_calls: AtomicUsize,
	pub ticker_calls: AtomicUsize,
	pub ohlcv_calls: AtomicUsize,
	pub status_calls: AtomicUsize,
}

impl Default for FakeExchange {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeExchange {
	pub fn new() -> Self {
		let markets = [MarketInfo::new("BTCUSDT", "BTC", "USDT", true), MarketInfo::new("ETHBTC", "ETH", "BTC", true), MarketInfo::new("LUNABUSD", "LUNA", "BUSD", false)]
			.into_iter()
			.map(|m| (m.symbol.clone(), m))
			.collect::<HashMap<_, _>>();
		Self {
			markets,
			candles: Mutex::new(make_candles(200)),
			ticker_error: Mutex::new(None),
			ohlcv_error: Mutex::new(None),
			status_error: Mutex::new(None),
			markets_error: Mutex::new(None),
			delay: Mutex::new(None),
			last_ohlcv_args: Mutex::new(None),
			markets_calls: AtomicUsize::new(0),
			ticker_calls: AtomicUsize::new(0),
			ohlcv_calls: AtomicUsize::new(0),
			status_calls: AtomicUsize::new(0),
		}
	}

	pub fn set_candles(&self, candles: Vec<Candle>) {
		*self.candles.lock().unwrap() = candles;
	}

	pub fn fail_ticker(&self, err: Option<ExchangeError>) {
		*self.ticker_error.lock().unwrap() = err;
	}

	pub fn fail_ohlcv(&self, err: Option<ExchangeError>) {
		*self.ohlcv_error.lock().unwrap() = err;
	}

	pub fn fail_status(&self, err: Option<ExchangeError>) {
		*self.status_error.lock().unwrap() = err;
	}

	pub fn fail_markets(&self, err: Option<ExchangeError>) {
		*self.markets_error.lock().unwrap() = err;
	}

	/// 所有上游调用前 sleep
	pub fn set_delay(&self, delay: Option<Duration>) {
		*self.delay.lock().unwrap() = delay;
	}

	pub fn last_ohlcv_args(&self) -> Option<(String, String, u32)> {
		self.last_ohlcv_args.lock().unwrap().clone()
	}

	pub fn calls(counter: &AtomicUsize) -> usize {
		counter.load(Ordering::SeqCst)
	}

	async fn maybe_delay(&self) {
		let delay = *self.delay.lock().unwrap();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
	}
}

#[async_trait]
impl Exchange for FakeExchange {
	fn id(&self) -> &str {
		"binance"
	}

	fn timeframes(&self) -> &[&'static str] {
		BINANCE_TIMEFRAMES
	}

	async fn load_markets(&self) -> Result<Markets, ExchangeError> {
		self.markets_calls.fetch_add(1, Ordering::SeqCst);
		self.maybe_delay().await;
		if let Some(err) = self.markets_error.lock().unwrap().clone() {
			return Err(err);
		}
		Ok(self.markets.clone())
	}

	async fn fetch_ticker(&self, market: &MarketInfo) -> Result<Ticker, ExchangeError> {
		let n = self.ticker_calls.fetch_add(1, Ordering::SeqCst);
		self.maybe_delay().await;
		if let Some(err) = self.ticker_error.lock().unwrap().clone() {
			return Err(err);
		}
		Ok(Ticker { symbol: market.symbol.clone(), last: BASE_PRICE + n as f64, timestamp: START_MS + n as i64 })
	}

	async fn fetch_ohlcv(&self, market: &MarketInfo, timeframe: &str, limit: u32) -> Result<Vec<Candle>, ExchangeError> {
		self.ohlcv_calls.fetch_add(1, Ordering::SeqCst);
		*self.last_ohlcv_args.lock().unwrap() = Some((market.id.clone(), timeframe.to_string(), limit));
		self.maybe_delay().await;
		if let Some(err) = self.ohlcv_error.lock().unwrap().clone() {
			return Err(err);
		}
		let candles = self.candles.lock().unwrap();
		Ok(candles.iter().take(limit as usize).copied().collect())
	}

	async fn fetch_status(&self) -> Result<ExchangeStatus, ExchangeError> {
		self.status_calls.fetch_add(1, Ordering::SeqCst);
		self.maybe_delay().await;
		if let Some(err) = self.status_error.lock().unwrap().clone() {
			return Err(err);
		}
		Ok(ExchangeStatus::Ok)
	}

	async fn fetch_time(&self) -> Result<i64, ExchangeError> {
		self.maybe_delay().await;
		Ok(EXCHANGE_TIME_MS)
	}
}

pub fn make_candles(n: usize) -> Vec<Candle> {
	(0..n)
		.map(|i| {
			let open = 100.0 + i as f64;
			Candle { timestamp: START_MS + i as i64 * CANDLE_INTERVAL_MS, open, high: open + 2.0, low: open - 1.0, close: open + 1.0, volume: 10.0 + i as f64 }
		})
		.collect()
}

pub fn exchange_rejection(msg: &str) -> ExchangeError {
	ExchangeError::Exchange { exchange: "binance".to_string(), code: -1121, msg: msg.to_string() }
}

pub struct TestApp {
	pub router: Router,
	pub exchange: Arc<FakeExchange>,
	pub service: Arc<MarketDataService>,
	pub clock: Arc<ManualClock>,
}

pub struct TestAppBuilder {
	api_key: Option<String>,
	upstream_timeout: Duration,
}

impl Default for TestAppBuilder {
	fn default() -> Self {
		Self { api_key: None, upstream_timeout: Duration::from_secs(5) }
	}
}

impl TestAppBuilder {
	pub fn api_key(mut self, api_key: &str) -> Self {
		self.api_key = Some(api_key.to_string());
		self
	}

	pub fn upstream_timeout(mut self, timeout: Duration) -> Self {
		self.upstream_timeout = timeout;
		self
	}

	pub fn build(self) -> TestApp {
		let exchange = Arc::new(FakeExchange::new());
		let clock = Arc::new(ManualClock::new(START_MS));
		let cache = TtlCache::with_clock(Duration::from_millis(5000), clock.clone());
		let policy = CachePolicy { historical_ttl: Duration::from_secs(3600), markets_ttl: Duration::from_secs(3600) };
		let service = Arc::new(MarketDataService::new(exchange.clone(), cache, policy, self.upstream_timeout));
		let router = app(AppState::new(service.clone(), self.api_key));
		TestApp { router, exchange, service, clock }
	}
}

pub fn test_app() -> TestApp {
	TestAppBuilder::default().build()
}

pub struct TestResponse {
	pub status: StatusCode,
	pub headers: axum::http::HeaderMap,
	pub body: Value,
}

impl TestApp {
	pub async fn get(&self, uri: &str) -> TestResponse {
		self.get_with_headers(uri, &[]).await
	}

	pub async fn get_with_headers(&self, uri: &str, headers: &[(&str, &str)]) -> TestResponse {
		let mut request = Request::builder().method("GET").uri(uri);
		for (name, value) in headers {
			request = request.header(*name, *value);
		}
		let request = request.body(Body::empty()).unwrap();

		let response = self.router.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let headers = response.headers().clone();
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string())) };
		TestResponse { status, headers, body }
	}
}
