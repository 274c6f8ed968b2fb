use {
	super::{Candle, Exchange, ExchangeError, ExchangeStatus, MarketInfo, Markets, Ticker},
	crate::config::ExchangeConfig,
	async_trait::async_trait,
	reqwest::Client,
	serde::{Deserialize, de::DeserializeOwned},
	serde_json::Value,
	std::time::Duration,
	tokio::{
		sync::Mutex,
		time::{Instant, sleep_until},
	},
	tracing::debug,
};

pub const BINANCE_EXCHANGE_ID: &str = "binance";

/// Binance 现货 K 线周期
pub const BINANCE_TIMEFRAMES: &[&str] = &["1s", "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M"];

const EXCHANGE_INFO_PATH: &str = "/api/v3/exchangeInfo";
const TICKER_24HR_PATH: &str = "/api/v3/ticker/24hr";
const KLINES_PATH: &str = "/api/v3/klines";
const SYSTEM_STATUS_PATH: &str = "/sapi/v1/system/status";
const SERVER_TIME_PATH: &str = "/api/v3/time";

const TRADING_STATUS: &str = "TRADING";

/// 上游请求最小间隔，所有请求共用一把锁排队
pub struct Throttle {
	interval: Duration,
	last_sent: Mutex<Option<Instant>>,
}

impl Throttle {
	pub fn new(interval: Duration) -> Self {
		Self { interval, last_sent: Mutex::new(None) }
	}

	/// 距离上一次请求不足 interval 时等待；等待期间持有锁，后来者顺延
	pub async fn acquire(&self) {
		let mut last_sent = self.last_sent.lock().await;
		if let Some(last) = *last_sent {
			sleep_until(last + self.interval).await;
		}
		*last_sent = Some(Instant::now());
	}
}

pub struct BinanceClient {
	client: Client,
	base_url: String,
	throttle: Throttle,
}

impl BinanceClient {
	pub fn new(config: &ExchangeConfig) -> anyhow::Result<Self> {
		let client = Client::builder().timeout(Duration::from_secs(config.request_timeout_secs)).connect_timeout(Duration::from_secs(config.connect_timeout_secs)).build()?;
		Ok(Self { client, base_url: config.base_url.trim_end_matches('/').to_string(), throttle: Throttle::new(config.rate_limit()) })
	}

	async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ExchangeError> {
		let url = format!("{}{}", self.base_url, path);
		self.throttle.acquire().await;
		debug!("GET {} {:?}", url, query);

		let response = self.client.get(&url).query(query).send().await?;
		let status = response.status();
		let body = response.text().await?;

		if !status.is_success() {
			// 4xx 且带 code/msg 的是交易所拒绝请求，其余视为网络或服务端故障
			if status.is_client_error()
				&& let Ok(err) = serde_json::from_str::<BinanceErrorBody>(&body)
			{
				return Err(ExchangeError::Exchange { exchange: BINANCE_EXCHANGE_ID.to_string(), code: err.code, msg: err.msg });
			}
			return Err(ExchangeError::Network(format!("{} GET {}: status={}, body={}", BINANCE_EXCHANGE_ID, path, status, body)));
		}

		serde_json::from_str(&body).map_err(|e| ExchangeError::Decode(format!("{}: {}", path, e)))
	}
}

#[async_trait]
impl Exchange for BinanceClient {
	fn id(&self) -> &str {
		BINANCE_EXCHANGE_ID
	}

	fn timeframes(&self) -> &[&'static str] {
		BINANCE_TIMEFRAMES
	}

	async fn load_markets(&self) -> Result<Markets, ExchangeError> {
		let info: ExchangeInfo = self.get(EXCHANGE_INFO_PATH, &[]).await?;
		Ok(parse_markets(info))
	}

	async fn fetch_ticker(&self, market: &MarketInfo) -> Result<Ticker, ExchangeError> {
		let ticker: Ticker24hr = self.get(TICKER_24HR_PATH, &[("symbol", market.id.clone())]).await?;
		parse_ticker(market, ticker)
	}

	async fn fetch_ohlcv(&self, market: &MarketInfo, timeframe: &str, limit: u32) -> Result<Vec<Candle>, ExchangeError> {
		let rows: Vec<Vec<Value>> = self.get(KLINES_PATH, &[("symbol", market.id.clone()), ("interval", timeframe.to_string()), ("limit", limit.to_string())]).await?;
		rows.iter().map(|row| parse_kline(row)).collect()
	}

	async fn fetch_status(&self) -> Result<ExchangeStatus, ExchangeError> {
		let status: SystemStatus = self.get(SYSTEM_STATUS_PATH, &[]).await?;
		Ok(if status.status == 0 { ExchangeStatus::Ok } else { ExchangeStatus::Maintenance })
	}

	async fn fetch_time(&self) -> Result<i64, ExchangeError> {
		let time: ServerTime = self.get(SERVER_TIME_PATH, &[]).await?;
		Ok(time.server_time)
	}
}

#[derive(Debug, Deserialize)]
struct BinanceErrorBody {
	code: i64,
	msg: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
	symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
	symbol: String,
	status: String,
	#[serde(rename = "baseAsset")]
	base_asset: String,
	#[serde(rename = "quoteAsset")]
	quote_asset: String,
}

#[derive(Debug, Deserialize)]
struct Ticker24hr {
	#[serde(rename = "lastPrice")]
	last_price: String,
	#[serde(rename = "closeTime")]
	close_time: i64,
}

#[derive(Debug, Deserialize)]
struct SystemStatus {
	status: i32,
}

#[derive(Debug, Deserialize)]
struct ServerTime {
	#[serde(rename = "serverTime")]
	server_time: i64,
}

fn parse_markets(info: ExchangeInfo) -> Markets {
	info.symbols
		.into_iter()
		.map(|s| {
			let market = MarketInfo::new(&s.symbol, &s.base_asset, &s.quote_asset, s.status == TRADING_STATUS);
			(market.symbol.clone(), market)
		})
		.collect()
}

fn parse_ticker(market: &MarketInfo, ticker: Ticker24hr) -> Result<Ticker, ExchangeError> {
	let last = parse_number(&ticker.last_price, "lastPrice")?;
	Ok(Ticker { symbol: market.symbol.clone(), last, timestamp: ticker.close_time })
}

/// [openTime, "open", "high", "low", "close", "volume", closeTime, ...]
fn parse_kline(row: &[Value]) -> Result<Candle, ExchangeError> {
	if row.len() < 6 {
		return Err(ExchangeError::Decode(format!("kline row has {} fields, expected at least 6", row.len())));
	}
	let timestamp = row[0].as_i64().ok_or_else(|| ExchangeError::Decode(format!("invalid kline open time: {}", row[0])))?;
	let field = |idx: usize, name: &str| match &row[idx] {
		Value::String(s) => parse_number(s, name),
		Value::Number(n) => n.as_f64().ok_or_else(|| ExchangeError::Decode(format!("invalid kline {}: {}", name, n))),
		other => Err(ExchangeError::Decode(format!("invalid kline {}: {}", name, other))),
	};
	Ok(Candle { timestamp, open: field(1, "open")?, high: field(2, "high")?, low: field(3, "low")?, close: field(4, "close")?, volume: field(5, "volume")? })
}

/// NaN / inf 序列化后是 null，直接拒绝
fn parse_number(raw: &str, name: &str) -> Result<f64, ExchangeError> {
	let value = raw.parse::<f64>().map_err(|e| ExchangeError::Decode(format!("invalid {} '{}': {}", name, raw, e)))?;
	if !value.is_finite() {
		return Err(ExchangeError::Decode(format!("invalid {} '{}': not a finite number", name, raw)));
	}
	Ok(value)
}
