//! 上游交易所行情接口
//!
//! 服务层只依赖 [`Exchange`] trait，生产环境使用 [`binance::BinanceClient`]，
//! 测试里替换成进程内的假实现。

pub mod binance;

use {async_trait::async_trait, std::collections::HashMap, thiserror::Error};

pub use binance::BinanceClient;

/// 统一交易对 (BASE/QUOTE) -> 市场信息
pub type Markets = HashMap<String, MarketInfo>;

#[derive(Debug, Clone, PartialEq)]
pub struct MarketInfo {
	/// 交易所内部 id，例如 BTCUSDT
	pub id: String,
	/// 统一格式，例如 BTC/USDT
	pub symbol: String,
	/// 交易所是否正常交易（Binance status == TRADING）
	pub active: bool,
}

impl MarketInfo {
	pub fn new(id: &str, base: &str, quote: &str, active: bool) -> Self {
		Self { id: id.to_string(), symbol: format!("{}/{}", base, quote), active }
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
	pub symbol: String,
	pub last: f64,
	pub timestamp: i64,
}

/// 单根 K 线，时间戳为开盘时间（毫秒）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
	pub timestamp: i64,
	pub open: f64,
	pub high: f64,
	pub low: f64,
	pub close: f64,
	pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStatus {
	Ok,
	Maintenance,
}

#[derive(Debug, Clone, Error)]
pub enum ExchangeError {
	/// 交易所返回的结构化错误，通常是请求参数被拒绝
	#[error("{exchange} {{\"code\":{code},\"msg\":\"{msg}\"}}")]
	Exchange { exchange: String, code: i64, msg: String },

	#[error("Network error: {0}")]
	Network(String),

	#[error("Upstream request timed out")]
	Timeout,

	#[error("Unexpected response: {0}")]
	Decode(String),
}

impl ExchangeError {
	pub fn is_exchange_error(&self) -> bool {
		matches!(self, ExchangeError::Exchange { .. })
	}
}

impl From<reqwest::Error> for ExchangeError {
	fn from(e: reqwest::Error) -> Self {
		if e.is_timeout() {
			ExchangeError::Timeout
		} else if e.is_decode() {
			ExchangeError::Decode(e.to_string())
		} else {
			ExchangeError::Network(e.to_string())
		}
	}
}

#[async_trait]
pub trait Exchange: Send + Sync {
	fn id(&self) -> &str;

	/// 支持的 K 线周期
	fn timeframes(&self) -> &[&'static str];

	async fn load_markets(&self) -> Result<Markets, ExchangeError>;

	async fn fetch_ticker(&self, market: &MarketInfo) -> Result<Ticker, ExchangeError>;

	async fn fetch_ohlcv(&self, market: &MarketInfo, timeframe: &str, limit: u32) -> Result<Vec<Candle>, ExchangeError>;

	async fn fetch_status(&self) -> Result<ExchangeStatus, ExchangeError>;

	/// 交易所服务器时间（毫秒）
	async fn fetch_time(&self) -> Result<i64, ExchangeError>;
}
