use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEFRAME: &str = "1h";
pub const DEFAULT_LIMIT: u32 = 100;

/// 错误响应 {code, detail}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub code: u16,
	pub detail: String,
}

/// 健康检查
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatusResponse {
	pub status: String,
	pub server_time_ms: i64,
	pub exchange_id: String,
	pub exchange_status: String,
	pub exchange_time_ms: i64,
	pub cache_ttl_seconds: f64,
}

/// 实时价格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerResponse {
	pub symbol: String,
	pub price: f64,
	/// 交易所数据时间（毫秒）
	pub timestamp_ms: i64,
	pub source_exchange: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvDataPoint {
	pub timestamp_ms: i64,
	pub open: f64,
	pub high: f64,
	pub low: f64,
	pub close: f64,
	pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalResponse {
	pub symbol: String,
	pub timeframe: String,
	pub data: Vec<OhlcvDataPoint>,
	pub source_exchange: String,
	/// 返回的 K 线数量
	pub count: usize,
}

/// 历史数据查询参数
#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalRequest {
	#[serde(default = "default_timeframe")]
	pub timeframe: String,
	#[serde(default = "default_limit")]
	pub limit: u32,
}

fn default_timeframe() -> String {
	DEFAULT_TIMEFRAME.to_string()
}

fn default_limit() -> u32 {
	DEFAULT_LIMIT
}
