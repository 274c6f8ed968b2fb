// Cache key generation utilities
// 同一组规范化参数必须得到同一个 key

/// 规范化交易对：统一转大写
pub fn normalize_symbol(symbol: &str) -> String {
	symbol.to_uppercase()
}

/// Markets list key: {exchange_id}_markets
pub fn markets_key(exchange_id: &str) -> String {
	format!("{}_markets", exchange_id)
}

/// Ticker key: ticker:{symbol}
pub fn ticker_key(symbol: &str) -> String {
	format!("ticker:{}", normalize_symbol(symbol))
}

/// OHLCV key: ohlcv:{symbol}:{timeframe}:{limit}
pub fn ohlcv_key(symbol: &str, timeframe: &str, limit: u32) -> String {
	format!("ohlcv:{}:{}:{}", normalize_symbol(symbol), timeframe, limit)
}
