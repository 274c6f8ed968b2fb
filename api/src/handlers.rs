use {
	crate::{
		api_error::ApiError,
		api_types::{HistoricalRequest, HistoricalResponse, SystemStatusResponse, TickerResponse},
		server::AppState,
	},
	axum::{
		extract::{Path, Query, State, rejection::QueryRejection},
		response::Json,
	},
};

/// 服务和交易所状态，每次都实时请求交易所
pub async fn handle_system_status(State(state): State<AppState>) -> Result<Json<SystemStatusResponse>, ApiError> {
	let status = state.service.system_status().await?;
	Ok(Json(status))
}

/// 实时价格，symbol 形如 BTC/USDT
pub async fn handle_realtime_price(State(state): State<AppState>, Path(symbol): Path<String>) -> Result<Json<TickerResponse>, ApiError> {
	let ticker = state.service.realtime_price(&symbol).await?;
	Ok(Json(ticker))
}

/// 历史 K 线，timeframe 默认 1h，limit 默认 100
pub async fn handle_historical(State(state): State<AppState>, Path(symbol): Path<String>, params: Result<Query<HistoricalRequest>, QueryRejection>) -> Result<Json<HistoricalResponse>, ApiError> {
	let Query(params) = params.map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))?;
	let historical = state.service.historical(&symbol, &params.timeframe, params.limit).await?;
	Ok(Json(historical))
}
