use {
	crate::api_types::ErrorResponse,
	axum::{
		Json,
		http::StatusCode,
		response::{IntoResponse, Response},
	},
	thiserror::Error,
};

/// API 错误，每个变体对应一个 HTTP 状态码，内容是返回给调用方的 detail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
	/// 参数错误：不支持的周期等
	#[error("{0}")]
	InvalidRequest(String),
	/// API key 缺失或不匹配
	#[error("{0}")]
	Forbidden(String),
	/// 交易对不存在 / 没有 K 线
	#[error("{0}")]
	NotFound(String),
	/// 交易所拒绝了请求
	#[error("{0}")]
	Exchange(String),
	/// 网络错误、超时、解析失败等
	#[error("{0}")]
	Internal(String),
	/// 交易所不可用
	#[error("{0}")]
	Unavailable(String),
}

impl ApiError {
	pub fn status_code(&self) -> StatusCode {
		match self {
			ApiError::InvalidRequest(_) | ApiError::Exchange(_) => StatusCode::BAD_REQUEST,
			ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
			ApiError::NotFound(_) => StatusCode::NOT_FOUND,
			ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
			ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status_code();
		let body = ErrorResponse { code: status.as_u16(), detail: self.to_string() };
		(status, Json(body)).into_response()
	}
}
