use {
	crate::{
		api_error::ApiError,
		handlers::{handle_historical, handle_realtime_price, handle_system_status},
		service::MarketDataService,
	},
	axum::{
		Router,
		extract::{Request, State},
		http::HeaderName,
		middleware::{self, Next},
		response::Response,
		routing::get,
	},
	common::consts::API_KEY_HEADER,
	std::{sync::Arc, time::Duration},
	tower_http::{
		compression::CompressionLayer,
		cors::{Any, CorsLayer},
		request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	},
	tracing::warn,
};

const X_REQUEST_ID: &str = "x-request-id";
const INVALID_API_KEY_DETAIL: &str = "Could not validate credentials";

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<MarketDataService>,
	/// None 表示不校验 X-API-Key
	api_key: Option<Arc<str>>,
}

impl AppState {
	pub fn new(service: Arc<MarketDataService>, api_key: Option<String>) -> Self {
		Self { service, api_key: api_key.map(Arc::from) }
	}
}

// 中间件 只挂在行情路由上
async fn check_api_key(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, ApiError> {
	if let Some(expected) = state.api_key.as_deref() {
		let provided = request.headers().get(API_KEY_HEADER).and_then(|header| header.to_str().ok());
		if provided != Some(expected) {
			// SetRequestIdLayer 在外层，到这里一定已带 x-request-id
			let request_id = request.headers().get(X_REQUEST_ID).and_then(|header| header.to_str().ok()).unwrap_or_default();
			warn!("request_id={} - Rejected {}: invalid or missing API key", request_id, request.uri().path());
			return Err(ApiError::Forbidden(INVALID_API_KEY_DETAIL.to_string()));
		}
	}
	Ok(next.run(request).await)
}

pub fn app(state: AppState) -> Router {
	let x_request_id = HeaderName::from_static(X_REQUEST_ID);

	// symbol 带斜杠 (BTC/USDT)，用通配符捕获
	let market_router = Router::new()
		.route("/realtime/{*symbol}", get(handle_realtime_price))
		.route("/historical/{*symbol}", get(handle_historical))
		.route_layer(middleware::from_fn_with_state(state.clone(), check_api_key));

	Router::new()
		.route("/", get(handle_system_status))
		.merge(market_router)
		.layer(PropagateRequestIdLayer::new(x_request_id.clone())) //将请求id从请求头中传递到响应头中
		.layer(CompressionLayer::new())
		.layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid)) //生成请求id 并放到请求头中
		.layer(CorsLayer::new().allow_methods(Any).allow_origin(Any).allow_credentials(false).allow_headers(Any).expose_headers(Any).max_age(Duration::from_secs(60) * 10))
		.with_state(state)
}
