use {
	crate::exchange::binance::BINANCE_EXCHANGE_ID,
	common::logging::LoggingConfig,
	config::{Config, File},
	serde::{Deserialize, Serialize},
	std::time::Duration,
	tokio::sync::OnceCell,
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	pub logging: LoggingConfig,
	pub server: ServerConfig,
	pub exchange: ExchangeConfig,
	pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
	pub port: u16,
}

impl ServerConfig {
	pub fn get_addr(&self) -> String {
		format!("0.0.0.0:{}", self.port)
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeConfig {
	pub id: String,
	pub base_url: String,
	/// 单次上游请求超时，同时用于服务层的 tokio timeout
	pub request_timeout_secs: u64,
	pub connect_timeout_secs: u64,
	/// 两次上游请求之间的最小间隔（毫秒）
	pub rate_limit_ms: u64,
}

impl ExchangeConfig {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	pub fn rate_limit(&self) -> Duration {
		Duration::from_millis(self.rate_limit_ms)
	}

	pub fn check(&self) -> anyhow::Result<()> {
		if self.id != BINANCE_EXCHANGE_ID {
			return Err(anyhow::anyhow!("Unsupported exchange: {}. Only '{}' is supported", self.id, BINANCE_EXCHANGE_ID));
		}
		if self.base_url.is_empty() {
			return Err(anyhow::anyhow!("Exchange base_url is empty"));
		}
		if self.request_timeout_secs == 0 || self.connect_timeout_secs == 0 {
			return Err(anyhow::anyhow!("Exchange timeouts must be greater than 0"));
		}
		if self.rate_limit_ms == 0 {
			return Err(anyhow::anyhow!("Exchange rate_limit_ms must be greater than 0"));
		}
		// 间隔超过请求超时，排队的请求必然超时
		if self.rate_limit_ms >= self.request_timeout_secs.saturating_mul(1000) {
			return Err(anyhow::anyhow!("Exchange rate_limit_ms ({}) must be less than request_timeout_secs ({}s)", self.rate_limit_ms, self.request_timeout_secs));
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
	/// ticker 使用的默认 TTL
	pub default_ttl_ms: u64,
	pub historical_ttl_secs: u64,
	pub markets_ttl_secs: u64,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self { default_ttl_ms: 5000, historical_ttl_secs: 60 * 60, markets_ttl_secs: 60 * 60 }
	}
}

impl CacheConfig {
	pub fn check(&self) -> anyhow::Result<()> {
		if self.default_ttl_ms == 0 {
			return Err(anyhow::anyhow!("Cache default_ttl_ms must be greater than 0"));
		}
		if self.historical_ttl_secs == 0 || self.markets_ttl_secs == 0 {
			return Err(anyhow::anyhow!("Cache historical_ttl_secs and markets_ttl_secs must be greater than 0"));
		}
		Ok(())
	}
}

pub static CONFIG: OnceCell<ApiConfig> = OnceCell::const_new();

pub fn load_config(config_path: &str) -> anyhow::Result<()> {
	let run_mode = &common::common_env::get_common_env().run_mode;

	let config = Config::builder().add_source(File::with_name(&format!("{}/{}", config_path, run_mode)).required(true)).build()?;

	let api_config: ApiConfig = config.try_deserialize()?;
	println!("Configuration loaded for mode: {}", run_mode);
	println!("Configuration: {:?}", api_config);
	check_config(&api_config)?;
	CONFIG.set(api_config)?;
	Ok(())
}

fn check_config(config: &ApiConfig) -> anyhow::Result<()> {
	config.logging.check()?;
	config.exchange.check()?;
	config.cache.check()?;
	Ok(())
}

pub fn get_config() -> &'static ApiConfig {
	CONFIG.get().expect("Config not loaded")
}
