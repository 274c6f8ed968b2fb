use {
	crate::consts::COMMON_ENV_PATH,
	config::{Config, Environment},
	serde::{Deserialize, Serialize},
	tokio::sync::OnceCell,
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommonEnv {
	pub run_mode: String,
	// 受保护路由的共享密钥 为空则不校验
	pub api_key: Option<String>,
}

impl CommonEnv {
	/// 空字符串视为未配置
	pub fn api_key(&self) -> Option<&str> {
		self.api_key.as_deref().filter(|key| !key.is_empty())
	}
}

pub static COMMON_ENV: OnceCell<CommonEnv> = OnceCell::const_new();

pub fn load_common_env() -> anyhow::Result<()> {
	// 文件不存在时直接使用进程环境变量
	if let Err(e) = dotenvy::from_path(COMMON_ENV_PATH) {
		println!("Skip loading {}: {}", COMMON_ENV_PATH, e);
	}

	let config = Config::builder().add_source(Environment::default()).build()?;

	let common_env: CommonEnv = config.try_deserialize()?;
	println!("Common env loaded: run_mode={}, api_key_set={}", common_env.run_mode, common_env.api_key().is_some());
	COMMON_ENV.set(common_env)?;
	check_common_env()?;
	Ok(())
}

pub fn check_common_env() -> anyhow::Result<()> {
	let common_env = get_common_env();
	crate::consts::validate_run_mode(&common_env.run_mode)?;
	Ok(())
}

pub fn get_common_env() -> &'static CommonEnv {
	COMMON_ENV.get().expect("Common env not loaded")
}
