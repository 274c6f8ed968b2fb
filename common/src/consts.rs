pub const COMMON_ENV_PATH: &str = "./deploy/common.env";
pub const API_CONFIG_PATH: &str = "./deploy/api";

pub const RUN_MODE_DEV: &str = "dev";
pub const RUN_MODE_PROD: &str = "prod";

/// Header carrying the shared secret on protected routes
pub const API_KEY_HEADER: &str = "x-api-key";

pub fn validate_run_mode(run_mode: &str) -> anyhow::Result<()> {
	match run_mode {
		RUN_MODE_DEV | RUN_MODE_PROD => Ok(()),
		_ => Err(anyhow::anyhow!("Invalid RUN_MODE: {}. Must be either '{}' or '{}'", run_mode, RUN_MODE_DEV, RUN_MODE_PROD)),
	}
}
