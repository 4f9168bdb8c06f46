use v_utils::macros as v_macros;

fn __default_prefix() -> String {
	scoped_temp_dir::DEFAULT_PREFIX.to_string()
}

fn __default_max_attempts() -> u32 {
	scoped_temp_dir::DEFAULT_MAX_ATTEMPTS
}

#[derive(Clone, Debug, Default, v_macros::LiveSettings, v_macros::MyConfigPrimitives, v_macros::Settings)]
pub struct AppConfig {
	/// Leading part of every created directory name
	#[primitives(skip)]
	#[serde(default = "__default_prefix")]
	pub prefix: String,
	/// Names to try before giving up on finding a free one
	#[primitives(skip)]
	#[serde(default = "__default_max_attempts")]
	pub max_attempts: u32,
}
