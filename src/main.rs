use std::{
	path::{Path, PathBuf},
	process::{Command, ExitStatus},
	sync::Arc,
	time::Duration,
};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, eyre};
use scoped_temp_dir::Builder;
pub mod config;
use config::{LiveSettings, SettingsFlags};

/// Set for the child process, pointing at the temp dir.
const DIR_ENV_VAR: &str = "SCOPED_TEMP_DIR";

/// Run a command inside a fresh temporary directory, then delete the directory.
#[derive(Parser)]
#[command(author, version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"), about, long_about = None)]
struct Cli {
	#[command(flatten)]
	settings: SettingsFlags,
	/// Create the temp dir here instead of in the system temp location
	#[arg(long)]
	base_dir: Option<PathBuf>,
	/// Leave the directory in place and print its path afterwards
	#[arg(long)]
	keep: bool,
	/// Command to run, with its arguments
	#[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
	command: Vec<String>,
}

fn main() {
	v_utils::clientside!();
	let cli = Cli::parse();
	let live_settings = match LiveSettings::new(cli.settings, Duration::from_secs(5)) {
		Ok(ls) => Arc::new(ls),
		Err(e) => {
			eprintln!("Error reading config: {e}");
			for cause in e.chain().skip(1) {
				eprintln!("  Caused by: {cause}");
			}
			std::process::exit(1);
		}
	};

	let code = match run(live_settings, cli.base_dir, cli.keep, &cli.command) {
		Ok(code) => code,
		Err(e) => {
			eprintln!("Error: {e}");
			for cause in e.chain().skip(1) {
				eprintln!("  Caused by: {cause}");
			}
			1
		}
	};
	std::process::exit(code);
}

/// Returns the exit code to hand back. The temp dir is gone (unless kept) by the time this returns.
fn run(settings: Arc<LiveSettings>, base_dir: Option<PathBuf>, keep: bool, command: &[String]) -> Result<i32> {
	let config = settings.config();
	let mut builder = Builder::new().prefix(config.prefix.as_str()).max_attempts(config.max_attempts);
	if let Some(base_dir) = base_dir {
		builder = builder.base_dir(base_dir);
	}
	let dir = builder.tempdir().wrap_err("could not create temp dir")?;

	let status = run_in(dir.path(), command)?;

	if keep {
		println!("{}", dir.keep().display());
	} else if let Err(e) = dir.close() {
		eprintln!("Warning: {e}");
		for failure in &e.failures {
			eprintln!("  {failure}");
		}
	}

	Ok(status.code().unwrap_or(1))
}

fn run_in(dir: &Path, command: &[String]) -> Result<ExitStatus> {
	let (program, args) = command.split_first().ok_or_else(|| eyre!("no command given"))?;
	Command::new(program)
		.args(args)
		.current_dir(dir)
		.env(DIR_ENV_VAR, dir)
		.status()
		.wrap_err_with(|| format!("failed to run `{program}`"))
}

#[cfg(test)]
mod tests {
	use scoped_temp_dir::ScopedTempDir;

	use super::*;

	fn sh(script: &str) -> Vec<String> {
		["sh", "-c", script].into_iter().map(String::from).collect()
	}

	#[test]
	fn test_empty_command() {
		let dir = ScopedTempDir::new();
		assert!(run_in(dir.path(), &[]).is_err());
	}

	#[test]
	fn test_missing_program() {
		let dir = ScopedTempDir::new();
		let command = vec!["definitely-not-a-real-program-7f3a".to_owned()];
		let err = run_in(dir.path(), &command).unwrap_err();
		assert!(err.to_string().contains("definitely-not-a-real-program-7f3a"));
	}

	#[test]
	#[cfg(unix)]
	fn test_runs_inside_dir() {
		let dir = ScopedTempDir::new();
		let status = run_in(dir.path(), &sh(r#"touch "from child" && touch "$SCOPED_TEMP_DIR/via env""#)).unwrap();
		assert!(status.success());
		assert!(scoped_temp_dir::exists(dir.path().join("from child")));
		assert!(scoped_temp_dir::exists(dir.path().join("via env")));
	}

	#[test]
	#[cfg(unix)]
	fn test_exit_code_passthrough() {
		let dir = ScopedTempDir::new();
		let status = run_in(dir.path(), &sh("exit 7")).unwrap();
		assert_eq!(status.code(), Some(7));
	}
}
