use std::process::Command;

fn main() {
	let hash = Command::new("git")
		.args(["rev-parse", "--short", "HEAD"])
		.output()
		.ok()
		.filter(|o| o.status.success())
		.and_then(|o| String::from_utf8(o.stdout).ok())
		.map(|s| s.trim().to_owned())
		.unwrap_or_else(|| "unknown".to_owned());
	println!("cargo:rustc-env=GIT_HASH={hash}");
	println!("cargo:rerun-if-changed=.git/HEAD");
}
