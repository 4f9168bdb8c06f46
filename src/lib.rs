//! A directory that lives exactly as long as the value owning it.
//!
//! [`ScopedTempDir`] creates a fresh, uniquely named directory under the system temp location
//! and recursively deletes it, with whatever ended up inside, when dropped.
//!
//! # Basic use
//!
//! ```
//! use scoped_temp_dir::ScopedTempDir;
//!
//! let path = {
//!     let dir = ScopedTempDir::new();
//!     std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
//!     std::fs::create_dir(dir.path().join(".cache")).unwrap();
//!     dir.path().to_path_buf()
//! };
//! assert!(!scoped_temp_dir::exists(&path));
//! ```
//!
//! # Custom location and name
//!
//! ```
//! use scoped_temp_dir::Builder;
//!
//! let outer = scoped_temp_dir::ScopedTempDir::new();
//! let dir = Builder::new().prefix("build-").rand_len(6).base_dir(outer.path()).tempdir().unwrap();
//! assert!(dir.path().starts_with(outer.path()));
//! assert!(dir.path().file_name().unwrap().to_str().unwrap().starts_with("build-"));
//! ```
//!
//! # Reporting cleanup failures
//!
//! Dropping never panics; anything that could not be removed is logged through `tracing`.
//! Use [`ScopedTempDir::close`] to get those failures back instead.
//!
//! ```
//! let dir = scoped_temp_dir::ScopedTempDir::new();
//! std::fs::write(dir.path().join("a"), "").unwrap();
//! dir.close().unwrap();
//! ```

use std::{
	io,
	path::{Component, Path, PathBuf},
};

use rand::{Rng, distributions::Alphanumeric};

pub mod error;
pub mod platform;
mod remove;

pub use error::{CreateError, RemoveError, RemoveFailure};
use platform::{FsOps, Native};
pub use remove::remove_dir_all;

pub const DEFAULT_PREFIX: &str = "scoped_temp_dir.";
pub const DEFAULT_RAND_LEN: usize = 10;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

/// Construction parameters for a [`ScopedTempDir`].
#[derive(Clone, Debug)]
pub struct Builder {
	prefix: String,
	rand_len: usize,
	base_dir: Option<PathBuf>,
	max_attempts: u32,
}

impl Default for Builder {
	fn default() -> Self {
		Self {
			prefix: DEFAULT_PREFIX.to_owned(),
			rand_len: DEFAULT_RAND_LEN,
			base_dir: None,
			max_attempts: DEFAULT_MAX_ATTEMPTS,
		}
	}
}

impl Builder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Leading part of the directory name.
	pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = prefix.into();
		self
	}

	/// Number of random alphanumeric characters appended to the prefix.
	pub fn rand_len(mut self, rand_len: usize) -> Self {
		self.rand_len = rand_len;
		self
	}

	/// Directory to create the temp dir in. Defaults to [`std::env::temp_dir`].
	pub fn base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
		self.base_dir = Some(base_dir.into());
		self
	}

	/// How many names to try before giving up. At least one attempt is always made.
	pub fn max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts;
		self
	}

	/// Create the directory.
	pub fn tempdir(&self) -> Result<ScopedTempDir, CreateError> {
		self.tempdir_with(Native)
	}

	fn tempdir_with<F: FsOps>(&self, ops: F) -> Result<ScopedTempDir<F>, CreateError> {
		let path = self.create_unique(&ops)?;
		tracing::debug!(path = %path.display(), "created scoped temp dir");
		Ok(ScopedTempDir {
			path,
			builder: self.clone(),
			ops,
		})
	}

	fn create_unique<F: FsOps + ?Sized>(&self, ops: &F) -> Result<PathBuf, CreateError> {
		let base = self.base_dir.clone().unwrap_or_else(std::env::temp_dir);
		let base = std::path::absolute(&base).map_err(|source| CreateError::Io { path: base.clone(), source })?;
		let attempts = self.max_attempts.max(1);

		for attempt in 1..=attempts {
			let name = self.candidate_name();
			// anything but a single plain component would escape `base` or be `base` itself
			let mut components = Path::new(&name).components();
			if !matches!((components.next(), components.next()), (Some(Component::Normal(_)), None)) {
				return Err(CreateError::InvalidName { name });
			}
			let candidate = base.join(name);
			match ops.create_dir_exclusive(&candidate) {
				Ok(()) => return Ok(candidate),
				Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
					tracing::trace!(candidate = %candidate.display(), attempt, "temp dir name taken, retrying");
				}
				Err(source) => return Err(CreateError::Io { path: candidate, source }),
			}
		}

		Err(CreateError::Exhausted { base, attempts })
	}

	fn candidate_name(&self) -> String {
		let suffix: String = rand::thread_rng().sample_iter(&Alphanumeric).take(self.rand_len).map(char::from).collect();
		format!("{}{suffix}", self.prefix)
	}
}

/// Owns a temporary directory and deletes it, recursively, on drop.
///
/// Not `Clone`: moving the value moves the responsibility for deleting the directory.
#[derive(Debug)]
pub struct ScopedTempDir<F: FsOps = Native> {
	/// Empty once ownership has been given up via [`keep`](Self::keep) or [`close`](Self::close).
	path: PathBuf,
	builder: Builder,
	ops: F,
}

impl ScopedTempDir {
	/// Create a new temp dir with default settings.
	///
	/// # Panics
	/// If no directory could be created; use [`try_new`](Self::try_new) to handle that instead.
	pub fn new() -> Self {
		match Self::try_new() {
			Ok(dir) => dir,
			Err(e) => panic!("failed to create scoped temp dir: {e}"),
		}
	}

	pub fn try_new() -> Result<Self, CreateError> {
		Builder::new().tempdir()
	}
}

impl<F: FsOps> ScopedTempDir<F> {
	/// Absolute path of the directory.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Move the directory, contents included, to a fresh unique name next to the current one.
	///
	/// On failure the handle keeps owning the old path.
	pub fn rename(&mut self) -> Result<(), CreateError> {
		let target = self.builder.create_unique(&self.ops)?;
		if let Err(source) = self.ops.replace_dir(&self.path, &target) {
			self.ops.remove_dir(&target).ok();
			return Err(CreateError::Rename {
				from: self.path.clone(),
				to: target,
				source,
			});
		}
		tracing::debug!(from = %self.path.display(), to = %target.display(), "renamed scoped temp dir");
		self.path = target;
		Ok(())
	}

	/// Stop managing the directory and hand back its path. Nothing is deleted.
	pub fn keep(mut self) -> PathBuf {
		std::mem::take(&mut self.path)
	}

	/// Delete the directory now, returning whatever could not be removed.
	pub fn close(mut self) -> Result<(), RemoveError> {
		let path = std::mem::take(&mut self.path);
		remove::remove_tree(&self.ops, &path)
	}
}

impl Default for ScopedTempDir {
	fn default() -> Self {
		Self::new()
	}
}

impl<F: FsOps> AsRef<Path> for ScopedTempDir<F> {
	fn as_ref(&self) -> &Path {
		self.path()
	}
}

impl<F: FsOps> Drop for ScopedTempDir<F> {
	fn drop(&mut self) {
		if self.path.as_os_str().is_empty() {
			return;
		}
		if let Err(e) = remove::remove_tree(&self.ops, &self.path) {
			for failure in &e.failures {
				tracing::warn!(path = %failure.path.display(), error = %failure.source, "failed to clean up scoped temp dir entry");
			}
		}
	}
}

/// Whether anything exists at `path`, without following a trailing symlink.
///
/// A missing parent, or a parent that is not a directory, reads as "does not exist".
pub fn exists(path: impl AsRef<Path>) -> bool {
	Native.exists(path.as_ref())
}
