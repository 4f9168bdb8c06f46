use std::{fmt, io, path::PathBuf};

use thiserror::Error;

/// Failure to bring a temp directory into existence.
#[derive(Debug, Error)]
pub enum CreateError {
	#[error("no unique directory name found under {} after {attempts} attempts", .base.display())]
	Exhausted { base: PathBuf, attempts: u32 },
	#[error("{name:?} is not a single plain path component")]
	InvalidName { name: String },
	#[error("failed to create {}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("failed to move {} to {}", .from.display(), .to.display())]
	Rename {
		from: PathBuf,
		to: PathBuf,
		#[source]
		source: io::Error,
	},
}

/// One entry that could not be removed.
#[derive(Debug, derive_new::new)]
pub struct RemoveFailure {
	pub path: PathBuf,
	pub source: io::Error,
}

impl fmt::Display for RemoveFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.path.display(), self.source)
	}
}

/// Everything that went wrong during a best-effort recursive delete.
///
/// Entries that were already gone never show up here.
#[derive(Debug, Error)]
pub struct RemoveError {
	pub failures: Vec<RemoveFailure>,
}

impl fmt::Display for RemoveError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.failures.as_slice() {
			[] => write!(f, "nothing failed to be removed"),
			[only] => write!(f, "could not remove {only}"),
			[first, rest @ ..] => write!(f, "could not remove {first} (and {} more)", rest.len()),
		}
	}
}

impl RemoveError {
	/// `Ok` when nothing was collected.
	pub(crate) fn check(failures: Vec<RemoveFailure>) -> Result<(), Self> {
		if failures.is_empty() { Ok(()) } else { Err(Self { failures }) }
	}
}
