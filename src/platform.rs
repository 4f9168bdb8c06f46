//! Filesystem primitives the temp directory is built on.
//!
//! Everything OS-specific sits behind [`FsOps`]. The rest of the crate only ever
//! talks to [`Native`], which resolves to the implementation for the target family.
//!
//! Deletion goes through directory handles: a child is opened relative to its parent and
//! removed relative to its parent, so a directory swapped for a symlink mid-walk is unlinked
//! rather than descended into.

use std::{
	ffi::{OsStr, OsString},
	io,
	path::Path,
};

#[cfg(test)]
pub(crate) mod faulty;
#[cfg(unix)]
pub mod unix;
#[cfg(windows)]
pub mod windows;

#[cfg(unix)]
pub use unix::Unix as Native;
#[cfg(windows)]
pub use windows::Windows as Native;

/// What kind of thing a directory entry is, as seen without following symlinks.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntryKind {
	Dir,
	File,
	Symlink,
}

/// A single entry of a directory listing.
#[derive(Clone, Debug, Eq, PartialEq, derive_new::new)]
pub struct Entry {
	pub name: OsString,
	pub kind: EntryKind,
}

/// The filesystem capabilities a scoped temp directory needs.
///
/// Opening a directory never follows a symlink; when the path is not a real directory the
/// error kind is [`io::ErrorKind::NotADirectory`].
pub trait FsOps {
	/// An open directory.
	type Dir;

	/// Create `path` if and only if nothing exists there yet.
	///
	/// A collision must surface as [`io::ErrorKind::AlreadyExists`].
	fn create_dir_exclusive(&self, path: &Path) -> io::Result<()>;

	/// Remove a non-directory entry (regular file or symlink of any flavour).
	fn remove_file(&self, path: &Path) -> io::Result<()>;

	/// Remove an empty directory.
	fn remove_dir(&self, path: &Path) -> io::Result<()>;

	fn open_dir(&self, path: &Path) -> io::Result<Self::Dir>;

	/// Open the directory `name` inside `parent`.
	fn open_child_dir(&self, parent: &Self::Dir, name: &OsStr) -> io::Result<Self::Dir>;

	/// List an open directory, without `.` and `..`.
	fn list_dir(&self, dir: &Self::Dir) -> io::Result<Vec<Entry>>;

	/// Remove `name` from `parent`; `is_dir` selects between an empty directory and anything else.
	fn remove_child(&self, parent: &Self::Dir, name: &OsStr, is_dir: bool) -> io::Result<()>;

	/// Move the directory `from` onto `to`, which is an empty directory this process just reserved.
	fn replace_dir(&self, from: &Path, to: &Path) -> io::Result<()>;

	/// `lstat`-style existence check.
	fn exists(&self, path: &Path) -> bool {
		match std::fs::symlink_metadata(path) {
			Ok(_) => true,
			Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => false,
			Err(e) => {
				tracing::warn!(path = %path.display(), error = %e, "could not stat path, treating as missing");
				false
			}
		}
	}
}
