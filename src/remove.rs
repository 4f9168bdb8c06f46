//! Best-effort recursive deletion.
//!
//! Walks the tree with an explicit stack of open directories, so depth is bounded by the open-file
//! limit rather than by the thread's stack. Children are opened and removed relative to their parent
//! and symlinks are never followed. Every entry gets an attempt; failures are collected instead of
//! aborting the walk.

use std::{
	ffi::{OsStr, OsString},
	io,
	path::{Path, PathBuf},
};

use crate::{
	error::{RemoveError, RemoveFailure},
	platform::{Entry, EntryKind, FsOps, Native},
};

/// Recursively delete `root` and everything below it.
///
/// A `root` that does not exist is not an error, neither is any entry that vanishes mid-walk.
///
/// ```
/// let dir = scoped_temp_dir::ScopedTempDir::new().keep();
/// std::fs::create_dir(dir.join("nested")).unwrap();
/// std::fs::write(dir.join("nested/file"), "x").unwrap();
///
/// scoped_temp_dir::remove_dir_all(&dir).unwrap();
/// assert!(!scoped_temp_dir::exists(&dir));
/// ```
pub fn remove_dir_all(root: &Path) -> Result<(), RemoveError> {
	remove_tree(&Native, root)
}

struct Frame<D> {
	dir: D,
	name: OsString,
	path: PathBuf,
	pending: Vec<Entry>,
}

pub(crate) fn remove_tree<F: FsOps + ?Sized>(ops: &F, root: &Path) -> Result<(), RemoveError> {
	let mut failures = Vec::new();

	match ops.open_dir(root) {
		Ok(dir) => {
			if let Some(frame) = enter(ops, dir, OsString::new(), root.to_path_buf(), &mut failures) {
				clear(ops, frame, &mut failures);
			}
			let result = match ops.remove_dir(root) {
				Err(e) if e.kind() == io::ErrorKind::NotADirectory => ops.remove_file(root),
				other => other,
			};
			record(result, root.to_path_buf(), &mut failures);
		}
		Err(e) if e.kind() == io::ErrorKind::NotFound => {}
		// swapped for a symlink or a file: unlink that, never what it points to
		Err(e) if e.kind() == io::ErrorKind::NotADirectory => record(ops.remove_file(root), root.to_path_buf(), &mut failures),
		Err(e) => failures.push(RemoveFailure::new(root.to_path_buf(), e)),
	}

	RemoveError::check(failures)
}

fn enter<F: FsOps + ?Sized>(ops: &F, dir: F::Dir, name: OsString, path: PathBuf, failures: &mut Vec<RemoveFailure>) -> Option<Frame<F::Dir>> {
	match ops.list_dir(&dir) {
		Ok(pending) => Some(Frame { dir, name, path, pending }),
		Err(e) => {
			record(Err(e), path, failures);
			None
		}
	}
}

/// Empty the directory in `root`, leaving the directory itself.
fn clear<F: FsOps + ?Sized>(ops: &F, root: Frame<F::Dir>, failures: &mut Vec<RemoveFailure>) {
	let mut stack = vec![root];

	while let Some(frame) = stack.last_mut() {
		let Some(entry) = frame.pending.pop() else {
			// the outermost frame is `root`, removed by the caller
			if let (Some(done), Some(parent)) = (stack.pop(), stack.last()) {
				remove_entry(ops, &parent.dir, &done.name, true, done.path, failures);
			}
			continue;
		};

		let path = frame.path.join(&entry.name);
		if entry.kind != EntryKind::Dir {
			remove_entry(ops, &frame.dir, &entry.name, false, path, failures);
			continue;
		}

		match ops.open_child_dir(&frame.dir, &entry.name) {
			Ok(child) => {
				if let Some(child) = enter(ops, child, entry.name, path, failures) {
					stack.push(child);
				}
			}
			// replaced since it was listed
			Err(e) if e.kind() == io::ErrorKind::NotADirectory => remove_entry(ops, &frame.dir, &entry.name, false, path, failures),
			Err(e) => record(Err(e), path, failures),
		}
	}
}

fn remove_entry<F: FsOps + ?Sized>(ops: &F, parent: &F::Dir, name: &OsStr, is_dir: bool, path: PathBuf, failures: &mut Vec<RemoveFailure>) {
	let result = match ops.remove_child(parent, name, is_dir) {
		Err(e) if is_dir && e.kind() == io::ErrorKind::NotADirectory => ops.remove_child(parent, name, false),
		other => other,
	};
	record(result, path, failures);
}

fn record(result: io::Result<()>, path: PathBuf, failures: &mut Vec<RemoveFailure>) {
	match result {
		Ok(()) => {}
		Err(e) if e.kind() == io::ErrorKind::NotFound => {
			tracing::trace!(path = %path.display(), "already gone");
		}
		Err(e) => failures.push(RemoveFailure::new(path, e)),
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use super::*;
	use crate::{ScopedTempDir, platform::faulty::Faulty};

	fn populate(root: &Path) {
		fs::write(root.join("top"), "").unwrap();
		fs::write(root.join(".dot file"), "").unwrap();
		fs::create_dir_all(root.join("a/b c/.d")).unwrap();
		fs::write(root.join("a/b c/.d/leaf"), "").unwrap();
		fs::write(root.join("a/mid"), "").unwrap();
	}

	#[test]
	fn test_missing_root_is_ok() {
		let dir = ScopedTempDir::new();
		let gone = dir.path().join("never created");
		assert!(remove_dir_all(&gone).is_ok());
		assert!(remove_dir_all(&gone).is_ok());
	}

	#[test]
	fn test_removes_nested_tree() {
		let dir = ScopedTempDir::new();
		let root = dir.path().join("tree");
		fs::create_dir(&root).unwrap();
		populate(&root);

		remove_dir_all(&root).unwrap();
		assert!(!Native.exists(&root));
		assert!(Native.exists(dir.path()));
	}

	#[test]
	fn test_deep_nesting() {
		let dir = ScopedTempDir::new();
		let root = dir.path().join("deep");
		let mut path = root.clone();
		for _ in 0..64 {
			path.push("d");
		}
		fs::create_dir_all(&path).unwrap();
		fs::write(path.join("bottom"), "").unwrap();

		remove_dir_all(&root).unwrap();
		assert!(!Native.exists(&root));
	}

	#[test]
	fn test_vanished_entries_are_not_failures() {
		let dir = ScopedTempDir::new();
		let root = dir.path().join("tree");
		fs::create_dir(&root).unwrap();
		populate(&root);

		let ops = Faulty::new(&["top", "leaf", ".d"], io::ErrorKind::NotFound);
		remove_tree(&ops, &root).unwrap();

		assert_eq!(ops.hits.borrow().len(), 3);
		assert!(!Native.exists(&root));
	}

	#[test]
	fn test_other_failures_are_collected_and_walk_continues() {
		let dir = ScopedTempDir::new();
		let root = dir.path().join("tree");
		fs::create_dir(&root).unwrap();
		populate(&root);

		let ops = Faulty::new(&["leaf"], io::ErrorKind::PermissionDenied);
		let err = remove_tree(&ops, &root).unwrap_err();

		// the leaf itself, then every ancestor that is now non-empty
		let failed: Vec<_> = err.failures.iter().map(|f| f.path.strip_prefix(&root).unwrap().to_path_buf()).collect();
		assert_eq!(
			failed,
			vec![PathBuf::from("a/b c/.d/leaf"), PathBuf::from("a/b c/.d"), PathBuf::from("a/b c"), PathBuf::from("a"), PathBuf::new()]
		);
		assert_eq!(err.failures[0].source.kind(), io::ErrorKind::PermissionDenied);

		// siblings of the failing entry are gone regardless
		assert!(!Native.exists(&root.join("top")));
		assert!(!Native.exists(&root.join(".dot file")));
		assert!(!Native.exists(&root.join("a/mid")));
		assert!(Native.exists(&root.join("a/b c/.d/leaf")));
	}

	/// Native ops that, right after the first listing, replace `victim` with a symlink to `target`.
	#[cfg(unix)]
	struct Swapping {
		victim: PathBuf,
		target: PathBuf,
		swapped: std::cell::Cell<bool>,
	}

	#[cfg(unix)]
	impl FsOps for Swapping {
		type Dir = <Native as FsOps>::Dir;

		fn create_dir_exclusive(&self, path: &Path) -> io::Result<()> {
			Native.create_dir_exclusive(path)
		}

		fn remove_file(&self, path: &Path) -> io::Result<()> {
			Native.remove_file(path)
		}

		fn remove_dir(&self, path: &Path) -> io::Result<()> {
			Native.remove_dir(path)
		}

		fn open_dir(&self, path: &Path) -> io::Result<Self::Dir> {
			Native.open_dir(path)
		}

		fn open_child_dir(&self, parent: &Self::Dir, name: &OsStr) -> io::Result<Self::Dir> {
			Native.open_child_dir(parent, name)
		}

		fn list_dir(&self, dir: &Self::Dir) -> io::Result<Vec<Entry>> {
			let entries = Native.list_dir(dir)?;
			if !self.swapped.replace(true) {
				fs::remove_dir_all(&self.victim)?;
				std::os::unix::fs::symlink(&self.target, &self.victim)?;
			}
			Ok(entries)
		}

		fn remove_child(&self, parent: &Self::Dir, name: &OsStr, is_dir: bool) -> io::Result<()> {
			Native.remove_child(parent, name, is_dir)
		}

		fn replace_dir(&self, from: &Path, to: &Path) -> io::Result<()> {
			Native.replace_dir(from, to)
		}
	}

	#[test]
	#[cfg(unix)]
	fn test_dir_swapped_for_symlink_is_unlinked_not_followed() {
		let outside = ScopedTempDir::new();
		fs::write(outside.path().join("precious"), "keep me").unwrap();

		let dir = ScopedTempDir::new();
		let root = dir.path().join("tree");
		fs::create_dir_all(root.join("sub")).unwrap();
		fs::write(root.join("sub/inner"), "").unwrap();

		let ops = Swapping {
			victim: root.join("sub"),
			target: outside.path().to_path_buf(),
			swapped: Default::default(),
		};
		remove_tree(&ops, &root).unwrap();

		assert!(ops.swapped.get());
		assert!(!Native.exists(&root));
		assert_eq!(fs::read_to_string(outside.path().join("precious")).unwrap(), "keep me");
	}

	#[test]
	#[cfg(unix)]
	fn test_root_swapped_for_symlink_is_unlinked_not_followed() {
		let outside = ScopedTempDir::new();
		fs::write(outside.path().join("precious"), "").unwrap();

		let dir = ScopedTempDir::new();
		let root = dir.path().join("link");
		std::os::unix::fs::symlink(outside.path(), &root).unwrap();

		remove_dir_all(&root).unwrap();
		assert!(!Native.exists(&root));
		assert!(Native.exists(&outside.path().join("precious")));
	}
}
