//! Win32 primitives, through `std`.
//!
//! std exposes no handle-relative open or delete here, so directory handles are paths that were
//! checked with `symlink_metadata` right before use.

use std::{
	ffi::OsStr,
	fs, io,
	os::windows::fs::FileTypeExt,
	path::{Path, PathBuf},
};

use super::{Entry, EntryKind, FsOps};

#[derive(Clone, Copy, Debug, Default)]
pub struct Windows;

impl FsOps for Windows {
	type Dir = PathBuf;

	fn create_dir_exclusive(&self, path: &Path) -> io::Result<()> {
		// CreateDirectoryW fails with ERROR_ALREADY_EXISTS, which std maps to AlreadyExists.
		fs::create_dir(path)
	}

	fn remove_file(&self, path: &Path) -> io::Result<()> {
		let file_type = fs::symlink_metadata(path)?.file_type();
		if file_type.is_symlink_dir() {
			return fs::remove_dir(path);
		}
		match fs::remove_file(path) {
			Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
				clear_readonly(path)?;
				fs::remove_file(path)
			}
			other => other,
		}
	}

	fn remove_dir(&self, path: &Path) -> io::Result<()> {
		fs::remove_dir(path)
	}

	fn open_dir(&self, path: &Path) -> io::Result<PathBuf> {
		let file_type = fs::symlink_metadata(path)?.file_type();
		if file_type.is_symlink() || !file_type.is_dir() {
			return Err(io::Error::new(io::ErrorKind::NotADirectory, format!("{} is not a directory", path.display())));
		}
		Ok(path.to_path_buf())
	}

	fn open_child_dir(&self, parent: &PathBuf, name: &OsStr) -> io::Result<PathBuf> {
		self.open_dir(&parent.join(name))
	}

	fn list_dir(&self, dir: &PathBuf) -> io::Result<Vec<Entry>> {
		let mut entries = Vec::new();
		for entry in fs::read_dir(dir)? {
			let entry = entry?;
			let file_type = match entry.file_type() {
				Ok(t) => t,
				Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
				Err(e) => return Err(e),
			};
			let kind = if file_type.is_symlink() {
				EntryKind::Symlink
			} else if file_type.is_dir() {
				EntryKind::Dir
			} else {
				EntryKind::File
			};
			entries.push(Entry::new(entry.file_name(), kind));
		}
		Ok(entries)
	}

	fn remove_child(&self, parent: &PathBuf, name: &OsStr, is_dir: bool) -> io::Result<()> {
		let path = parent.join(name);
		if is_dir { fs::remove_dir(path) } else { self.remove_file(&path) }
	}

	fn replace_dir(&self, from: &Path, to: &Path) -> io::Result<()> {
		// MoveFileExW refuses to replace a directory, so drop the placeholder first.
		fs::remove_dir(to)?;
		fs::rename(from, to)
	}
}

fn clear_readonly(path: &Path) -> io::Result<()> {
	let mut permissions = fs::metadata(path)?.permissions();
	if !permissions.readonly() {
		return Err(io::Error::from(io::ErrorKind::PermissionDenied));
	}
	#[allow(clippy::permissions_set_readonly_false)]
	permissions.set_readonly(false);
	fs::set_permissions(path, permissions)
}
