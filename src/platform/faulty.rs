//! Native ops that fail on chosen entry names.

use std::{
	cell::RefCell,
	collections::HashSet,
	ffi::{OsStr, OsString},
	io,
	path::Path,
};

use super::{Entry, FsOps, Native};

type NativeDir = <Native as FsOps>::Dir;

/// Removing (or renaming away) an entry whose name is registered fails with `kind`.
///
/// For `NotFound` the entry really is removed first, which looks like someone else deleting it concurrently.
#[derive(Debug)]
pub(crate) struct Faulty {
	names: RefCell<HashSet<OsString>>,
	kind: io::ErrorKind,
	pub hits: RefCell<Vec<OsString>>,
}

impl Faulty {
	pub fn new(names: &[&str], kind: io::ErrorKind) -> Self {
		Self {
			names: RefCell::new(names.iter().map(OsString::from).collect()),
			kind,
			hits: RefCell::default(),
		}
	}

	pub fn fail_on(&self, name: &OsStr) {
		self.names.borrow_mut().insert(name.to_os_string());
	}

	fn intercept(&self, name: Option<&OsStr>, real: impl FnOnce() -> io::Result<()>) -> io::Result<()> {
		let Some(name) = name.filter(|n| self.names.borrow().contains(*n)) else {
			return real();
		};
		self.hits.borrow_mut().push(name.to_os_string());
		if self.kind == io::ErrorKind::NotFound {
			real()?;
		}
		Err(io::Error::from(self.kind))
	}
}

impl FsOps for Faulty {
	type Dir = NativeDir;

	fn create_dir_exclusive(&self, path: &Path) -> io::Result<()> {
		Native.create_dir_exclusive(path)
	}

	fn remove_file(&self, path: &Path) -> io::Result<()> {
		self.intercept(path.file_name(), || Native.remove_file(path))
	}

	fn remove_dir(&self, path: &Path) -> io::Result<()> {
		self.intercept(path.file_name(), || Native.remove_dir(path))
	}

	fn open_dir(&self, path: &Path) -> io::Result<NativeDir> {
		Native.open_dir(path)
	}

	fn open_child_dir(&self, parent: &NativeDir, name: &OsStr) -> io::Result<NativeDir> {
		Native.open_child_dir(parent, name)
	}

	fn list_dir(&self, dir: &NativeDir) -> io::Result<Vec<Entry>> {
		Native.list_dir(dir)
	}

	fn remove_child(&self, parent: &NativeDir, name: &OsStr, is_dir: bool) -> io::Result<()> {
		self.intercept(Some(name), || Native.remove_child(parent, name, is_dir))
	}

	fn replace_dir(&self, from: &Path, to: &Path) -> io::Result<()> {
		self.intercept(from.file_name(), || Native.replace_dir(from, to))
	}
}
