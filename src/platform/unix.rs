//! POSIX primitives. Directory walks use `openat`/`fstatat`/`unlinkat` relative to open descriptors.

use std::{
	ffi::{CStr, CString, OsStr, OsString},
	fs::{self, DirBuilder, OpenOptions},
	io,
	mem::MaybeUninit,
	os::{
		fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd},
		unix::{
			ffi::{OsStrExt, OsStringExt},
			fs::{DirBuilderExt, OpenOptionsExt},
		},
	},
	path::Path,
};

use super::{Entry, EntryKind, FsOps};

/// Owner-only, like `mkdtemp`.
const DIR_MODE: u32 = 0o700;

#[derive(Clone, Copy, Debug, Default)]
pub struct Unix;

impl FsOps for Unix {
	type Dir = OwnedFd;

	fn create_dir_exclusive(&self, path: &Path) -> io::Result<()> {
		DirBuilder::new().mode(DIR_MODE).create(path)
	}

	fn remove_file(&self, path: &Path) -> io::Result<()> {
		fs::remove_file(path)
	}

	fn remove_dir(&self, path: &Path) -> io::Result<()> {
		fs::remove_dir(path)
	}

	fn open_dir(&self, path: &Path) -> io::Result<OwnedFd> {
		let file = OpenOptions::new()
			.read(true)
			.custom_flags(libc::O_DIRECTORY | libc::O_NOFOLLOW)
			.open(path)
			.map_err(not_a_dir)?;
		Ok(file.into())
	}

	fn open_child_dir(&self, parent: &OwnedFd, name: &OsStr) -> io::Result<OwnedFd> {
		let name = c_name(name)?;
		// SAFETY: `parent` is an open descriptor and `name` is NUL-terminated.
		let fd = unsafe { libc::openat(parent.as_raw_fd(), name.as_ptr(), libc::O_RDONLY | libc::O_DIRECTORY | libc::O_NOFOLLOW | libc::O_CLOEXEC) };
		if fd < 0 {
			return Err(not_a_dir(io::Error::last_os_error()));
		}
		// SAFETY: `fd` was just returned by `openat` and nothing else owns it.
		Ok(unsafe { OwnedFd::from_raw_fd(fd) })
	}

	/// A `readdir` error ends the listing early; whatever is left shows up as a failed `rmdir` later.
	fn list_dir(&self, dir: &OwnedFd) -> io::Result<Vec<Entry>> {
		let stream = DirStream::open(dir)?;
		let mut entries = Vec::new();
		while let Some(name) = stream.next_name() {
			if matches!(name.to_bytes(), b"." | b"..") {
				continue;
			}
			let kind = match stat_kind(dir, &name) {
				Ok(kind) => kind,
				Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
				Err(e) => {
					tracing::debug!(name = ?name, error = %e, "could not stat entry, assuming non-directory");
					EntryKind::File
				}
			};
			entries.push(Entry::new(OsString::from_vec(name.into_bytes()), kind));
		}
		Ok(entries)
	}

	fn remove_child(&self, parent: &OwnedFd, name: &OsStr, is_dir: bool) -> io::Result<()> {
		let name = c_name(name)?;
		let flags = if is_dir { libc::AT_REMOVEDIR } else { 0 };
		// SAFETY: `parent` is an open descriptor and `name` is NUL-terminated.
		let rc = unsafe { libc::unlinkat(parent.as_raw_fd(), name.as_ptr(), flags) };
		if rc != 0 {
			return Err(io::Error::last_os_error());
		}
		Ok(())
	}

	fn replace_dir(&self, from: &Path, to: &Path) -> io::Result<()> {
		// rename(2) atomically replaces an empty target directory
		fs::rename(from, to)
	}
}

/// `O_NOFOLLOW` reports a symlink as `ELOOP`; fold that into the same kind as a plain non-directory.
fn not_a_dir(err: io::Error) -> io::Error {
	match err.raw_os_error() {
		Some(libc::ELOOP | libc::ENOTDIR) => io::Error::new(io::ErrorKind::NotADirectory, err),
		_ => err,
	}
}

fn c_name(name: &OsStr) -> io::Result<CString> {
	CString::new(name.as_bytes()).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

fn stat_kind(dir: &OwnedFd, name: &CStr) -> io::Result<EntryKind> {
	let mut st = MaybeUninit::<libc::stat>::uninit();
	// SAFETY: `dir` is an open descriptor, `name` is NUL-terminated and `st` is writable.
	let rc = unsafe { libc::fstatat(dir.as_raw_fd(), name.as_ptr(), st.as_mut_ptr(), libc::AT_SYMLINK_NOFOLLOW) };
	if rc != 0 {
		return Err(io::Error::last_os_error());
	}
	// SAFETY: `fstatat` succeeded, so `st` is initialized.
	let mode = unsafe { st.assume_init() }.st_mode & libc::S_IFMT;
	Ok(match mode {
		libc::S_IFDIR => EntryKind::Dir,
		libc::S_IFLNK => EntryKind::Symlink,
		_ => EntryKind::File,
	})
}

/// A `DIR*` over a duplicate of a directory descriptor.
struct DirStream(*mut libc::DIR);

impl DirStream {
	fn open(dir: &OwnedFd) -> io::Result<Self> {
		let fd = dir.try_clone()?.into_raw_fd();
		// SAFETY: `fd` is an open directory descriptor we own; on success the stream owns it.
		let stream = unsafe { libc::fdopendir(fd) };
		if stream.is_null() {
			let err = io::Error::last_os_error();
			// SAFETY: `fdopendir` failed, so `fd` is still ours.
			drop(unsafe { OwnedFd::from_raw_fd(fd) });
			return Err(err);
		}
		// SAFETY: `stream` is valid. The duplicate shares its offset with `dir`, so start from the top.
		unsafe { libc::rewinddir(stream) };
		Ok(Self(stream))
	}

	fn next_name(&self) -> Option<CString> {
		// SAFETY: the stream is open for as long as `self` lives.
		let ent = unsafe { libc::readdir(self.0) };
		if ent.is_null() {
			return None;
		}
		// SAFETY: `ent` points at a valid dirent until the next `readdir`; `d_name` is NUL-terminated.
		let name = unsafe { CStr::from_ptr((*ent).d_name.as_ptr()) };
		Some(name.to_owned())
	}
}

impl Drop for DirStream {
	fn drop(&mut self) {
		// SAFETY: the stream came from `fdopendir` and is closed exactly once.
		unsafe { libc::closedir(self.0) };
	}
}
