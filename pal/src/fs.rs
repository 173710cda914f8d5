// Licensed under the Apache-2.0 license

//! Flat file storage rooted in one directory.

use crate::error::{PalError, PalResult};
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read only. The file must exist.
    Read,
    /// Write only. Creates or truncates.
    Write,
    /// Write at the end. Creates if missing.
    Append,
    /// Read and write. Creates or truncates.
    ReadWrite,
}

impl OpenMode {
    fn options(self) -> fs::OpenOptions {
        let mut options = fs::OpenOptions::new();
        match self {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.append(true).create(true),
            OpenMode::ReadWrite => options.read(true).write(true).create(true).truncate(true),
        };
        options
    }
}

/// File storage confined to a root directory.
///
/// Paths passed to every operation are relative to the root; absolute paths
/// and `..` components are rejected.
#[derive(Debug)]
pub struct FileSystem {
    root: PathBuf,
}

impl FileSystem {
    /// Uses `root` as the storage directory, creating it if needed.
    pub fn init(root: impl Into<PathBuf>) -> PalResult<Self> {
        let root = root.into();
        match fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(PalError::AlreadyExists),
            Err(_) => fs::create_dir_all(&root)?,
        }
        log::debug!("file storage rooted at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PalResult<PathBuf> {
        let relative = Path::new(path);
        let confined = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !confined {
            return Err(PalError::InvalidParameter);
        }
        Ok(self.root.join(relative))
    }

    pub fn open(&self, path: &str, mode: OpenMode) -> PalResult<File> {
        let full = self.resolve(path)?;
        let inner = mode.options().open(full)?;
        Ok(File { inner, mode })
    }

    pub fn remove(&self, path: &str) -> PalResult<()> {
        fs::remove_file(self.resolve(path)?)?;
        Ok(())
    }

    /// Size of the file in bytes.
    pub fn size(&self, path: &str) -> PalResult<u64> {
        Ok(fs::metadata(self.resolve(path)?)?.len())
    }

    pub fn exists(&self, path: &str) -> PalResult<bool> {
        Ok(self.resolve(path)?.exists())
    }

    /// Removes the root directory. Fails while it still holds files.
    pub fn deinit(self) -> PalResult<()> {
        fs::remove_dir(&self.root)?;
        log::debug!("file storage at {} removed", self.root.display());
        Ok(())
    }
}

/// Open file inside a [`FileSystem`]. Closed on drop.
#[derive(Debug)]
pub struct File {
    inner: fs::File,
    mode: OpenMode,
}

impl File {
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Writes all of `buf` and flushes it to storage.
    pub fn write(&mut self, buf: &[u8]) -> PalResult<usize> {
        self.inner.write_all(buf)?;
        if !buf.is_empty() {
            self.inner.sync_data()?;
        }
        Ok(buf.len())
    }

    /// Reads up to `buf.len()` bytes. Returns 0 at end of file.
    pub fn read(&mut self, buf: &mut [u8]) -> PalResult<usize> {
        Ok(self.inner.read(buf)?)
    }

    /// Moves to `offset` bytes from the start of the file.
    pub fn seek(&mut self, offset: u64) -> PalResult<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    pub fn close(self) -> PalResult<()> {
        self.inner.sync_all()?;
        Ok(())
    }
}
