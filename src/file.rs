//! File abstraction consumed by the detector and every handler.
//!
//! A [`RomFile`] is anything seekable that knows its size and (optionally)
//! its name. Handlers never own a file outright: they hold a [`SharedFile`],
//! a reference-counted handle that the detector, the caller, and a paired
//! sibling can each keep independently. The underlying file is closed when
//! the last handle is dropped.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::{Error, Result};

/// Seekable byte source with a known size.
pub trait RomFile: Read + Seek {
    /// Total size in bytes.
    fn size(&self) -> u64;

    /// Full name (path) of the file, if it has one.
    fn filename(&self) -> Option<&str>;
}

/// A file on disk.
#[derive(Debug)]
pub struct DiskFile {
    file: File,
    path: PathBuf,
    name: String,
    size: u64,
}

impl DiskFile {
    /// Open `path` read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let size = file.metadata()?.len();
        let name = path.to_string_lossy().into_owned();
        Ok(Self {
            file,
            path,
            name,
            size,
        })
    }

    /// Path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for DiskFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Seek for DiskFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl RomFile for DiskFile {
    fn size(&self) -> u64 {
        self.size
    }

    fn filename(&self) -> Option<&str> {
        Some(&self.name)
    }
}

/// An in-memory file, optionally named so extension checks still apply.
#[derive(Debug, Clone)]
pub struct MemFile {
    data: Cursor<Vec<u8>>,
    name: Option<String>,
}

impl MemFile {
    /// Wrap `data` with no name.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Cursor::new(data),
            name: None,
        }
    }

    /// Wrap `data` under `name` (e.g. `"game.gb"`).
    pub fn with_name(data: Vec<u8>, name: impl Into<String>) -> Self {
        Self {
            data: Cursor::new(data),
            name: Some(name.into()),
        }
    }
}

impl Read for MemFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}

impl Seek for MemFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.data.seek(pos)
    }
}

impl RomFile for MemFile {
    fn size(&self) -> u64 {
        self.data.get_ref().len() as u64
    }

    fn filename(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Reference-counted handle to an open [`RomFile`].
///
/// Cloning is cheap and shares the same underlying file. All reads are
/// positional, so owners never observe each other's seek position.
#[derive(Clone)]
pub struct SharedFile(Rc<RefCell<dyn RomFile>>);

impl std::fmt::Debug for SharedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedFile")
            .field("filename", &self.filename())
            .field("size", &self.size())
            .finish()
    }
}

impl SharedFile {
    /// Take ownership of `file`.
    pub fn new(file: impl RomFile + 'static) -> Self {
        Self(Rc::new(RefCell::new(file)))
    }

    /// Open a file on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(DiskFile::open(path)?))
    }

    /// Total size in bytes.
    pub fn size(&self) -> u64 {
        self.0.borrow().size()
    }

    /// Full file name, if any.
    pub fn filename(&self) -> Option<String> {
        self.0.borrow().filename().map(str::to_owned)
    }

    /// Extension of the file name including the leading dot, as written.
    pub fn extension(&self) -> Option<String> {
        let name = self.filename()?;
        file_extension(&name).map(str::to_owned)
    }

    /// Number of live handles to this file.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Read up to `buf.len()` bytes at `offset`, returning the count read.
    ///
    /// Stops early only at end of file.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut f = self.0.borrow_mut();
        f.seek(SeekFrom::Start(offset))?;
        let mut total = 0;
        while total < buf.len() {
            match f.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(total)
    }

    /// Read at most `len` bytes at `offset`.
    pub fn read_upto(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let n = self.read_at(offset, &mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Read exactly `len` bytes at `offset`, or [`Error::Truncated`].
    pub fn read_exact_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        if offset.checked_add(len as u64).is_none_or(|end| end > self.size()) {
            return Err(Error::Truncated);
        }
        let buf = self.read_upto(offset, len)?;
        if buf.len() != len {
            return Err(Error::Truncated);
        }
        Ok(buf)
    }

    /// Open the sibling of this file whose extension is replaced by `ext`.
    ///
    /// Only works for files with an on-disk name. Returns `None` if the
    /// sibling does not exist or cannot be opened.
    pub fn open_related(&self, ext: &str) -> Option<SharedFile> {
        let name = self.filename()?;
        let path = Path::new(&name);
        let sibling = path.with_extension(ext.trim_start_matches('.'));
        if sibling == path || !sibling.is_file() {
            return None;
        }
        SharedFile::open(sibling).ok()
    }
}

/// Extension of `name` including the leading dot.
pub fn file_extension(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let dot = base.rfind('.')?;
    if dot == 0 || dot + 1 == base.len() {
        return None;
    }
    Some(&base[dot..])
}
