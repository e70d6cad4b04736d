//! Blob store abstraction over the persistent medium
//!
//! On the robot this is an SD card with a flat namespace of small files; the
//! engines only need whole-blob reads and writes plus append for the CSV logs.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Flat, named byte blobs on some persistent medium
pub trait BlobStore {
    /// Whether a blob with this name exists
    fn exists(&self, name: &str) -> bool;
    /// Delete a blob; deleting a missing blob is not an error
    fn remove(&mut self, name: &str) -> io::Result<()>;
    /// Read the whole blob
    fn read(&self, name: &str) -> io::Result<Vec<u8>>;
    /// Create or truncate the blob and write `bytes`
    fn write(&mut self, name: &str, bytes: &[u8]) -> io::Result<()>;
    /// Append `bytes`, creating the blob if needed
    fn append(&mut self, name: &str, bytes: &[u8]) -> io::Result<()>;
    /// Size in bytes; a missing blob has size 0
    fn size(&self, name: &str) -> io::Result<u64>;
}

impl<S: BlobStore + ?Sized> BlobStore for &mut S {
    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }
    fn remove(&mut self, name: &str) -> io::Result<()> {
        (**self).remove(name)
    }
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        (**self).read(name)
    }
    fn write(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        (**self).write(name, bytes)
    }
    fn append(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        (**self).append(name, bytes)
    }
    fn size(&self, name: &str) -> io::Result<u64> {
        (**self).size(name)
    }
}

/// Blobs stored as files in one directory
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Use `root` as the store, creating it if it does not exist
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl BlobStore for DirStore {
    fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn remove(&mut self, name: &str) -> io::Result<()> {
        match fs::remove_file(self.path(name)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path(name))
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let mut file = fs::File::create(self.path(name))?;
        file.write_all(bytes)?;
        file.sync_all()
    }

    fn append(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(self.path(name))?;
        file.write_all(bytes)
    }

    fn size(&self, name: &str) -> io::Result<u64> {
        match fs::metadata(self.path(name)) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }
}

/// In-memory store for tests and dry runs
///
/// `set_read_only(true)` makes every mutation fail, which is how a pulled
/// SD card looks to the engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: HashMap<String, Vec<u8>>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Borrow a blob's content
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.blobs.get(name).map(Vec::as_slice)
    }

    /// Replace a blob's content directly, bypassing `read_only`
    pub fn insert(&mut self, name: &str, bytes: Vec<u8>) {
        self.blobs.insert(name.to_string(), bytes);
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.blobs.keys().cloned().collect();
        names.sort();
        names
    }

    fn check_writable(&self) -> io::Result<()> {
        if self.read_only {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "store is read-only"));
        }
        Ok(())
    }
}

impl BlobStore for MemoryStore {
    fn exists(&self, name: &str) -> bool {
        self.blobs.contains_key(name)
    }

    fn remove(&mut self, name: &str) -> io::Result<()> {
        self.check_writable()?;
        self.blobs.remove(name);
        Ok(())
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        self.blobs
            .get(name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))
    }

    fn write(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        self.check_writable()?;
        self.blobs.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn append(&mut self, name: &str, bytes: &[u8]) -> io::Result<()> {
        self.check_writable()?;
        self.blobs.entry(name.to_string()).or_default().extend_from_slice(bytes);
        Ok(())
    }

    fn size(&self, name: &str) -> io::Result<u64> {
        Ok(self.blobs.get(name).map_or(0, |b| b.len() as u64))
    }
}
