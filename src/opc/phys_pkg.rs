//! Physical package access through a disposable working copy.
//!
//! An opened package never mutates the original file in place: the archive is
//! copied to a temp file first, entry reads are served from that copy, and
//! commits rewrite the copy wholesale. Saving copies the working file onto
//! the destination path.

use crate::opc::error::{OpcError, Result};
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// The zip container behind a package, held as a temp working copy.
pub struct WorkingArchive {
    /// Path the package was opened from, if any
    origin: Option<PathBuf>,

    /// The disposable working copy; removed when the archive is dropped
    work: NamedTempFile,

    /// Open handle over the current working copy contents
    zip: ZipArchive<File>,
}

impl WorkingArchive {
    /// Open an archive from a file, copying it to a fresh working copy.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let work = NamedTempFile::new()?;
        std::fs::copy(path.as_ref(), work.path())?;
        let zip = ZipArchive::new(File::open(work.path())?)?;
        Ok(Self {
            origin: Some(path.as_ref().to_path_buf()),
            work,
            zip,
        })
    }

    /// Open an archive from raw bytes. The working copy starts from the
    /// bytes and there is no origin path until `set_origin` is called.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let work = NamedTempFile::new()?;
        std::fs::write(work.path(), bytes)?;
        let zip = ZipArchive::new(File::open(work.path())?)?;
        Ok(Self {
            origin: None,
            work,
            zip,
        })
    }

    /// Get the path this archive was opened from, if any.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// Point the archive at a new origin path for subsequent saves.
    pub fn set_origin<P: AsRef<Path>>(&mut self, path: P) {
        self.origin = Some(path.as_ref().to_path_buf());
    }

    /// List entry names in central directory order.
    pub fn member_names(&mut self) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(self.zip.len());
        for i in 0..self.zip.len() {
            names.push(self.zip.by_index(i)?.name().to_string());
        }
        Ok(names)
    }

    /// Read the full content of one entry.
    pub fn read(&mut self, membername: &str) -> Result<Vec<u8>> {
        let mut entry = self.zip.by_name(membername)?;
        let mut blob = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut blob)?;
        Ok(blob)
    }

    /// Read the full content of one entry, or None if no such entry exists.
    pub fn try_read(&mut self, membername: &str) -> Result<Option<Vec<u8>>> {
        match self.read(membername) {
            Ok(blob) => Ok(Some(blob)),
            Err(OpcError::ZipError(zip::result::ZipError::FileNotFound)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Check whether an entry exists without reading it.
    pub fn contains(&self, membername: &str) -> bool {
        self.zip.file_names().any(|name| name == membername)
    }

    /// Replace the working copy with a freshly built archive, then reopen
    /// so subsequent reads observe the new contents.
    pub fn rewrite(&mut self, entries: &[(String, Vec<u8>)]) -> Result<()> {
        let mut buf = Vec::new();
        {
            let mut writer = ZipWriter::new(Cursor::new(&mut buf));
            let options = SimpleFileOptions::default();
            for (name, blob) in entries {
                writer.start_file(name.as_str(), options)?;
                writer.write_all(blob)?;
            }
            writer.finish()?;
        }
        std::fs::write(self.work.path(), &buf)?;
        self.reopen()
    }

    /// Reopen the handle over the current working copy.
    pub fn reopen(&mut self) -> Result<()> {
        self.zip = ZipArchive::new(File::open(self.work.path())?)?;
        Ok(())
    }

    /// Copy the working copy onto the origin path.
    pub fn persist(&self) -> Result<()> {
        match &self.origin {
            Some(origin) => {
                std::fs::copy(self.work.path(), origin)?;
                Ok(())
            },
            None => Err(OpcError::PackageNotFound(
                "package has no origin path to save to".to_string(),
            )),
        }
    }

    /// Copy the working copy onto a new destination path.
    pub fn persist_to<P: AsRef<Path>>(&self, dest: P) -> Result<()> {
        std::fs::copy(self.work.path(), dest.as_ref())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_entry_zip() -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut writer = ZipWriter::new(Cursor::new(&mut buf));
            let options = SimpleFileOptions::default();
            writer.start_file("a.txt", options).unwrap();
            writer.write_all(b"alpha").unwrap();
            writer.start_file("dir/b.txt", options).unwrap();
            writer.write_all(b"beta").unwrap();
            writer.finish().unwrap();
        }
        buf
    }

    #[test]
    fn test_read_members() {
        let mut archive = WorkingArchive::from_bytes(&two_entry_zip()).unwrap();
        assert_eq!(
            archive.member_names().unwrap(),
            vec!["a.txt".to_string(), "dir/b.txt".to_string()]
        );
        assert_eq!(archive.read("a.txt").unwrap(), b"alpha");
        assert_eq!(archive.try_read("missing.txt").unwrap(), None);
        assert!(archive.contains("dir/b.txt"));
    }

    #[test]
    fn test_rewrite_swaps_contents() {
        let mut archive = WorkingArchive::from_bytes(&two_entry_zip()).unwrap();
        archive
            .rewrite(&[("c.txt".to_string(), b"gamma".to_vec())])
            .unwrap();
        assert_eq!(archive.try_read("a.txt").unwrap(), None);
        assert_eq!(archive.read("c.txt").unwrap(), b"gamma");
    }

    #[test]
    fn test_persist_to() {
        let archive = WorkingArchive::from_bytes(&two_entry_zip()).unwrap();
        let dest = NamedTempFile::new().unwrap();
        archive.persist_to(dest.path()).unwrap();
        let mut reopened = WorkingArchive::open(dest.path()).unwrap();
        assert_eq!(reopened.read("dir/b.txt").unwrap(), b"beta");
    }
}
