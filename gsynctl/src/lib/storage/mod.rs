//! Capabilities of the two stores consumed by the reconciliation.
//!
//! The local store is addressed by paths relative to its root.
//! The remote store, in [id], is addressed by [gsync::RemoteId].

use chrono::{DateTime, Utc};
use futures::{Future, Stream};
use gsync::{path::FsPath, Entry};
use tokio::io;

pub mod fs;
pub mod gdrive;
pub mod id;

pub trait DirEntries {
    /// Lists the children of the directory at `path`.
    /// Entries that are neither regular files nor directories are not listed.
    fn dir_entries(&self, path: &FsPath) -> impl Stream<Item = gsync::Result<Entry>> + Send;
}

pub trait Mtime {
    fn mtime(&self, path: &FsPath) -> impl Future<Output = gsync::Result<DateTime<Utc>>> + Send;

    fn set_mtime(
        &self,
        path: &FsPath,
        mtime: DateTime<Utc>,
    ) -> impl Future<Output = gsync::Result<()>> + Send;
}

pub trait MkDir {
    /// Creates the directory at `path` and its missing parents.
    /// Succeeds if the directory already exists.
    fn mkdir(&self, path: &FsPath) -> impl Future<Output = gsync::Result<()>> + Send;
}

pub trait ReadFile {
    fn read_file(
        &self,
        path: &FsPath,
    ) -> impl Future<Output = gsync::Result<impl io::AsyncRead + Send>> + Send;
}

pub trait WriteFile {
    /// Creates or truncates the file at `path` and writes `data` to it.
    /// Returns the number of bytes written.
    fn write_file(
        &self,
        path: &FsPath,
        data: impl io::AsyncRead + Send,
    ) -> impl Future<Output = gsync::Result<u64>> + Send;
}

pub trait Rename {
    /// Moves the file at `from` to `to`, replacing any file at `to`.
    fn rename(&self, from: &FsPath, to: &FsPath) -> impl Future<Output = gsync::Result<()>> + Send;
}

pub trait Delete {
    fn delete(&self, path: &FsPath) -> impl Future<Output = gsync::Result<()>> + Send;
}

/// A trait for path-based storage
pub trait Storage:
    DirEntries + Mtime + MkDir + ReadFile + WriteFile + Rename + Delete + Send + Sync + 'static
{
}
