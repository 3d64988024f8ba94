use std::{collections::HashSet, sync::Mutex};

use chrono::{DateTime, Utc};
use futures::{Future, Stream};
use gsync::{path::FsPath, Entry};
use gsynctl::storage::{
    self, fs::FileSystem, Delete as _, DirEntries as _, MkDir as _, Mtime as _, ReadFile as _,
    Rename as _, WriteFile as _,
};
use tokio::io;

use crate::utils;

/// Local storage in a temporary directory, removed on drop
#[derive(Debug)]
pub struct Stub {
    inner: FileSystem,
    failing_mkdirs: Mutex<HashSet<String>>,
}

impl Stub {
    pub async fn new() -> anyhow::Result<Self> {
        let root = utils::temp_path(Some("gsync-fs"), None);
        tokio::fs::create_dir(&root).await?;
        let inner = FileSystem::new(&root)?;
        Ok(Self {
            inner,
            failing_mkdirs: Mutex::new(HashSet::new()),
        })
    }

    pub fn root(&self) -> &FsPath {
        self.inner.root()
    }

    /// Makes the creation of any directory named `name` fail
    pub fn fail_mkdir_of(&self, name: &str) {
        self.failing_mkdirs
            .lock()
            .unwrap()
            .insert(name.to_string());
    }
}

impl Drop for Stub {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(self.inner.root());
    }
}

impl storage::DirEntries for Stub {
    fn dir_entries(&self, path: &FsPath) -> impl Stream<Item = gsync::Result<Entry>> + Send {
        self.inner.dir_entries(path)
    }
}

impl storage::Mtime for Stub {
    fn mtime(&self, path: &FsPath) -> impl Future<Output = gsync::Result<DateTime<Utc>>> + Send {
        self.inner.mtime(path)
    }

    fn set_mtime(
        &self,
        path: &FsPath,
        mtime: DateTime<Utc>,
    ) -> impl Future<Output = gsync::Result<()>> + Send {
        self.inner.set_mtime(path, mtime)
    }
}

impl storage::MkDir for Stub {
    async fn mkdir(&self, path: &FsPath) -> gsync::Result<()> {
        let failing = path
            .file_name()
            .map(|name| self.failing_mkdirs.lock().unwrap().contains(name))
            .unwrap_or(false);
        if failing {
            gsync::io_bail!("Permission denied: {path}");
        }
        self.inner.mkdir(path).await
    }
}

impl storage::ReadFile for Stub {
    fn read_file(
        &self,
        path: &FsPath,
    ) -> impl Future<Output = gsync::Result<impl io::AsyncRead + Send>> + Send {
        self.inner.read_file(path)
    }
}

impl storage::WriteFile for Stub {
    fn write_file(
        &self,
        path: &FsPath,
        data: impl io::AsyncRead + Send,
    ) -> impl Future<Output = gsync::Result<u64>> + Send {
        self.inner.write_file(path, data)
    }
}

impl storage::Rename for Stub {
    fn rename(&self, from: &FsPath, to: &FsPath) -> impl Future<Output = gsync::Result<()>> + Send {
        self.inner.rename(from, to)
    }
}

impl storage::Delete for Stub {
    fn delete(&self, path: &FsPath) -> impl Future<Output = gsync::Result<()>> + Send {
        self.inner.delete(path)
    }
}

impl storage::Storage for Stub {}
