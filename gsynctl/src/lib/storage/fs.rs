use async_stream::try_stream;
use chrono::{DateTime, Utc};
use futures::Stream;
use gsync::{
    path::{FsPath, FsPathBuf},
    Entry,
};
use tokio::{
    fs::{self, DirEntry},
    io,
};

use crate::transfer;

/// The local side of the reconciliation, rooted at an existing directory
#[derive(Debug, Clone)]
pub struct FileSystem {
    root: FsPathBuf,
}

impl FileSystem {
    /// Build a new filesystem storage.
    /// Fails if `root` is not an absolute path to an existing directory.
    pub fn new<P>(root: P) -> anyhow::Result<Self>
    where
        P: AsRef<FsPath>,
    {
        let root = root.as_ref();
        anyhow::ensure!(root.is_absolute(), "{root} is not an absolute path");
        let root = root.canonicalize_utf8()?;
        anyhow::ensure!(root.is_dir(), "{root} is not a directory");
        log::info!("Initializing FS storage in {root}");

        Ok(FileSystem { root })
    }

    pub fn root(&self) -> &FsPath {
        &self.root
    }

    fn fs_path(&self, path: &FsPath) -> FsPathBuf {
        debug_assert!(path.is_relative(), "{path} is not relative to the storage root");
        if path.as_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }
}

impl super::DirEntries for FileSystem {
    fn dir_entries(
        &self,
        parent_path: &FsPath,
    ) -> impl Stream<Item = gsync::Result<Entry>> + Send {
        let fs_base = self.fs_path(parent_path);
        log::trace!("listing entries of {fs_base}");
        try_stream! {
            let mut read_dir = fs::read_dir(&fs_base).await?;
            while let Some(direntry) = read_dir.next_entry().await? {
                if let Some(entry) = map_direntry(&fs_base, &direntry).await? {
                    yield entry;
                }
            }
        }
    }
}

impl super::Mtime for FileSystem {
    async fn mtime(&self, path: &FsPath) -> gsync::Result<DateTime<Utc>> {
        let fs_path = self.fs_path(path);
        let metadata = fs::metadata(&fs_path).await?;
        Ok(metadata.modified()?.into())
    }

    async fn set_mtime(&self, path: &FsPath, mtime: DateTime<Utc>) -> gsync::Result<()> {
        let fs_path = self.fs_path(path);
        log::trace!("setting mtime of {fs_path} to {mtime}");
        let f = fs::OpenOptions::new().write(true).open(&fs_path).await?;
        let f = f.into_std().await;
        f.set_modified(mtime.into())?;
        Ok(())
    }
}

impl super::MkDir for FileSystem {
    async fn mkdir(&self, path: &FsPath) -> gsync::Result<()> {
        let fs_path = self.fs_path(path);
        if fs_path.is_dir() {
            return Ok(());
        }
        log::debug!("mkdir -p {fs_path}");
        fs::create_dir_all(&fs_path).await?;
        Ok(())
    }
}

impl super::ReadFile for FileSystem {
    async fn read_file(&self, path: &FsPath) -> gsync::Result<impl io::AsyncRead + Send> {
        let fs_path = self.fs_path(path);
        log::trace!("reading {fs_path}");
        Ok(fs::File::open(&fs_path).await?)
    }
}

impl super::WriteFile for FileSystem {
    async fn write_file(
        &self,
        path: &FsPath,
        data: impl io::AsyncRead + Send,
    ) -> gsync::Result<u64> {
        let fs_path = self.fs_path(path);
        if fs_path.is_dir() {
            gsync::io_bail!("{fs_path} is a directory");
        }
        log::trace!("writing {fs_path}");
        tokio::pin!(data);
        let mut f = fs::File::create(&fs_path).await?;
        let written = io::copy(&mut data, &mut f).await?;
        f.sync_all().await?;
        Ok(written)
    }
}

impl super::Rename for FileSystem {
    async fn rename(&self, from: &FsPath, to: &FsPath) -> gsync::Result<()> {
        let fs_from = self.fs_path(from);
        let fs_to = self.fs_path(to);
        log::trace!("renaming {fs_from} to {fs_to}");
        fs::rename(&fs_from, &fs_to).await?;
        Ok(())
    }
}

impl super::Delete for FileSystem {
    async fn delete(&self, path: &FsPath) -> gsync::Result<()> {
        let fs_path = self.fs_path(path);
        log::trace!("deleting {fs_path}");
        fs::remove_file(&fs_path).await?;
        Ok(())
    }
}

impl super::Storage for FileSystem {}

/// Maps a directory entry to an [Entry].
/// Returns `None` for the entries that take no part in the reconciliation.
async fn map_direntry(fs_base: &FsPath, direntry: &DirEntry) -> gsync::Result<Option<Entry>> {
    let name = match direntry.file_name().into_string() {
        Ok(name) => name,
        Err(name) => {
            log::warn!(
                "Skipping non UTF-8 entry '{}' in {fs_base}",
                name.to_string_lossy()
            );
            return Ok(None);
        }
    };
    if transfer::is_partial(&name) {
        log::debug!("Skipping partial download {fs_base}/{name}");
        return Ok(None);
    }
    // does not follow symlinks
    let metadata = direntry.metadata().await?;
    let entry = if metadata.is_symlink() {
        log::warn!("Skipping symlink {fs_base}/{name}");
        None
    } else if metadata.is_file() {
        let mtime = metadata.modified()?.into();
        Some(Entry::local_file(name, metadata.len(), mtime))
    } else if metadata.is_dir() {
        let mtime = metadata.modified()?.into();
        Some(Entry::local_folder(name, mtime))
    } else {
        log::warn!("Skipping special file {fs_base}/{name}");
        None
    };
    Ok(entry)
}
