//! The four transfer primitives requested by the reconciliation.
//!
//! Each one is a single operation between the two stores,
//! addressed by a path relative to the local root on one side
//! and by an identifier on the other.

use gsync::{
    path::{FsPath, FsPathBuf},
    Entry, RemoteId,
};

use crate::storage;

/// Creates `entry` in the remote folder `parent_id` with the content of the local file at `path`
pub async fn upload<L, R>(
    local: &L,
    remote: &R,
    path: &FsPath,
    entry: &Entry,
    parent_id: &RemoteId,
) -> gsync::Result<RemoteId>
where
    L: storage::ReadFile,
    R: storage::id::CreateFile,
{
    let data = local.read_file(path).await?;
    remote.create_file(parent_id, entry, data).await
}

/// Overwrites the remote file `id` with the local file at `path`.
/// The remote mtime is set to the one of `entry`.
pub async fn update<L, R>(
    local: &L,
    remote: &R,
    path: &FsPath,
    entry: &Entry,
    id: &RemoteId,
) -> gsync::Result<RemoteId>
where
    L: storage::ReadFile,
    R: storage::id::UpdateFile,
{
    let data = local.read_file(path).await?;
    remote.update_file(id, entry, data).await
}

/// Writes the content of the remote file `id` to the local file at `path`,
/// with the local mtime aligned on the remote one.
/// Returns the number of bytes written.
///
/// The content is staged in a sibling [partial_path] and only replaces the file at `path`
/// once complete and timestamped. On failure `path` is left untouched and the staging file is removed.
pub async fn download<L, R>(
    local: &L,
    remote: &R,
    path: &FsPath,
    id: &RemoteId,
) -> gsync::Result<u64>
where
    L: storage::WriteFile + storage::Mtime + storage::Rename + storage::Delete,
    R: storage::id::ReadFile + storage::id::ModifiedTime,
{
    let part = partial_path(path);
    let res: gsync::Result<u64> = async {
        let data = remote.read_file(id).await?;
        let written = local.write_file(&part, data).await?;
        let mtime = remote.modified_time(id).await?;
        local.set_mtime(&part, mtime).await?;
        local.rename(&part, path).await?;
        Ok(written)
    }
    .await;

    if res.is_err() {
        match local.delete(&part).await {
            Ok(()) | Err(gsync::Error::NotFound(_)) => (),
            Err(err) => log::warn!("Could not remove {part}: {err}"),
        }
    }
    res
}

const PARTIAL_EXT: &str = ".gsync-part";

/// The hidden sibling of `path` where a download is staged
pub fn partial_path(path: &FsPath) -> FsPathBuf {
    let name = path.file_name().unwrap_or_default();
    path.with_file_name(format!(".{name}{PARTIAL_EXT}"))
}

pub fn is_partial(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(PARTIAL_EXT)
}

/// Creates the folder `name` in the remote folder `parent_id`
pub async fn create_folder<R>(remote: &R, parent_id: &RemoteId, name: &str) -> gsync::Result<RemoteId>
where
    R: storage::id::MkDir,
{
    remote.mkdir(parent_id, name).await
}
