//! Single-level listings of both stores, keyed by name

use futures::TryStreamExt;
use gsync::{path::FsPath, path_or_root, RemoteId, Snapshot};

use crate::storage;

/// Lists the local directory at `path`.
/// When a name shows up twice, the first entry is kept.
pub async fn local<L>(local: &L, path: &FsPath) -> gsync::Result<Snapshot>
where
    L: storage::DirEntries,
{
    let entries = local.dir_entries(path);
    tokio::pin!(entries);
    let mut snapshot = Snapshot::new();
    while let Some(entry) = entries.try_next().await? {
        if let Err(dup) = snapshot.insert(entry) {
            log::warn!(
                "Duplicate local entry '{}' in '{}' ignored",
                dup.name(),
                path_or_root(path)
            );
        }
    }
    Ok(snapshot)
}

/// Lists the remote folder `folder_id`, mirror of the local directory at `path`.
/// When a name shows up twice, the first entry is kept.
/// Fails if an entry has no identifier.
pub async fn remote<R>(remote: &R, folder_id: &RemoteId, path: &FsPath) -> gsync::Result<Snapshot>
where
    R: storage::id::DirEntries,
{
    let entries = remote.dir_entries(folder_id);
    tokio::pin!(entries);
    let mut snapshot = Snapshot::new();
    while let Some(entry) = entries.try_next().await? {
        if entry.id().is_none() {
            return Err(gsync::api_error!(
                "Remote entry '{}' in '{}' has no id",
                entry.name(),
                path_or_root(path)
            ));
        }
        if let Err(dup) = snapshot.insert(entry) {
            log::warn!(
                "Duplicate remote entry '{}' in '{}' ignored (id {})",
                dup.name(),
                path_or_root(path),
                dup.id().map(RemoteId::as_str).unwrap_or_default(),
            );
        }
    }
    Ok(snapshot)
}
