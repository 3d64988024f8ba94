use chrono::{DateTime, Utc};
use futures::{Future, Stream};
use gsync::{Entry, RemoteId};
use tokio::io;

pub trait DirEntries {
    /// Lists the children of the folder `folder_id`
    fn dir_entries(&self, folder_id: &RemoteId)
        -> impl Stream<Item = gsync::Result<Entry>> + Send;
}

pub trait ModifiedTime {
    fn modified_time(
        &self,
        id: &RemoteId,
    ) -> impl Future<Output = gsync::Result<DateTime<Utc>>> + Send;
}

pub trait ReadFile {
    fn read_file(
        &self,
        id: &RemoteId,
    ) -> impl Future<Output = gsync::Result<impl io::AsyncRead + Send>> + Send;
}

pub trait CreateFile {
    /// Creates a file in `parent_id` with the name, size and mtime of `metadata`.
    fn create_file(
        &self,
        parent_id: &RemoteId,
        metadata: &Entry,
        data: impl io::AsyncRead + Send,
    ) -> impl Future<Output = gsync::Result<RemoteId>> + Send;
}

pub trait UpdateFile {
    /// Overwrites the content of file `id`, and sets its mtime to the one of `metadata`.
    fn update_file(
        &self,
        id: &RemoteId,
        metadata: &Entry,
        data: impl io::AsyncRead + Send,
    ) -> impl Future<Output = gsync::Result<RemoteId>> + Send;
}

pub trait MkDir {
    /// Creates a folder named `name` in `parent_id`
    fn mkdir(
        &self,
        parent_id: &RemoteId,
        name: &str,
    ) -> impl Future<Output = gsync::Result<RemoteId>> + Send;
}

/// A trait for id-based storage
pub trait Storage:
    DirEntries + ModifiedTime + ReadFile + CreateFile + UpdateFile + MkDir + Send + Sync + 'static
{
}
