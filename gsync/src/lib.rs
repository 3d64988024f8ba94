use std::{cmp, fmt, ops::Deref};

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod conflict;
pub mod diff;
pub mod error;
pub mod loc;
pub mod oauth2;
pub mod report;

pub use crate::config::{Config, DriveConfig, ProviderConfig};
pub use crate::diff::{Diff, Snapshot};
pub use crate::error::{Error, Result, SyncError, TransferOp};
pub use crate::report::Report;

pub mod path {
    pub use camino::{Utf8Path as FsPath, Utf8PathBuf as FsPathBuf};
}

use crate::path::{FsPath, FsPathBuf};

/// Truncates `mtime` to whole seconds.
///
/// Local filesystems keep nanoseconds and Drive keeps milliseconds,
/// so both sides are brought to a one second resolution before any comparison.
pub fn normalize_mtime(mtime: DateTime<Utc>) -> DateTime<Utc> {
    mtime.trunc_subsecs(0)
}

pub fn compare_mtime(lhs: DateTime<Utc>, rhs: DateTime<Utc>) -> cmp::Ordering {
    normalize_mtime(lhs).cmp(&normalize_mtime(rhs))
}

/// Displays an empty relative path as the root of the tree
pub fn path_or_root(path: &FsPath) -> &str {
    if path.as_str().is_empty() {
        "(root)"
    } else {
        path.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Folder,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => f.write_str("file"),
            EntryKind::Folder => f.write_str("folder"),
        }
    }
}

/// Opaque identifier of a remote file or folder
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        RemoteId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for RemoteId {
    fn from(value: String) -> Self {
        RemoteId(value)
    }
}

impl From<&str> for RemoteId {
    fn from(value: &str) -> Self {
        RemoteId(value.to_string())
    }
}

impl Deref for RemoteId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RemoteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RemoteId(")?;
        fmt::Debug::fmt(&self.0, f)?;
        f.write_str(")")
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One named item of a directory listing, on either side.
///
/// `mtime` is normalized at construction, so two entries compare
/// with the same one second resolution whatever store produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    name: String,
    kind: EntryKind,
    mtime: DateTime<Utc>,
    size: Option<u64>,
    id: Option<RemoteId>,
}

impl Entry {
    pub fn local_file(name: String, size: u64, mtime: DateTime<Utc>) -> Self {
        Entry {
            name,
            kind: EntryKind::File,
            mtime: normalize_mtime(mtime),
            size: Some(size),
            id: None,
        }
    }

    pub fn local_folder(name: String, mtime: DateTime<Utc>) -> Self {
        Entry {
            name,
            kind: EntryKind::Folder,
            mtime: normalize_mtime(mtime),
            size: None,
            id: None,
        }
    }

    pub fn remote_file(id: RemoteId, name: String, size: u64, mtime: DateTime<Utc>) -> Self {
        Entry {
            name,
            kind: EntryKind::File,
            mtime: normalize_mtime(mtime),
            size: Some(size),
            id: Some(id),
        }
    }

    pub fn remote_folder(id: RemoteId, name: String, mtime: DateTime<Utc>) -> Self {
        Entry {
            name,
            kind: EntryKind::Folder,
            mtime: normalize_mtime(mtime),
            size: None,
            id: Some(id),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, EntryKind::File)
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, EntryKind::Folder)
    }

    pub fn mtime(&self) -> DateTime<Utc> {
        self.mtime
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// The remote identifier. `None` for local entries.
    pub fn id(&self) -> Option<&RemoteId> {
        self.id.as_ref()
    }
}

/// The unit of work of the reconciliation: a local directory
/// and the remote folder known to hold the same logical content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryPair {
    /// Path relative to the local root. Empty for the root itself.
    pub path: FsPathBuf,
    pub remote_id: RemoteId,
}

impl DirectoryPair {
    pub fn root(remote_id: RemoteId) -> Self {
        DirectoryPair {
            path: FsPathBuf::new(),
            remote_id,
        }
    }

    pub fn child(&self, name: &str, remote_id: RemoteId) -> Self {
        DirectoryPair {
            path: self.path.join(name),
            remote_id,
        }
    }
}
