use std::{cmp::Ordering, fmt};

use crate::{Entry, EntryKind};

/// Which side holds the authoritative version of a name present on both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Local,
    Remote,
    /// Same modification second. Assumed in sync: content is not compared.
    Equal,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local is newer"),
            Self::Remote => f.write_str("remote is newer"),
            Self::Equal => f.write_str("modified at same time"),
        }
    }
}

/// Resolves a name present on both sides by comparing modification times.
pub fn resolve(local: &Entry, remote: &Entry) -> Resolution {
    debug_assert_eq!(local.name(), remote.name());
    match crate::compare_mtime(local.mtime(), remote.mtime()) {
        Ordering::Greater => Resolution::Local,
        Ordering::Less => Resolution::Remote,
        Ordering::Equal => Resolution::Equal,
    }
}

/// A name that is a file on one side and a folder on the other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindMismatch {
    LocalFileRemoteFolder,
    LocalFolderRemoteFile,
}

impl fmt::Display for KindMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalFileRemoteFolder => f.write_str("local is file, remote is folder"),
            Self::LocalFolderRemoteFile => f.write_str("local is folder, remote is file"),
        }
    }
}

pub fn check_kinds(local: &Entry, remote: &Entry) -> Option<KindMismatch> {
    match (local.kind(), remote.kind()) {
        (EntryKind::File, EntryKind::Folder) => Some(KindMismatch::LocalFileRemoteFolder),
        (EntryKind::Folder, EntryKind::File) => Some(KindMismatch::LocalFolderRemoteFile),
        _ => None,
    }
}
