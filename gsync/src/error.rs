use std::{error, fmt, io, string::FromUtf8Error};

use camino::FromPathBufError;

use crate::{conflict::KindMismatch, path::FsPathBuf, path_or_root};

/// An error raised by a store while listing or transferring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    NotFound(String),
    Utf8(String),
    Io(String),
    Auth(String),
    Api(String),
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "No such entry: {what}"),
            Self::Utf8(msg) => write!(f, "Non UTF-8 string: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Auth(msg) => write!(f, "Authorization error: {msg}"),
            Self::Api(msg) => write!(f, "API error: {msg}"),
            Self::Other(msg) => f.write_str(msg),
        }
    }
}

impl error::Error for Error {}

impl From<FromUtf8Error> for Error {
    fn from(value: FromUtf8Error) -> Self {
        Self::Utf8(String::from_utf8_lossy(&value.into_bytes()).to_string())
    }
}

impl From<FromPathBufError> for Error {
    fn from(value: FromPathBufError) -> Self {
        Self::Utf8(value.as_path().as_os_str().to_string_lossy().to_string())
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        if value.kind() == io::ErrorKind::NotFound {
            Self::NotFound(value.to_string())
        } else {
            Self::Io(value.to_string())
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(format!("{value:#}"))
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Self::Other(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[macro_export]
macro_rules! io_bail {
    ($($t:tt)*) => {
        return ::core::result::Result::Err($crate::Error::Io(format!($($t)*)));
    };
}

#[macro_export]
macro_rules! api_bail {
    ($($t:tt)*) => {
        return ::core::result::Result::Err($crate::Error::Api(format!($($t)*)));
    };
}

#[macro_export]
macro_rules! api_error {
    ($($t:tt)*) => {
        $crate::Error::Api(format!($($t)*))
    };
}

#[macro_export]
macro_rules! auth_error {
    ($($t:tt)*) => {
        $crate::Error::Auth(format!($($t)*))
    };
}

/// The transfer operations the reconciliation can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    Upload,
    Update,
    Download,
    CreateFolder,
}

impl fmt::Display for TransferOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOp::Upload => f.write_str("upload"),
            TransferOp::Update => f.write_str("update"),
            TransferOp::Download => f.write_str("download"),
            TransferOp::CreateFolder => f.write_str("folder creation"),
        }
    }
}

/// A failure of the reconciliation, scoped to one entry or one subtree.
///
/// `List` and `Filesystem` abort the reconciliation of the directory at `path`
/// and everything below it. `Transfer` and `KindMismatch` only concern the entry at `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    List { path: FsPathBuf, source: Error },
    Filesystem { path: FsPathBuf, source: Error },
    Transfer { path: FsPathBuf, op: TransferOp, source: Error },
    KindMismatch { path: FsPathBuf, mismatch: KindMismatch },
}

impl SyncError {
    pub fn path(&self) -> &FsPathBuf {
        match self {
            Self::List { path, .. } => path,
            Self::Filesystem { path, .. } => path,
            Self::Transfer { path, .. } => path,
            Self::KindMismatch { path, .. } => path,
        }
    }

    /// Whether the failure aborted a whole subtree
    pub fn is_subtree(&self) -> bool {
        matches!(self, Self::List { .. } | Self::Filesystem { .. })
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List { path, source } => {
                write!(f, "Could not list '{}': {source}", path_or_root(path))
            }
            Self::Filesystem { path, source } => {
                write!(f, "Could not create directory '{}': {source}", path_or_root(path))
            }
            Self::Transfer { path, op, source } => {
                write!(f, "{op} of '{path}' failed: {source}")
            }
            Self::KindMismatch { path, mismatch } => {
                write!(f, "Skipped '{path}': {mismatch}")
            }
        }
    }
}

impl error::Error for SyncError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::List { source, .. } => Some(source),
            Self::Filesystem { source, .. } => Some(source),
            Self::Transfer { source, .. } => Some(source),
            Self::KindMismatch { .. } => None,
        }
    }
}
