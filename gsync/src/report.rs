use std::fmt;

use crate::{SyncError, TransferOp};

/// Outcome of a reconciliation run
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub uploaded: usize,
    pub updated: usize,
    pub downloaded: usize,
    pub folders_created: usize,
    pub dirs_visited: usize,
    pub failures: Vec<SyncError>,
}

impl Report {
    pub fn record(&mut self, op: TransferOp) {
        match op {
            TransferOp::Upload => self.uploaded += 1,
            TransferOp::Update => self.updated += 1,
            TransferOp::Download => self.downloaded += 1,
            TransferOp::CreateFolder => self.folders_created += 1,
        }
    }

    pub fn fail(&mut self, err: SyncError) {
        self.failures.push(err);
    }

    /// Number of transfer operations performed on either store
    pub fn transfers(&self) -> usize {
        self.uploaded + self.updated + self.downloaded + self.folders_created
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether the root directory itself could not be reconciled
    pub fn root_failed(&self) -> bool {
        self.failures
            .iter()
            .any(|f| f.is_subtree() && f.path().as_str().is_empty())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} folders visited, {} uploaded, {} updated, {} downloaded, {} remote folders created, {} failures",
            self.dirs_visited,
            self.uploaded,
            self.updated,
            self.downloaded,
            self.folders_created,
            self.failures.len(),
        )
    }
}
