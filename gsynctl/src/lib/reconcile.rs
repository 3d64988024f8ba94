//! Two-way reconciliation of a local directory tree with a remote folder tree.
//!
//! Directory pairs are processed from an explicit worklist, one at a time,
//! and every storage call is awaited before the next one is issued.
//! A failure is recorded in the [Report] and only ends the reconciliation
//! of the entry (transfers) or of the subtree (listings, local directories)
//! where it happened.

use gsync::{
    conflict::{self, Resolution},
    path::FsPathBuf,
    path_or_root, DirectoryPair, Entry, RemoteId, Report, SyncError, TransferOp,
};

use crate::{snapshot, storage, transfer};

pub struct Reconciler<L, R> {
    local: L,
    remote: R,
}

impl<L, R> Reconciler<L, R> {
    pub fn new(local: L, remote: R) -> Self {
        Reconciler { local, remote }
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }
}

impl<L, R> Reconciler<L, R>
where
    L: storage::Storage,
    R: storage::id::Storage,
{
    /// Reconciles the local root with the remote folder `root_id`, and everything below.
    pub async fn run(&self, root_id: RemoteId) -> Report {
        let mut report = Report::default();
        let mut worklist = vec![DirectoryPair::root(root_id)];

        while let Some(pair) = worklist.pop() {
            self.reconcile_dir(pair, &mut worklist, &mut report).await;
        }

        report
    }

    async fn reconcile_dir(
        &self,
        pair: DirectoryPair,
        worklist: &mut Vec<DirectoryPair>,
        report: &mut Report,
    ) {
        report.dirs_visited += 1;
        log::info!("Synchronizing folder '{}'", path_or_root(&pair.path));

        if let Err(source) = self.local.mkdir(&pair.path).await {
            let err = SyncError::Filesystem {
                path: pair.path,
                source,
            };
            log::error!("{err}");
            report.fail(err);
            return;
        }

        let listing = async {
            let local = snapshot::local(&self.local, &pair.path).await?;
            let remote = snapshot::remote(&self.remote, &pair.remote_id, &pair.path).await?;
            Ok::<_, gsync::Error>((local, remote))
        };
        let (local, remote) = match listing.await {
            Ok(snapshots) => snapshots,
            Err(source) => {
                let err = SyncError::List {
                    path: pair.path,
                    source,
                };
                log::error!("{err}");
                report.fail(err);
                return;
            }
        };

        let diff = gsync::Diff::compute(local, remote);
        if diff.common.is_empty() {
            log::debug!("No files to update in '{}'", path_or_root(&pair.path));
        }
        if diff.local_only.is_empty() && diff.remote_only.is_empty() {
            log::debug!("No files to download or upload in '{}'", path_or_root(&pair.path));
        }

        for (local, remote) in diff.common.iter() {
            self.reconcile_common(&pair, local, remote, worklist, report)
                .await;
        }
        for remote in diff.remote_only.iter() {
            self.reconcile_remote_only(&pair, remote, worklist, report)
                .await;
        }
        for local in diff.local_only.iter() {
            self.reconcile_local_only(&pair, local, worklist, report)
                .await;
        }
    }

    async fn reconcile_common(
        &self,
        pair: &DirectoryPair,
        local: &Entry,
        remote: &Entry,
        worklist: &mut Vec<DirectoryPair>,
        report: &mut Report,
    ) {
        let path = pair.path.join(local.name());

        if let Some(mismatch) = conflict::check_kinds(local, remote) {
            log::warn!("Skipping '{path}': {mismatch}");
            report.fail(SyncError::KindMismatch { path, mismatch });
            return;
        }

        let resolution = conflict::resolve(local, remote);
        log::trace!("'{path}': {resolution}");
        match resolution {
            Resolution::Equal => (),
            Resolution::Local if local.is_folder() => push_remote(pair, remote, worklist, report),
            Resolution::Local => {
                let res = match remote_id(remote) {
                    Ok(id) => transfer::update(&self.local, &self.remote, &path, local, id).await,
                    Err(err) => Err(err),
                };
                match res {
                    Ok(_) => {
                        log::info!("File '{path}' updated");
                        report.record(TransferOp::Update);
                    }
                    Err(source) => fail_transfer(report, path, TransferOp::Update, source),
                }
            }
            Resolution::Remote if remote.is_folder() => push_remote(pair, remote, worklist, report),
            Resolution::Remote => self.download(&path, remote, report).await,
        }
    }

    async fn reconcile_remote_only(
        &self,
        pair: &DirectoryPair,
        remote: &Entry,
        worklist: &mut Vec<DirectoryPair>,
        report: &mut Report,
    ) {
        if remote.is_folder() {
            push_remote(pair, remote, worklist, report);
        } else {
            let path = pair.path.join(remote.name());
            self.download(&path, remote, report).await;
        }
    }

    async fn reconcile_local_only(
        &self,
        pair: &DirectoryPair,
        local: &Entry,
        worklist: &mut Vec<DirectoryPair>,
        report: &mut Report,
    ) {
        let path = pair.path.join(local.name());
        if local.is_folder() {
            match transfer::create_folder(&self.remote, &pair.remote_id, local.name()).await {
                Ok(id) => {
                    log::info!("Folder '{path}' created");
                    report.record(TransferOp::CreateFolder);
                    worklist.push(pair.child(local.name(), id));
                }
                Err(source) => fail_transfer(report, path, TransferOp::CreateFolder, source),
            }
        } else {
            let res = transfer::upload(&self.local, &self.remote, &path, local, &pair.remote_id)
                .await;
            match res {
                Ok(_) => {
                    log::info!("File '{path}' uploaded");
                    report.record(TransferOp::Upload);
                }
                Err(source) => fail_transfer(report, path, TransferOp::Upload, source),
            }
        }
    }

    async fn download(&self, path: &FsPathBuf, remote: &Entry, report: &mut Report) {
        let res = match remote_id(remote) {
            Ok(id) => transfer::download(&self.local, &self.remote, path, id).await,
            Err(err) => Err(err),
        };
        match res {
            Ok(_) => {
                log::info!("File '{path}' downloaded");
                report.record(TransferOp::Download);
            }
            Err(source) => fail_transfer(report, path.clone(), TransferOp::Download, source),
        }
    }
}

fn remote_id(entry: &Entry) -> gsync::Result<&RemoteId> {
    entry
        .id()
        .ok_or_else(|| gsync::api_error!("Remote entry '{}' has no id", entry.name()))
}

/// Queues the remote folder `remote` and its local mirror
fn push_remote(
    pair: &DirectoryPair,
    remote: &Entry,
    worklist: &mut Vec<DirectoryPair>,
    report: &mut Report,
) {
    match remote_id(remote) {
        Ok(id) => worklist.push(pair.child(remote.name(), id.clone())),
        Err(source) => {
            let err = SyncError::List {
                path: pair.path.join(remote.name()),
                source,
            };
            log::error!("{err}");
            report.fail(err);
        }
    }
}

fn fail_transfer(report: &mut Report, path: FsPathBuf, op: TransferOp, source: gsync::Error) {
    let err = SyncError::Transfer { path, op, source };
    log::error!("{err}");
    report.fail(err);
}
