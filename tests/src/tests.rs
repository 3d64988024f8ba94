use gsync::{conflict::KindMismatch, SyncError, TransferOp};

use crate::{
    dataset::{self, Dataset, Entry, T0},
    harness,
    utils::ts,
};

#[tokio::test]
async fn newer_remote_file_is_downloaded() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[
        Entry::File{name: "a.txt", content: "local a", mtime: 100},
    ];
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[
        Entry::File{name: "a.txt", content: "remote a", mtime: 200},
    ];
    let harness = harness(Dataset {
        local: LOCAL,
        remote: REMOTE,
    })
    .await;

    let report = harness.run().await;

    assert!(report.is_clean());
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.transfers(), 1);
    assert_eq!(harness.local_content("a.txt").as_deref(), Some("remote a"));
    assert_eq!(harness.local_mtime("a.txt"), Some(ts(T0 + 200)));
    assert_eq!(harness.remote().content("a.txt").as_deref(), Some("remote a"));
}

#[tokio::test]
async fn newer_local_file_updates_remote() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[
        Entry::File{name: "a.txt", content: "local a", mtime: 200},
    ];
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[
        Entry::File{name: "a.txt", content: "remote a", mtime: 100},
    ];
    let harness = harness(Dataset {
        local: LOCAL,
        remote: REMOTE,
    })
    .await;
    let id = harness.remote().find("a.txt").unwrap();

    let report = harness.run().await;

    assert!(report.is_clean());
    assert_eq!(report.updated, 1);
    assert_eq!(report.transfers(), 1);
    // updated in place
    assert_eq!(harness.remote().find("a.txt"), Some(id));
    assert_eq!(harness.remote().content("a.txt").as_deref(), Some("local a"));
    assert_eq!(harness.remote().mtime("a.txt"), Some(ts(T0 + 200)));
    assert_eq!(harness.local_content("a.txt").as_deref(), Some("local a"));
}

#[tokio::test]
async fn empty_local_folder_is_created_remotely() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[
        Entry::Dir{name: "docs", mtime: 0, entries: &[]},
    ];
    let harness = harness(Dataset {
        local: LOCAL,
        remote: &[],
    })
    .await;

    let report = harness.run().await;

    assert!(report.is_clean());
    assert_eq!(report.folders_created, 1);
    assert_eq!(report.transfers(), 1);
    assert!(harness.remote().is_folder("docs"));
    assert!(harness.remote().entries("docs").is_empty());
    assert_eq!(harness.remote().ops().creates, 0);
}

#[tokio::test]
async fn local_only_file_is_uploaded() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[
        Entry::File{name: "report.pdf", content: "%PDF-1.7", mtime: 50},
    ];
    let harness = harness(Dataset {
        local: LOCAL,
        remote: &[],
    })
    .await;
    assert!(harness.remote().entries("").is_empty());

    let report = harness.run().await;

    assert!(report.is_clean());
    assert_eq!(report.uploaded, 1);
    let entries = harness.remote().entries("");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name(), "report.pdf");
    assert_eq!(entries[0].size(), Some(8));
    assert_eq!(entries[0].mtime(), ts(T0 + 50));
    assert_eq!(
        harness.remote().content("report.pdf").as_deref(),
        Some("%PDF-1.7")
    );
}

#[tokio::test]
async fn equal_mtime_is_left_alone() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[
        Entry::File{name: "notes.txt", content: "local notes", mtime: 100},
    ];
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[
        Entry::File{name: "notes.txt", content: "remote notes", mtime: 100},
    ];
    let harness = harness(Dataset {
        local: LOCAL,
        remote: REMOTE,
    })
    .await;

    let report = harness.run().await;

    assert!(report.is_clean());
    assert_eq!(report.transfers(), 0);
    assert_eq!(harness.remote().ops().transfers(), 0);
    // content is not compared
    assert_eq!(
        harness.local_content("notes.txt").as_deref(),
        Some("local notes")
    );
    assert_eq!(
        harness.remote().content("notes.txt").as_deref(),
        Some("remote notes")
    );
}

#[tokio::test]
async fn remote_tree_is_materialized() {
    let harness = harness(Dataset {
        local: &[],
        remote: dataset::mixed::REMOTE,
    })
    .await;

    let report = harness.run().await;

    assert!(report.is_clean());
    assert!(harness.local_is_dir("only-remote/deep"));
    assert_eq!(
        harness.local_content("only-remote/deep/file2.txt").as_deref(),
        Some("/only-remote/deep/file2.txt")
    );
    assert_eq!(report.downloaded, 9);
    assert_eq!(report.uploaded + report.updated + report.folders_created, 0);
    harness.assert_converged().await;
}

#[tokio::test]
async fn local_tree_is_uploaded() {
    let harness = harness(Dataset {
        local: dataset::mixed::LOCAL,
        remote: &[],
    })
    .await;

    let report = harness.run().await;

    assert!(report.is_clean());
    assert!(harness.remote().is_folder("only-local/deep"));
    assert_eq!(
        harness.remote().content("only-local/deep/file2.txt").as_deref(),
        Some("/only-local/deep/file2.txt")
    );
    assert_eq!(report.folders_created, 3);
    assert_eq!(report.uploaded, 9);
    assert_eq!(report.downloaded + report.updated, 0);
    harness.assert_converged().await;
}

#[tokio::test]
async fn mixed_dataset_converges() {
    let harness = harness(dataset::mixed()).await;

    let report = harness.run().await;

    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.updated, 2);
    assert_eq!(report.downloaded, 5);
    assert_eq!(report.uploaded, 4);
    assert_eq!(report.folders_created, 2);
    assert_eq!(report.dirs_visited, 6);

    assert_eq!(
        harness.local_content("newer-remote.txt").as_deref(),
        Some("/newer-remote.txt - remote")
    );
    assert_eq!(
        harness.remote().content("newer-local.txt").as_deref(),
        Some("/newer-local.txt - local")
    );
    assert_eq!(
        harness.remote().content("both/newer-local.txt").as_deref(),
        Some("/both/newer-local.txt - local")
    );
    harness.assert_converged().await;
}

#[tokio::test]
async fn second_run_is_idempotent() {
    let harness = harness(dataset::mixed()).await;

    let first = harness.run().await;
    assert!(first.is_clean());
    assert!(first.transfers() > 0);

    harness.remote().reset_ops();
    let second = harness.run().await;

    assert!(second.is_clean());
    assert_eq!(second.transfers(), 0);
    assert_eq!(harness.remote().ops().transfers(), 0);
    harness.assert_converged().await;
}

#[tokio::test]
async fn kind_mismatch_is_skipped() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[
        Entry::File{name: "x", content: "local file", mtime: 100},
        Entry::Dir{name: "y", mtime: 100, entries: &[
            Entry::File{name: "inside.txt", content: "/y/inside.txt", mtime: 0},
        ]},
    ];
    #[rustfmt::skip]
    const REMOTE: &[Entry] = &[
        Entry::Dir{name: "x", mtime: 200, entries: &[
            Entry::File{name: "inside.txt", content: "/x/inside.txt", mtime: 0},
        ]},
        Entry::File{name: "y", content: "remote file", mtime: 200},
        Entry::File{name: "z.txt", content: "/z.txt", mtime: 0},
    ];
    let harness = harness(Dataset {
        local: LOCAL,
        remote: REMOTE,
    })
    .await;

    let report = harness.run().await;

    assert_eq!(report.failures.len(), 2);
    assert!(matches!(
        &report.failures[0],
        SyncError::KindMismatch { path, mismatch: KindMismatch::LocalFileRemoteFolder } if path == "x"
    ));
    assert!(matches!(
        &report.failures[1],
        SyncError::KindMismatch { path, mismatch: KindMismatch::LocalFolderRemoteFile } if path == "y"
    ));
    assert!(!report.root_failed());

    // both sides untouched
    assert_eq!(harness.local_content("x").as_deref(), Some("local file"));
    assert!(harness.remote().is_folder("x"));
    assert!(harness.local_is_dir("y"));
    assert_eq!(harness.remote().content("y").as_deref(), Some("remote file"));

    // siblings still reconciled
    assert_eq!(report.transfers(), 1);
    assert_eq!(harness.local_content("z.txt").as_deref(), Some("/z.txt"));
}

#[tokio::test]
async fn transfer_failure_is_isolated() {
    let harness = harness(dataset::mixed()).await;
    harness.remote().fail_transfers_of("newer-remote.txt");

    let report = harness.run().await;

    assert_eq!(report.failures.len(), 1);
    match &report.failures[0] {
        SyncError::Transfer { path, op, .. } => {
            assert_eq!(path, "newer-remote.txt");
            assert_eq!(*op, TransferOp::Download);
        }
        err => panic!("unexpected failure: {err}"),
    }
    assert!(!report.root_failed());
    assert_eq!(
        harness.local_content("newer-remote.txt").as_deref(),
        Some("/newer-remote.txt - local")
    );

    // everything else went through
    assert_eq!(report.downloaded, 4);
    assert_eq!(report.uploaded, 4);
    assert_eq!(report.updated, 2);
    assert_eq!(
        harness.local_content("only-remote.txt").as_deref(),
        Some("/only-remote.txt")
    );
}

#[tokio::test]
async fn folder_creation_failure_skips_subtree() {
    let harness = harness(dataset::mixed()).await;
    harness.remote().fail_transfers_of("only-local");

    let report = harness.run().await;

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        SyncError::Transfer { path, op: TransferOp::CreateFolder, .. } if path == "only-local"
    ));
    assert!(harness.remote().find("only-local").is_none());
    // neither only-local/file1.txt nor only-local/deep/file2.txt
    assert_eq!(report.uploaded, 2);
    assert_eq!(report.folders_created, 0);
    assert_eq!(report.dirs_visited, 4);
    assert_eq!(
        harness.remote().content("both/only-local.txt").as_deref(),
        Some("/both/only-local.txt")
    );
}

#[tokio::test]
async fn listing_failure_is_isolated() {
    let harness = harness(dataset::mixed()).await;
    let only_remote = harness.remote().find("only-remote").unwrap();
    harness.remote().fail_listing_of(&only_remote);

    let report = harness.run().await;

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        SyncError::List { path, .. } if path == "only-remote"
    ));
    assert!(!report.root_failed());
    // the local directory is created before listing
    assert!(harness.local_is_dir("only-remote"));
    assert!(!harness.local_is_dir("only-remote/deep"));
    assert_eq!(harness.local_content("only-remote/file1.txt"), None);
    // only-remote/deep is never reached
    assert_eq!(report.dirs_visited, 5);
    assert_eq!(report.downloaded, 3);
    assert_eq!(
        harness.local_content("both/only-remote.txt").as_deref(),
        Some("/both/only-remote.txt")
    );
}

#[tokio::test]
async fn local_mkdir_failure_skips_subtree() {
    let harness = harness(dataset::mixed()).await;
    harness.local().fail_mkdir_of("only-remote");

    let report = harness.run().await;

    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        SyncError::Filesystem { path, .. } if path == "only-remote"
    ));
    assert!(!report.root_failed());
    assert!(!harness.local_is_dir("only-remote"));
    assert_eq!(report.downloaded, 3);
}

#[tokio::test]
async fn root_listing_failure_fails_the_run() {
    let harness = harness(dataset::mixed()).await;
    harness
        .remote()
        .fail_listing_of(&crate::stubs::drive::Stub::root_id());

    let report = harness.run().await;

    assert!(report.root_failed());
    assert_eq!(report.dirs_visited, 1);
    assert_eq!(report.transfers(), 0);
    assert_eq!(harness.remote().ops().transfers(), 0);
}

#[rustfmt::skip]
const OLD_LOCAL_A: &[Entry] = &[
    Entry::File{name: "a.txt", content: "local old", mtime: 100},
];
#[rustfmt::skip]
const NEW_REMOTE_A: &[Entry] = &[
    Entry::File{name: "a.txt", content: "remote good content", mtime: 200},
];

fn assert_download_failed(report: &gsync::Report, name: &str) {
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        SyncError::Transfer { path, op: TransferOp::Download, .. } if path == name
    ));
    assert!(!report.root_failed());
}

#[tokio::test]
async fn interrupted_download_keeps_local_file() {
    let harness = harness(Dataset {
        local: OLD_LOCAL_A,
        remote: NEW_REMOTE_A,
    })
    .await;
    harness.remote().break_next_read_of("a.txt");

    let report = harness.run().await;

    assert_download_failed(&report, "a.txt");
    assert_eq!(harness.local_content("a.txt").as_deref(), Some("local old"));
    assert_eq!(harness.local_mtime("a.txt"), Some(ts(T0 + 100)));
    assert!(!harness.local().root().join(".a.txt.gsync-part").exists());

    // the remote file is still newer, and is downloaded again
    let report = harness.run().await;

    assert!(report.is_clean());
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.transfers(), 1);
    assert_eq!(harness.remote().ops().updates, 0);
    assert_eq!(
        harness.local_content("a.txt").as_deref(),
        Some("remote good content")
    );
    assert_eq!(harness.local_mtime("a.txt"), Some(ts(T0 + 200)));
    assert_eq!(
        harness.remote().content("a.txt").as_deref(),
        Some("remote good content")
    );
}

#[tokio::test]
async fn interrupted_download_of_new_file_leaves_nothing() {
    let harness = harness(Dataset {
        local: &[],
        remote: NEW_REMOTE_A,
    })
    .await;
    harness.remote().break_next_read_of("a.txt");

    let report = harness.run().await;

    assert_download_failed(&report, "a.txt");
    assert!(harness.local_snapshot("").await.is_empty());
    assert!(!harness.local().root().join(".a.txt.gsync-part").exists());

    let report = harness.run().await;

    assert!(report.is_clean());
    assert_eq!(report.uploaded, 0);
    assert_eq!(
        harness.local_content("a.txt").as_deref(),
        Some("remote good content")
    );
}

#[tokio::test]
async fn failed_mtime_query_keeps_local_file() {
    let harness = harness(Dataset {
        local: OLD_LOCAL_A,
        remote: NEW_REMOTE_A,
    })
    .await;
    harness.remote().fail_mtime_of("a.txt");

    for _ in 0..2 {
        let report = harness.run().await;

        assert_download_failed(&report, "a.txt");
        assert_eq!(harness.local_content("a.txt").as_deref(), Some("local old"));
        assert_eq!(harness.local_mtime("a.txt"), Some(ts(T0 + 100)));
        assert!(!harness.local().root().join(".a.txt.gsync-part").exists());
    }
    assert_eq!(harness.remote().ops().updates, 0);
    assert_eq!(
        harness.remote().content("a.txt").as_deref(),
        Some("remote good content")
    );
}

