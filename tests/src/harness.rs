#![allow(dead_code)]

use std::fs;

use chrono::{DateTime, Utc};
use gsync::{path::FsPath, Report, Snapshot};
use gsynctl::{snapshot, Reconciler};

use crate::stubs;

pub struct Harness {
    pub reconciler: Reconciler<stubs::fs::Stub, stubs::drive::Stub>,
}

impl Harness {
    pub fn local(&self) -> &stubs::fs::Stub {
        self.reconciler.local()
    }

    pub fn remote(&self) -> &stubs::drive::Stub {
        self.reconciler.remote()
    }

    pub async fn run(&self) -> Report {
        self.reconciler.run(stubs::drive::Stub::root_id()).await
    }

    pub fn local_content(&self, path: &str) -> Option<String> {
        fs::read_to_string(self.local().root().join(path)).ok()
    }

    pub fn local_mtime(&self, path: &str) -> Option<DateTime<Utc>> {
        let md = fs::metadata(self.local().root().join(path)).ok()?;
        Some(md.modified().ok()?.into())
    }

    pub fn local_is_dir(&self, path: &str) -> bool {
        self.local().root().join(path).is_dir()
    }

    pub async fn local_snapshot(&self, path: &str) -> Snapshot {
        snapshot::local(self.local(), FsPath::new(path))
            .await
            .expect("Should list local directory")
    }

    /// Checks that both trees hold the same names at every level,
    /// with the same content and mtime for files.
    pub async fn assert_converged(&self) {
        let mut dirs = vec![String::new()];
        while let Some(path) = dirs.pop() {
            let local = self.local_snapshot(&path).await;
            let remote = self.remote().entries(&path);
            let local_names: Vec<&str> = local.iter().map(|e| e.name()).collect();
            let remote_names: Vec<&str> = remote.iter().map(|e| e.name()).collect();
            assert_eq!(local_names, remote_names, "names differ in '{path}'");

            for rem in remote.iter() {
                let loc = local.get(rem.name()).unwrap();
                let child = FsPath::new(&path).join(rem.name()).into_string();
                assert_eq!(loc.kind(), rem.kind(), "kinds differ for '{child}'");
                if rem.is_file() {
                    assert_eq!(loc.mtime(), rem.mtime(), "mtimes differ for '{child}'");
                    assert_eq!(
                        self.local_content(&child),
                        self.remote().content(&child),
                        "contents differ for '{child}'"
                    );
                } else {
                    dirs.push(child);
                }
            }
        }
    }
}
