#![cfg(test)]

use std::sync::Once;

use gsynctl::Reconciler;

mod dataset;
mod harness;
mod utils;
mod stubs {
    pub mod drive;
    pub mod fs;
}
mod tests;

use dataset::Dataset;
use harness::Harness;

static LOG_INIT: Once = Once::new();

async fn harness<D: Into<Dataset>>(dataset: D) -> Harness {
    LOG_INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });

    let dataset = dataset.into();

    let local = stubs::fs::Stub::new().await.unwrap();
    dataset.create_local(local.root());

    let remote = stubs::drive::Stub::new(utils::ts(dataset::T0));
    dataset.create_remote(&remote);

    Harness {
        reconciler: Reconciler::new(local, remote),
    }
}
