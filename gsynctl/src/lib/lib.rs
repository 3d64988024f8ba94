use futures::{future, Future};

pub(crate) mod error;
pub mod oauth2;
pub mod reconcile;
pub mod snapshot;
pub mod storage;
pub mod transfer;

pub use crate::reconcile::Reconciler;

pub mod uri {
    use std::borrow::Cow;

    /// Decoded parameters of a URI query string
    #[derive(Debug)]
    pub struct QueryMap<'a>(Vec<(Cow<'a, str>, Cow<'a, str>)>);

    impl<'a> QueryMap<'a> {
        pub fn parse(query: Option<&'a str>) -> QueryMap<'a> {
            let vec = query
                .map(|q| url::form_urlencoded::parse(q.as_bytes()).collect())
                .unwrap_or_default();
            QueryMap(vec)
        }

        pub fn get(&self, key: &str) -> Option<&str> {
            self.0
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_ref())
        }
    }

}

/// Implemented by types that keep a cache worth saving before exit
pub trait PersistCache {
    fn persist_cache(&self) -> impl Future<Output = anyhow::Result<()>> + Send {
        future::ready(Ok(()))
    }
}
