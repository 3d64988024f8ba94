use chrono::{DateTime, Utc};
use gsync::path::{FsPath, FsPathBuf};
use oauth2::{AccessToken, RefreshToken, Scope, TokenResponse, TokenType};
use serde::{Deserialize, Serialize};

use crate::PersistCache;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenEntry {
    scopes_hash: u64,
    scopes: Vec<Scope>,
    access_token: AccessToken,
    refresh_token: Option<RefreshToken>,
    expiration: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub enum CacheResult {
    None,
    Expired(RefreshToken, Vec<Scope>),
    Ok(AccessToken),
}

#[derive(Debug, Default)]
pub struct TokenStore {
    entries: Vec<TokenEntry>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts to read the cache from disk.
    /// Returns `Ok(None)` if the path doesn't exist.
    async fn try_read_from_disk(path: &FsPath) -> anyhow::Result<Option<Self>> {
        let json = match tokio::fs::read_to_string(path).await {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        log::debug!("reading cached tokens from {path}");
        let entries = serde_json::from_str(&json)?;
        Ok(Some(TokenStore { entries }))
    }

    async fn write_to_disk(&self, path: &FsPath) -> anyhow::Result<()> {
        log::debug!("caching tokens to {path}");
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub fn insert<T, TT>(&mut self, tok: &T, requested: &[Scope])
    where
        T: TokenResponse<TT>,
        TT: TokenType,
    {
        // the token endpoint may omit the scopes when they are the requested ones
        let mut scopes = tok
            .scopes()
            .cloned()
            .unwrap_or_else(|| requested.to_vec());
        scopes.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));
        log::trace!("inserting token for scopes {scopes:?}");

        let scopes_hash = {
            use std::hash::{Hash, Hasher};
            let mut state = std::collections::hash_map::DefaultHasher::new();
            scopes.hash(&mut state);
            state.finish()
        };
        let expiration = tok
            .expires_in()
            .and_then(|exp| chrono::Duration::from_std(exp).ok())
            .map(|exp| Utc::now() + exp);
        let entry = TokenEntry {
            scopes_hash,
            scopes,
            access_token: tok.access_token().clone(),
            refresh_token: tok.refresh_token().cloned(),
            expiration,
        };
        self.emplace_entry(entry);
    }

    fn emplace_entry(&mut self, token: TokenEntry) {
        for ent in self.entries.iter_mut() {
            if ent.scopes_hash == token.scopes_hash {
                // a refresh response usually carries no new refresh token
                let refresh_token = token.refresh_token.or(ent.refresh_token.take());
                *ent = TokenEntry {
                    refresh_token,
                    ..token
                };
                return;
            }
        }
        self.entries.push(token);
    }

    pub fn get(&self, scopes: &[Scope]) -> CacheResult {
        // stop at the first entry holding all the scopes
        for ent in self.entries.iter() {
            if !scopes.iter().all(|s| ent.scopes.contains(s)) {
                continue;
            }
            if let Some(expiration) = ent.expiration {
                if expiration < Utc::now() {
                    return match &ent.refresh_token {
                        Some(refresh_token) => {
                            CacheResult::Expired(refresh_token.clone(), ent.scopes.clone())
                        }
                        None => CacheResult::None,
                    };
                }
            }
            return CacheResult::Ok(ent.access_token.clone());
        }
        CacheResult::None
    }
}

/// Specifies how the cache should persist tokens
#[derive(Debug, Clone)]
pub enum TokenPersist {
    /// Persist in memory, but start from scratch
    /// each time the program starts
    Memory,
    /// Load from disk, when program starts.
    /// Persist in memory for the duration of the program.
    /// Saves to disk in PersistCache implementation.
    MemoryAndDisk(FsPathBuf),
}

impl TokenPersist {
    fn try_path(&self) -> Option<&FsPath> {
        match self {
            Self::MemoryAndDisk(path) => Some(path),
            Self::Memory => None,
        }
    }
}

#[derive(Debug)]
pub struct TokenCache {
    persist: TokenPersist,
    store: TokenStore,
}

impl TokenCache {
    pub async fn new(persist: TokenPersist) -> anyhow::Result<Self> {
        let store = if let Some(path) = persist.try_path() {
            TokenStore::try_read_from_disk(path).await?
        } else {
            None
        };
        let store = store.unwrap_or_default();
        Ok(TokenCache { persist, store })
    }

    pub fn put<T, TT>(&mut self, tok: &T, requested: &[Scope])
    where
        T: TokenResponse<TT>,
        TT: TokenType,
    {
        log::trace!(
            "Put token for scopes {:?}, expires in {:?}",
            tok.scopes(),
            tok.expires_in()
        );
        self.store.insert(tok, requested);
    }

    pub fn check(&self, scopes: &[Scope]) -> CacheResult {
        let res = self.store.get(scopes);

        if log::log_enabled!(log::Level::Trace) {
            let res = match &res {
                CacheResult::None => "None",
                CacheResult::Expired(..) => "Expired",
                CacheResult::Ok(..) => "Ok",
            };
            let scopes: Vec<&str> = scopes.iter().map(|s| s.as_str()).collect();
            log::trace!("check token for scopes {}: {res}", scopes.join(", "));
        }

        res
    }
}

impl PersistCache for TokenCache {
    async fn persist_cache(&self) -> anyhow::Result<()> {
        if let Some(path) = self.persist.try_path() {
            self.store.write_to_disk(path).await?;
        }
        Ok(())
    }
}
