use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    oauth2::Secret,
    path::{FsPath, FsPathBuf},
    RemoteId,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Root of the local tree. Must be absolute.
    pub local_dir: FsPathBuf,
    pub provider: ProviderConfig,
    /// Log lines are appended to this file in addition to the console
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<FsPathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderConfig {
    GoogleDrive(DriveConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveConfig {
    /// Id of the Drive folder synchronized with `local_dir`
    #[serde(default = "drive_root_id")]
    pub folder_id: RemoteId,
    /// OAuth2 application secret.
    /// If absent, it is read from the instance `client_secret.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<Secret>,
}

fn drive_root_id() -> RemoteId {
    RemoteId::from("root")
}

impl Config {
    pub async fn load_from_file(path: &FsPath) -> anyhow::Result<Self> {
        let config_json = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read config from {path}"))?;
        let config_json = std::str::from_utf8(&config_json)?;
        let config: Config = serde_json::from_str(config_json)
            .with_context(|| format!("Failed to parse config from {path}"))?;
        config.check()?;
        Ok(config)
    }

    pub fn check(&self) -> anyhow::Result<()> {
        if !self.local_dir.is_absolute() {
            anyhow::bail!(
                "localDir must be an absolute path, got '{}'",
                self.local_dir
            );
        }
        match &self.provider {
            ProviderConfig::GoogleDrive(drive) if drive.folder_id.is_empty() => {
                anyhow::bail!("folderId can't be empty")
            }
            _ => Ok(()),
        }
    }
}
