use std::process::ExitCode;

use clap::Parser;
use gsync::{
    loc::inst,
    path::FsPathBuf,
    Config, ProviderConfig, RemoteId, Report,
};
use gsynctl::{
    oauth2,
    storage::{fs::FileSystem, gdrive::GoogleDrive},
    PersistCache, Reconciler,
};

mod logger;

/// Two-way synchronization of a local folder with a Google Drive folder
#[derive(Parser)]
#[command(name = "gsynctl")]
#[command(author, version, about, long_about=None)]
struct Cli {
    /// Name of the instance.
    /// Selects the configuration and the token cache to use.
    #[arg(default_value = "default")]
    instance: String,

    /// Path to the configuration file.
    /// Defaults to config.json in the instance configuration directory.
    #[arg(long)]
    config: Option<FsPathBuf>,

    /// Local folder to synchronize, instead of the configured one
    #[arg(long)]
    local_dir: Option<FsPathBuf>,

    /// Id of the Drive folder to synchronize, instead of the configured one
    #[arg(long)]
    folder_id: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build();
    match runtime {
        Ok(runtime) => runtime.block_on(main_async(cli)),
        Err(err) => {
            eprintln!("Error: could not start the runtime: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn main_async(cli: Cli) -> ExitCode {
    let config = match load_config(&cli).await {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = logger::init(config.log_file.as_deref()) {
        eprintln!("Error: could not initialize logging: {err:#}");
        return ExitCode::FAILURE;
    }
    log::trace!("Loaded config: {config:?}");

    match run(&cli, config).await {
        Ok(report) if report.root_failed() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config_file = match &cli.config {
        Some(path) => path.clone(),
        None => inst::config_file(&cli.instance)?,
    };
    if !config_file.exists() {
        anyhow::bail!("No such config file: {config_file}");
    }

    let mut config = Config::load_from_file(&config_file).await?;
    if let Some(local_dir) = &cli.local_dir {
        config.local_dir = local_dir.clone();
    }
    if let Some(folder_id) = &cli.folder_id {
        let ProviderConfig::GoogleDrive(drive) = &mut config.provider;
        drive.folder_id = RemoteId::from(folder_id.as_str());
    }
    config.check()?;

    if !config.local_dir.is_dir() {
        anyhow::bail!("Create the local folder '{}' first", config.local_dir);
    }
    Ok(config)
}

async fn run(cli: &Cli, config: Config) -> anyhow::Result<Report> {
    log::info!("Starting synchronization...");

    let local = FileSystem::new(&config.local_dir)?;

    let ProviderConfig::GoogleDrive(drive) = &config.provider;
    let secret = match &drive.secret {
        Some(secret) => secret.clone(),
        None => {
            let path = inst::oauth_secret_file(&cli.instance)?;
            gsync::oauth2::load_google_secret(&path).await?
        }
    };
    log::info!(
        "Initializing Google Drive storage with client-id {}",
        secret.client_id.as_str()
    );

    let token_cache_path = inst::token_cache_file(&cli.instance)?;
    let client = reqwest::Client::builder().build()?;
    let auth = oauth2::Client::new(
        secret,
        oauth2::TokenPersist::MemoryAndDisk(token_cache_path),
        Some(client.clone()),
    )
    .await?;
    let remote = GoogleDrive::new(auth, client).await?;

    let reconciler = Reconciler::new(local, remote);
    let report = tokio::select! {
        res = sync(&reconciler, &drive.folder_id) => Some(res),
        _ = shutdown_signal() => None,
    };

    if let Err(err) = reconciler.remote().persist_cache().await {
        log::error!("Could not save the token cache: {err:#}");
    }

    let report = match report {
        None => anyhow::bail!("Synchronization interrupted"),
        Some(report) => report?,
    };
    for failure in report.failures.iter() {
        log::warn!("{failure}");
    }
    log::info!("Synchronization finalized: {report}");
    Ok(report)
}

async fn sync<A>(
    reconciler: &Reconciler<FileSystem, GoogleDrive<A>>,
    folder_id: &RemoteId,
) -> anyhow::Result<Report>
where
    A: oauth2::GetToken,
{
    let name = reconciler.remote().folder_name(folder_id).await?;
    log::info!(
        "Synchronizing {} with Drive folder '{name}' ({folder_id})",
        reconciler.local().root()
    );
    Ok(reconciler.run(folder_id.clone()).await)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        if let Ok(mut sig_term) = signal(SignalKind::terminate()) {
            tokio::select! {
                _ = sig_term.recv() => {
                    log::warn!("received SIGTERM");
                }
                _ = tokio::signal::ctrl_c() => {
                    log::warn!("received SIGINT");
                }
            };
            return;
        }
    }
    let _ = tokio::signal::ctrl_c().await;
    log::warn!("received Ctrl-C");
}
