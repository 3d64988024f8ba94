use std::{
    fs,
    io::{self, Write},
};

use gsync::path::FsPath;

/// Installs the global logger.
///
/// Logs go to the systemd journal when stderr is connected to it.
/// Otherwise they go to stderr through `env_logger`, at `info` level unless `RUST_LOG` says otherwise,
/// and are also appended to `log_file` if there is one.
pub fn init(log_file: Option<&FsPath>) -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use systemd_journal_logger::{connected_to_journal, JournalLog};

        if connected_to_journal() {
            JournalLog::new()?
                .with_extra_fields(vec![("VERSION", env!("CARGO_PKG_VERSION"))])
                .install()?;
            log::set_max_level(log::LevelFilter::Info);
            return Ok(());
        }
    }

    let env = env_logger::Env::default().default_filter_or("info");
    let mut builder = env_logger::Builder::from_env(env);
    if let Some(path) = log_file {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(Tee {
            file,
            stderr: io::stderr(),
        })));
    }
    builder.try_init()?;
    Ok(())
}

/// Writes every log line to stderr and to a file
struct Tee {
    file: fs::File,
    stderr: io::Stderr,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stderr.write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stderr.flush()?;
        self.file.flush()
    }
}
