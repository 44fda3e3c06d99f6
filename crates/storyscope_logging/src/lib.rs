//! Logging setup shared by Storyscope binaries.
//!
//! Two sinks: a size-rotated file under `<home>/logs` that always receives
//! the configured filter, and stderr, which is quiet unless `verbose` is set.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "storyscope=info,storyscope_batch=info";
const MAX_LOG_FILES: usize = 5;
const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Logging options for one binary.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub log_dir: PathBuf,
    pub verbose: bool,
}

/// Install the global tracing subscriber.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    fs::create_dir_all(&config.log_dir).with_context(|| {
        format!(
            "Failed to create logs directory: {}",
            config.log_dir.display()
        )
    })?;
    let file_writer = RotatingWriter::new(&config.log_dir, config.app_name)
        .context("Failed to initialize rotating log writer")?;

    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let console_filter = if config.verbose {
        file_filter.clone()
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(())
}

/// Storyscope home: `$STORYSCOPE_HOME`, else `~/.storyscope`.
pub fn storyscope_home() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var("STORYSCOPE_HOME") {
        return Ok(PathBuf::from(override_path));
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".storyscope"))
}

/// `<home>/logs`
pub fn logs_dir(home: &Path) -> PathBuf {
    home.join("logs")
}

struct RotatingFile {
    dir: PathBuf,
    stem: String,
    keep: usize,
    limit: u64,
    file: Option<File>,
    written: u64,
}

impl RotatingFile {
    fn open(dir: &Path, stem: &str, keep: usize, limit: u64) -> io::Result<Self> {
        let mut rotating = Self {
            dir: dir.to_path_buf(),
            stem: sanitize_stem(stem),
            keep: keep.max(1),
            limit,
            file: None,
            written: 0,
        };
        rotating.reopen()?;
        if rotating.written > rotating.limit {
            rotating.roll()?;
        }
        Ok(rotating)
    }

    fn active_path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.stem))
    }

    fn archived_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.stem, n))
    }

    fn reopen(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.active_path())?;
        self.written = file.metadata()?.len();
        self.file = Some(file);
        Ok(())
    }

    /// Shift `.log.N` to `.log.N+1`, dropping the oldest, then start a fresh file.
    fn roll(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }

        let last = self.keep - 1;
        if last > 0 {
            let oldest = self.archived_path(last);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for n in (1..last).rev() {
                let from = self.archived_path(n);
                if from.exists() {
                    fs::rename(&from, self.archived_path(n + 1))?;
                }
            }
            let active = self.active_path();
            if active.exists() {
                fs::rename(active, self.archived_path(1))?;
            }
        }

        self.reopen()
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written + buf.len() as u64 > self.limit {
            self.roll()?;
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file unavailable"))?;
        let n = file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

#[derive(Clone)]
struct RotatingWriter {
    inner: Arc<Mutex<RotatingFile>>,
}

impl RotatingWriter {
    fn new(dir: &Path, app_name: &str) -> Result<Self> {
        let file = RotatingFile::open(dir, app_name, MAX_LOG_FILES, MAX_LOG_FILE_SIZE)
            .with_context(|| format!("Failed to open log file for {}", app_name))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(file)),
        })
    }
}

struct RotatingWriterGuard {
    inner: Arc<Mutex<RotatingFile>>,
}

impl RotatingWriterGuard {
    fn with_file<T>(&self, f: impl FnOnce(&mut RotatingFile) -> io::Result<T>) -> io::Result<T> {
        let mut file = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        f(&mut file)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for RotatingWriter {
    type Writer = RotatingWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingWriterGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for RotatingWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|file| file.flush())
    }
}

fn sanitize_stem(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
