//! Logging setup driven by the `logging` section of the configuration.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use anylabeling_config::{LogFormat, LoggingConfig, Rotation};
use chrono::Utc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the background file writer alive. Dropping it flushes pending lines.
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber: a console layer on stderr at
/// `console_level` (or `RUST_LOG` when set) and, if enabled, a file layer at
/// `level`.
pub fn init(config: &LoggingConfig) -> Result<LogGuard> {
    let (file_layer, guard) = if config.file_enabled {
        let (layer, guard) = file_layer(config)?;
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level.as_directive()));
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(LogGuard { _file: guard })
}

fn file_layer(config: &LoggingConfig) -> Result<(BoxedLayer, WorkerGuard)> {
    let path = config.log_file();
    let rotation = config.rotation_policy()?;
    let retention = config.retention_period()?;

    prune_rotated(&path, retention);
    let writer = open_log_writer(&path, rotation, retention)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(writer);

    let filter = EnvFilter::new(config.level.as_directive());
    let layer: BoxedLayer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    };
    Ok((layer, guard))
}

fn open_log_writer(
    path: &Path,
    rotation: Rotation,
    retention: Duration,
) -> io::Result<Box<dyn Write + Send>> {
    let (dir, name) = split_log_path(path)?;
    fs::create_dir_all(&dir)?;

    let writer: Box<dyn Write + Send> = match rotation {
        Rotation::Size(max_bytes) => Box::new(SizeRotatingFile::open(path, max_bytes, retention)?),
        Rotation::Daily => Box::new(rolling::daily(dir, name)),
        Rotation::Hourly => Box::new(rolling::hourly(dir, name)),
        Rotation::Never => Box::new(rolling::never(dir, name)),
    };
    Ok(writer)
}

fn split_log_path(path: &Path) -> io::Result<(PathBuf, String)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "log path has no file name"))?
        .to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, name))
}

/// A log file that is renamed to `<name>.<timestamp>` once the next write
/// would take it past `max_bytes`.
pub struct SizeRotatingFile {
    path: PathBuf,
    max_bytes: u64,
    retention: Duration,
    file: File,
    written: u64,
}

impl SizeRotatingFile {
    pub fn open(path: &Path, max_bytes: u64, retention: Duration) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            max_bytes,
            retention,
            file,
            written,
        })
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let (_, name) = split_log_path(&self.path)?;
        let stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S_%6f");
        let rotated = self.path.with_file_name(format!("{name}.{stamp}"));
        fs::rename(&self.path, &rotated)?;

        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.written = 0;
        prune_rotated(&self.path, self.retention);
        Ok(())
    }
}

impl Write for SizeRotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Delete rotated siblings of `path` (`<name>.*`) last modified longer ago
/// than `retention`. Failures are ignored; the next rotation tries again.
pub fn prune_rotated(path: &Path, retention: Duration) {
    let Ok((dir, name)) = split_log_path(path) else {
        return;
    };
    let Ok(entries) = fs::read_dir(&dir) else {
        return;
    };
    let prefix = format!("{name}.");
    let Some(cutoff) = SystemTime::now().checked_sub(retention) else {
        return;
    };

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if !file_name.starts_with(&prefix) {
            continue;
        }
        let expired = entry
            .metadata()
            .and_then(|m| m.modified())
            .map(|modified| modified < cutoff)
            .unwrap_or(false);
        if expired {
            let _ = fs::remove_file(entry.path());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(86_400);

    fn rotated_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .flatten()
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .filter(|n| n.starts_with("server.log."))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn size_rotation_moves_full_file_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.log");
        let mut file = SizeRotatingFile::open(&path, 64, DAY).unwrap();

        let line = [b'x'; 39];
        file.write_all(&line).unwrap();
        file.write_all(b"\n").unwrap();
        assert!(rotated_files(dir.path()).is_empty());

        file.write_all(&line).unwrap();
        file.flush().unwrap();

        assert_eq!(rotated_files(dir.path()).len(), 1);
        assert_eq!(fs::metadata(&path).unwrap().len(), 39);
    }

    #[test]
    fn oversized_write_to_empty_file_is_not_split() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.log");
        let mut file = SizeRotatingFile::open(&path, 8, DAY).unwrap();

        file.write_all(b"a line longer than eight bytes").unwrap();
        file.flush().unwrap();

        assert!(rotated_files(dir.path()).is_empty());
        assert_eq!(fs::metadata(&path).unwrap().len(), 30);
    }

    #[test]
    fn reopening_counts_existing_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.log");
        fs::write(&path, [b'y'; 60]).unwrap();

        let mut file = SizeRotatingFile::open(&path, 64, DAY).unwrap();
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();

        assert_eq!(rotated_files(dir.path()).len(), 1);
        assert_eq!(fs::metadata(&path).unwrap().len(), 10);
    }

    #[test]
    fn prune_removes_only_expired_rotated_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("server.log");
        fs::write(&path, "active").unwrap();

        let old = dir.path().join("server.log.2020-01-01_00-00-00_000000");
        let fresh = dir.path().join("server.log.2099-01-01_00-00-00_000000");
        let unrelated = dir.path().join("other.log.2020-01-01");
        for p in [&old, &fresh, &unrelated] {
            fs::write(p, "x").unwrap();
        }
        let three_days_ago = SystemTime::now() - 3 * DAY;
        for p in [&old, &unrelated] {
            File::options()
                .write(true)
                .open(p)
                .unwrap()
                .set_modified(three_days_ago)
                .unwrap();
        }

        prune_rotated(&path, DAY);

        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(unrelated.exists());
        assert!(path.exists());
    }

    #[test]
    fn writer_creates_missing_log_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("logs").join("server.log");

        let mut writer = open_log_writer(&path, Rotation::Size(1024), DAY).unwrap();
        writer.write_all(b"hello\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }
}
