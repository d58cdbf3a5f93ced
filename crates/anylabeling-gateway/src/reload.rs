use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anylabeling_common::{Error, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Watches the configuration file during development auto-reload.
///
/// The parent directory is watched rather than the file itself so that
/// editors which replace the file on save are still noticed.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<()>,
}

impl ConfigWatcher {
    /// Start watching `config_path`. Returns `None` when its directory does
    /// not exist, since there is nothing to watch until restart.
    pub fn spawn(config_path: &Path) -> Result<Option<Self>> {
        let dir = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() {
            warn!(
                "config directory {} does not exist, auto-reload will not watch it",
                dir.display()
            );
            return Ok(None);
        }

        let target: Option<OsString> = config_path.file_name().map(|n| n.to_os_string());
        let (tx, rx) = mpsc::channel(1);

        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    let relevant = event.kind.is_modify()
                        || event.kind.is_create()
                        || event.kind.is_remove();
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == target);
                    if relevant && ours {
                        // A pending notification already covers this change.
                        let _ = tx.try_send(());
                    }
                }
                Err(e) => error!("config watch error: {e}"),
            })
            .map_err(|e| Error::Gateway(format!("failed to start config watcher: {e}")))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| Error::Gateway(format!("failed to watch {}: {e}", dir.display())))?;

        Ok(Some(Self {
            _watcher: watcher,
            rx,
        }))
    }

    /// Resolve once the configuration file has changed.
    pub async fn changed(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}
