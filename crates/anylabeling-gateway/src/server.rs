use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anylabeling_common::{Error, Result};
use anylabeling_config::Settings;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::models::ModelRegistry;
use crate::reload::ConfigWatcher;
use crate::router::build_router;
use crate::state::AppState;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Final listener parameters after command-line overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOptions {
    pub host: String,
    pub port: u16,
    pub workers: u32,
    pub reload: bool,
}

impl BindOptions {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Worker threads actually used. Auto-reload always serves with one.
    pub fn effective_workers(&self) -> u32 {
        if self.reload { 1 } else { self.workers }
    }

    /// Warning for a topology that cannot be honoured as requested.
    pub fn topology_warning(&self) -> Option<String> {
        (self.reload && self.workers > 1).then(|| {
            format!(
                "--reload is meant for single-worker development; ignoring workers={} and serving with 1",
                self.workers
            )
        })
    }

    /// Build the runtime whose worker threads share the listening socket.
    pub fn build_runtime(&self) -> Result<tokio::runtime::Runtime> {
        if let Some(warning) = self.topology_warning() {
            warn!("{warning}");
        }
        let workers = self.effective_workers() as usize;
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name("anylabeling-worker")
            .enable_all()
            .build()
            .map_err(Error::from)
    }
}

/// Why the server stopped serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeExit {
    /// Interrupted by the operator.
    Shutdown,
    /// The configuration file changed while auto-reload was enabled.
    Reload,
}

/// Binds the listener and serves the router until shutdown.
pub struct GatewayServer {
    settings: Arc<Settings>,
    bind: BindOptions,
    registry: Arc<dyn ModelRegistry>,
    config_path: Option<PathBuf>,
}

impl GatewayServer {
    pub fn new(settings: Arc<Settings>, bind: BindOptions, registry: Arc<dyn ModelRegistry>) -> Self {
        Self {
            settings,
            bind,
            registry,
            config_path: None,
        }
    }

    /// Configuration file to watch when auto-reload is enabled.
    pub fn watch_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn bind_options(&self) -> &BindOptions {
        &self.bind
    }

    pub async fn run(self) -> Result<ServeExit> {
        let addr = self.bind.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Gateway(format!("failed to bind {addr}: {e}")))?;

        println!("Starting X-AnyLabeling Server v{VERSION}");
        println!("Server: http://{addr}");

        let watcher = match (&self.config_path, self.bind.reload) {
            (Some(path), true) => ConfigWatcher::spawn(path)?,
            _ => None,
        };

        self.serve(listener, wait_for_exit(watcher)).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<ServeExit>
    where
        F: Future<Output = ServeExit> + Send + 'static,
    {
        let local = listener.local_addr()?;
        let state = Arc::new(AppState::new(self.settings, self.registry));
        let app = build_router(state);

        let (exit_tx, exit_rx) = tokio::sync::oneshot::channel();
        let signal = async move {
            let exit = shutdown.await;
            let _ = exit_tx.send(exit);
        };

        info!(
            "X-AnyLabeling server listening on {local} (workers={}, reload={})",
            self.bind.effective_workers(),
            self.bind.reload
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| Error::Gateway(format!("server error: {e}")))?;

        let exit = exit_rx.await.unwrap_or(ServeExit::Shutdown);
        info!("server stopped ({exit:?})");
        Ok(exit)
    }
}

async fn wait_for_exit(watcher: Option<ConfigWatcher>) -> ServeExit {
    let reload = async move {
        match watcher {
            Some(mut watcher) => watcher.changed().await,
            None => std::future::pending::<()>().await,
        }
    };

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = interrupt => ServeExit::Shutdown,
        () = reload => {
            info!("configuration changed, restarting");
            ServeExit::Reload
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(workers: u32, reload: bool) -> BindOptions {
        BindOptions {
            host: "127.0.0.1".into(),
            port: 8000,
            workers,
            reload,
        }
    }

    #[test]
    fn reload_with_many_workers_warns_and_uses_one() {
        let options = bind(4, true);
        assert!(options.topology_warning().is_some());
        assert_eq!(options.effective_workers(), 1);
    }

    #[test]
    fn multiple_workers_without_reload_are_kept() {
        let options = bind(4, false);
        assert!(options.topology_warning().is_none());
        assert_eq!(options.effective_workers(), 4);
        assert_eq!(options.address(), "127.0.0.1:8000");
    }

    #[test]
    fn single_worker_reload_is_quiet() {
        assert!(bind(1, true).topology_warning().is_none());
    }

    #[test]
    fn runtime_is_built_for_the_requested_topology() {
        let runtime = bind(2, false).build_runtime().expect("runtime");
        let value = runtime.block_on(async { 21 * 2 });
        assert_eq!(value, 42);
    }
}
