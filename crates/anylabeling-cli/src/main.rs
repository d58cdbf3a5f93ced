mod cli;
mod logging;
mod restart;

use std::sync::Arc;

use anyhow::{Context, Result};
use anylabeling_config::ConfigLoader;
use anylabeling_gateway::{GatewayServer, ModelCatalog, ServeExit};
use tracing::{info, warn};

use crate::cli::Cli;

fn main() -> Result<()> {
    // Argument errors and --version exit here, before any file is read.
    let cli = Cli::parse_args();

    let loader = ConfigLoader::new();
    let loaded = loader
        .load()
        .with_context(|| format!("failed to load {}", loader.config_path().display()))?;
    let settings = loaded.settings;

    let log_guard = logging::init(&settings.logging)?;
    loaded.report.log();
    for warning in settings.security_warnings() {
        warn!("{warning}");
    }

    let bind = cli.resolve(&settings);
    let settings = anylabeling_config::global::install(settings)?;

    let models = Arc::new(ModelCatalog::new());
    let server =
        GatewayServer::new(settings, bind, models).watch_config(loader.config_path());

    let runtime = server.bind_options().build_runtime()?;
    let exit = runtime.block_on(server.run())?;
    drop(runtime);

    if exit == ServeExit::Reload {
        info!("restarting to pick up configuration changes");
        drop(log_guard);
        restart::restart_process()?;
    }

    Ok(())
}
