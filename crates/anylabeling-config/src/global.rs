//! The process-wide settings slot. Written once at startup, read thereafter.

use std::sync::{Arc, OnceLock};

use anylabeling_common::{Error, Result};

use crate::model::Settings;

static CURRENT: OnceLock<Arc<Settings>> = OnceLock::new();

/// Publish the resolved settings for the rest of the process.
///
/// Fails if settings were already installed; the slot is never reassigned.
pub fn install(settings: Settings) -> Result<Arc<Settings>> {
    let settings = Arc::new(settings);
    CURRENT
        .set(Arc::clone(&settings))
        .map_err(|_| Error::Other("settings have already been installed".into()))?;
    Ok(settings)
}

/// The installed settings, if startup has published them.
pub fn current() -> Option<Arc<Settings>> {
    CURRENT.get().cloned()
}
