pub mod check;
pub mod config;
pub mod context;
pub mod session;
pub mod state;
pub mod theme;

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tour_core::config::EngineConfig;
use tour_core::paths;
use tour_core::storage::{FileStorage, StaticPage, SystemClock};
use tour_core::{Ports, TourEngine};

/// Build an engine over the project's `.tour/` files for the given page.
pub fn open_engine(root: &Path, page: StaticPage) -> anyhow::Result<TourEngine> {
    let config = EngineConfig::load_from_root(root).context("failed to load config")?;
    config.ensure_valid()?;
    let ports = Ports {
        local: Arc::new(FileStorage::new(paths::local_store_path(root))),
        session: Arc::new(FileStorage::new(paths::session_store_path(root))),
        page: Arc::new(page),
        clock: Arc::new(SystemClock),
    };
    Ok(TourEngine::new(ports, config))
}
