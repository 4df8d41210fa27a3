use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use gallery::Collaborators;
use siteconfig::{SiteConfig, StoreBackend};
use store::{FileStore, MemoryStore};
use tracing::{debug, warn};

use crate::paths::AppPaths;

/// Everything a command needs before it does its own work.
pub struct AppContext {
    pub paths: AppPaths,
    pub config: SiteConfig,
    pub stores: Collaborators,
}

pub fn bootstrap(config_override: Option<&Path>) -> Result<AppContext> {
    let paths = AppPaths::discover()?;
    paths.ensure_directories()?;

    let config_path = config_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| paths.config_file());
    let config = SiteConfig::load_or_default(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path.display()))?;
    debug!(
        path = %config_path.display(),
        exists = config_path.exists(),
        "resolved configuration"
    );

    let stores = open_stores(&paths, &config)?;
    Ok(AppContext {
        paths,
        config,
        stores,
    })
}

fn open_stores(paths: &AppPaths, config: &SiteConfig) -> Result<Collaborators> {
    match config.store.backend {
        StoreBackend::File => {
            let root = config
                .store
                .data_dir
                .clone()
                .unwrap_or_else(|| paths.store_dir());
            let store = FileStore::open(&root)
                .with_context(|| format!("failed to open store at {}", root.display()))?;
            Ok(Collaborators::from_store(Arc::new(store)))
        }
        StoreBackend::Memory => {
            warn!("using the in-memory store; changes are lost on exit");
            Ok(Collaborators::from_store(Arc::new(MemoryStore::new())))
        }
    }
}

/// Root for `assets/projects/{id}.png` covers.
pub fn asset_root(paths: &AppPaths, config: &SiteConfig) -> PathBuf {
    config
        .gallery
        .asset_root
        .clone()
        .unwrap_or_else(|| paths.asset_root())
}
