use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const TOUR_DIR: &str = ".tour";

pub const CONFIG_FILE: &str = ".tour/config.yaml";
pub const LOCAL_STORE_FILE: &str = ".tour/local.json";
pub const SESSION_STORE_FILE: &str = ".tour/session.json";

pub const DEFAULT_KEY_PREFIX: &str = "at_tour";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn tour_dir(root: &Path) -> PathBuf {
    root.join(TOUR_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn local_store_path(root: &Path) -> PathBuf {
    root.join(LOCAL_STORE_FILE)
}

pub fn session_store_path(root: &Path) -> PathBuf {
    root.join(SESSION_STORE_FILE)
}

// ---------------------------------------------------------------------------
// Storage keys
// ---------------------------------------------------------------------------

/// Key names used inside the storage ports.
///
/// These must stay stable for a deployment: renaming the prefix orphans every
/// visitor's stored progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    prefix: String,
}

impl StorageKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Durable key holding the serialized map of every tour's state.
    pub fn states(&self) -> String {
        format!("{}_states", self.prefix)
    }

    /// Session key for the per-tour "seen this session" flag.
    pub fn seen(&self, tour_id: &str) -> String {
        format!("{}_seen_{}", self.prefix, tour_id)
    }

    pub fn first_visit(&self) -> String {
        format!("{}_first_visit", self.prefix)
    }

    pub fn visit_count(&self) -> String {
        format!("{}_visit_count", self.prefix)
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}
