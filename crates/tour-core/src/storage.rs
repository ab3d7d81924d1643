//! Ports between the engine and its host.
//!
//! Inside a browser the engine talks to `localStorage`, `sessionStorage`,
//! `window` and `document`. Here those become three traits so the engine runs
//! headless: [`Storage`] for string key-value stores, [`HostPage`] for the
//! current page, and [`Clock`] for wall time.

use crate::error::{Result, TourError};
use crate::io;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// A string-keyed store with web-storage semantics.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store. An optional byte quota makes writes fail the way a full
/// browser store does.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total size of keys plus values, in bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| TourError::Storage("memory store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| TourError::Storage("memory store lock poisoned".to_string()))?;
        if let Some(limit) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(TourError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| TourError::Storage("memory store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// A store that refuses every operation, like web storage in a locked-down
/// private window.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStorage;

impl Storage for UnavailableStorage {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(TourError::StorageUnavailable)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(TourError::StorageUnavailable)
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Err(TourError::StorageUnavailable)
    }
}

/// A store persisted as one JSON object on disk.
///
/// Every call re-reads the file so two processes sharing it behave like two
/// tabs sharing `localStorage`: no locking, last write wins.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the backing file, dropping every key at once.
    pub fn wipe(&self) -> Result<bool> {
        io::remove_if_exists(&self.path)
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        match io::read_if_exists(&self.path)? {
            Some(data) if !data.trim().is_empty() => Ok(serde_json::from_str(&data)?),
            _ => Ok(BTreeMap::new()),
        }
    }

    /// Like [`load`](Self::load), but an unparsable file reads as empty so
    /// the write that follows replaces it.
    fn load_for_write(&self) -> Result<BTreeMap<String, String>> {
        match self.load() {
            Err(TourError::Json(e)) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "store file corrupt, starting over"
                );
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let data = serde_json::to_string_pretty(entries)?;
        io::atomic_write(&self.path, data.as_bytes())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load_for_write()?;
        entries.insert(key.to_string(), value.to_string());
        self.store(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.load_for_write()?;
        if entries.remove(key).is_some() {
            self.store(&entries)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HostPage
// ---------------------------------------------------------------------------

/// The page the engine is embedded in.
pub trait HostPage: Send + Sync {
    fn url(&self) -> String;
    fn viewport_width(&self) -> u32;
    /// Whether an element matching `selector` exists. Errors on a selector the
    /// page cannot parse.
    fn query_selector(&self, selector: &str) -> Result<bool>;
}

/// A fixed page snapshot: URL, viewport width and the selectors that resolve.
#[derive(Debug, Clone, Default)]
pub struct StaticPage {
    pub url: String,
    pub width: u32,
    pub present: HashSet<String>,
}

impl StaticPage {
    pub fn new(url: impl Into<String>, width: u32) -> Self {
        Self {
            url: url.into(),
            width,
            present: HashSet::new(),
        }
    }

    pub fn with_element(mut self, selector: impl Into<String>) -> Self {
        self.present.insert(selector.into());
        self
    }
}

impl HostPage for StaticPage {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn viewport_width(&self) -> u32 {
        self.width
    }

    fn query_selector(&self, selector: &str) -> Result<bool> {
        check_selector_syntax(selector)?;
        Ok(self.present.contains(selector.trim()))
    }
}

/// Reject the selector mistakes `document.querySelector` throws on most
/// often: empty input, unbalanced brackets or parentheses, open quotes.
pub fn check_selector_syntax(selector: &str) -> Result<()> {
    let invalid = || TourError::InvalidSelector(selector.to_string());
    if selector.trim().is_empty() {
        return Err(invalid());
    }
    let mut brackets = 0i32;
    let mut parens = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in selector.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => brackets += 1,
            (None, ']') => brackets -= 1,
            (None, '(') => parens += 1,
            (None, ')') => parens -= 1,
            _ => {}
        }
        if brackets < 0 || parens < 0 {
            return Err(invalid());
        }
    }
    if quote.is_some() || brackets != 0 || parens != 0 || escaped {
        return Err(invalid());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Wall time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
