//! Snapshot persistence: the dashboard inputs survive restarts through an
//! injected key-value store. Missing or malformed fields fall back to the
//! defaults silently; the projection engine never touches storage.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

pub const SNAPSHOT_KEY: &str = "fire_dashboard_v1";

pub trait SnapshotStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), value.to_string());
                Ok(())
            }
            Err(_) => Err(io::Error::other("snapshot store lock poisoned")),
        }
    }
}

/// One JSON file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SnapshotStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub current_assets: f64,
    pub monthly_contribution: f64,
    pub target_assets: f64,
    pub annual_return_pct: f64,
    pub withdrawal_rate_pct: f64,
    pub safety_margin_pct: f64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            current_assets: 10_000_000.0,
            monthly_contribution: 1_500_000.0,
            target_assets: 825_000_000.0,
            annual_return_pct: 8.0,
            withdrawal_rate_pct: 4.0,
            safety_margin_pct: 10.0,
        }
    }
}

impl Snapshot {
    /// Field-by-field lenient read: anything that is not a JSON number keeps
    /// its default.
    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();
        let number = |name: &str, fallback: f64| -> f64 {
            value.get(name).and_then(Value::as_f64).unwrap_or(fallback)
        };

        Self {
            current_assets: number("currentAssets", defaults.current_assets),
            monthly_contribution: number("monthlyContribution", defaults.monthly_contribution),
            target_assets: number("targetAssets", defaults.target_assets),
            annual_return_pct: number("annualReturnPct", defaults.annual_return_pct),
            withdrawal_rate_pct: number("withdrawalRatePct", defaults.withdrawal_rate_pct),
            safety_margin_pct: number("safetyMarginPct", defaults.safety_margin_pct),
        }
    }

    pub fn load(store: &dyn SnapshotStore) -> Self {
        let Some(raw) = store.get(SNAPSHOT_KEY) else {
            return Self::default();
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => Self::from_value(&value),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, store: &dyn SnapshotStore) -> io::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        store.set(SNAPSHOT_KEY, &content)
    }
}
