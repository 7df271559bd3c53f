//! JSON-file backed preference store
//!
//! Flat JSON object mapping full keys (`<package><suffix>`) to booleans,
//! integers or strings. Reads go through an `Arc` snapshot so a reload
//! only blocks readers for the pointer swap.

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use super::Preferences;

type Snapshot = Map<String, Value>;

#[derive(Debug)]
pub struct JsonPreferences {
    /// None for in-memory stores (reload is a no-op)
    path: Option<PathBuf>,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl JsonPreferences {
    /// Open a preference file. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = Self::read_file(&path)?;
        info!(path = %path.display(), keys = snapshot.len(), "Loaded preferences");
        Ok(Self {
            path: Some(path),
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Build an in-memory store from a JSON object
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            bail!("Preferences must be a JSON object");
        };
        Ok(Self {
            path: None,
            snapshot: RwLock::new(Arc::new(map)),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_file(path: &Path) -> Result<Snapshot> {
        if !path.exists() {
            info!(path = %path.display(), "Preference file not found, using empty store");
            return Ok(Snapshot::new());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read preferences from {}", path.display()))?;
        let value: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;

        match value {
            Value::Object(map) => Ok(map),
            other => bail!(
                "Preferences in {} must be a JSON object, found {}",
                path.display(),
                type_name(&other)
            ),
        }
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        // A poisoned lock still holds a complete snapshot
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.snapshot().get(key).cloned()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Preferences for JsonPreferences {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => b,
            Some(other) => {
                debug!(
                    key,
                    found = type_name(&other),
                    "Preference is not a boolean, using default"
                );
                default
            }
            None => default,
        }
    }

    fn get_int(&self, key: &str, default: i32) -> i32 {
        match self.get(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .unwrap_or_else(|| {
                    debug!(key, value = %n, "Preference is not a 32-bit integer, using default");
                    default
                }),
            Some(other) => {
                debug!(
                    key,
                    found = type_name(&other),
                    "Preference is not an integer, using default"
                );
                default
            }
            None => default,
        }
    }

    fn get_string(&self, key: &str, default: Option<&str>) -> Option<String> {
        match self.get(key) {
            Some(Value::String(s)) => Some(s),
            _ => default.map(str::to_string),
        }
    }

    fn reload(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        // Parse before taking the write lock; a broken file keeps the old snapshot
        let fresh = Self::read_file(path).inspect_err(|e| {
            warn!(
                path = %path.display(),
                error = ?e,
                "Preference reload failed, keeping previous values"
            )
        })?;

        let mut guard = match self.snapshot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(fresh);
        debug!(path = %path.display(), keys = guard.len(), "Reloaded preferences");
        Ok(())
    }
}
