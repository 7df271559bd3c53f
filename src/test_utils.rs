//! Shared test helpers

use anyhow::Result;
use serde_json::Value;
use std::sync::Mutex;

use crate::prefs::{JsonPreferences, Preferences};

/// In-memory preferences from a JSON object literal
pub fn prefs_from(value: Value) -> JsonPreferences {
    JsonPreferences::from_value(value).expect("test preferences must be a JSON object")
}

/// Preferences that remember every key read, in order
pub struct RecordingPreferences {
    inner: JsonPreferences,
    reads: Mutex<Vec<String>>,
}

impl RecordingPreferences {
    pub fn new(value: Value) -> Self {
        Self {
            inner: prefs_from(value),
            reads: Mutex::new(Vec::new()),
        }
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }

    fn record(&self, key: &str) {
        self.reads.lock().unwrap().push(key.to_string());
    }
}

impl Preferences for RecordingPreferences {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.record(key);
        self.inner.get_bool(key, default)
    }

    fn get_int(&self, key: &str, default: i32) -> i32 {
        self.record(key);
        self.inner.get_int(key, default)
    }

    fn get_string(&self, key: &str, default: Option<&str>) -> Option<String> {
        self.record(key);
        self.inner.get_string(key, default)
    }

    fn reload(&self) -> Result<()> {
        self.inner.reload()
    }
}
