//! Preference access
//!
//! The engine never owns its settings. It reads them through the
//! [`Preferences`] trait from whatever store the host provides; the
//! [`store::JsonPreferences`] implementation backs the CLI and tests.

use anyhow::Result;
use std::sync::Arc;

pub mod store;

pub use store::JsonPreferences;

/// Read access to a key/value preference store.
///
/// Implementations must allow concurrent reads from many threads while a
/// `reload` is in flight. A reader may observe the old or the new snapshot
/// for any single key; consistency across keys is not required.
pub trait Preferences: Send + Sync {
    fn get_bool(&self, key: &str, default: bool) -> bool;

    fn get_int(&self, key: &str, default: i32) -> i32;

    fn get_string(&self, key: &str, default: Option<&str>) -> Option<String>;

    /// Re-read the backing store
    fn reload(&self) -> Result<()>;
}

impl<P: Preferences + ?Sized> Preferences for Arc<P> {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        (**self).get_bool(key, default)
    }

    fn get_int(&self, key: &str, default: i32) -> i32 {
        (**self).get_int(key, default)
    }

    fn get_string(&self, key: &str, default: Option<&str>) -> Option<String> {
        (**self).get_string(key, default)
    }

    fn reload(&self) -> Result<()> {
        (**self).reload()
    }
}
