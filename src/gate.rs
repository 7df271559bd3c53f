//! Active-package gate
//!
//! Nothing the engine does for a package happens unless that package's
//! active flag is set. Absent keys read as inactive.

use crate::constants::prefs as keys;
use crate::prefs::Preferences;

pub fn is_active<P: Preferences + ?Sized>(prefs: &P, package: &str) -> bool {
    prefs.get_bool(&keys::key(package, keys::ACTIVE), false)
}

/// Active and the given sub-feature flag is set too
pub fn is_active_for<P: Preferences + ?Sized>(prefs: &P, package: &str, feature: &str) -> bool {
    is_active(prefs, package) && prefs.get_bool(&keys::key(package, feature), false)
}
