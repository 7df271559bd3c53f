//! Override resolution
//!
//! Turns the flat preference keys of one package into an [`OverrideRecord`].
//! Density, screen class and font scale fall back to the default record
//! when the package has no positive value of its own. The extra-large flag
//! and the locale are read from the package only.

use serde::Serialize;
use std::ops::BitOr;
use tracing::trace;

use crate::constants::prefs as keys;
use crate::locale::Locale;
use crate::prefs::Preferences;
use crate::screen::{self, ScreenProfile};

/// Subset of override fields a caller cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMask(u8);

impl FieldMask {
    pub const DENSITY: Self = Self(1 << 0);
    pub const SCREEN: Self = Self(1 << 1);
    pub const FONT_SCALE: Self = Self(1 << 2);
    pub const XLARGE: Self = Self(1 << 3);
    pub const LOCALE: Self = Self(1 << 4);

    /// Fields that follow the executing process (rendering metrics)
    pub const DISPLAY: Self =
        Self(Self::DENSITY.0 | Self::SCREEN.0 | Self::FONT_SCALE.0 | Self::XLARGE.0);
    pub const ALL: Self = Self(Self::DISPLAY.0 | Self::LOCALE.0);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FieldMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Effective overrides for one package, computed on demand
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverrideRecord {
    pub density_dpi: Option<i32>,
    /// Index into the screen profile table; None when the profile leaves
    /// the screen untouched
    pub screen_class: Option<usize>,
    pub font_scale_percent: Option<i32>,
    pub extra_large: bool,
    pub locale: Option<Locale>,
}

impl OverrideRecord {
    /// Selected screen profile; an index outside the table selects nothing
    pub fn screen_profile(&self) -> Option<&'static ScreenProfile> {
        self.screen_class.and_then(screen::lookup)
    }

    /// Density as the host's float representation
    pub fn density(&self) -> Option<f32> {
        self.density_dpi.map(density_from_dpi)
    }

    pub fn font_scale(&self) -> Option<f32> {
        self.font_scale_percent.map(|p| p as f32 / 100.0)
    }

    /// True when no field inside `mask` carries an override
    pub fn is_empty_within(&self, mask: FieldMask) -> bool {
        !(mask.contains(FieldMask::DENSITY) && self.density_dpi.is_some()
            || mask.contains(FieldMask::SCREEN) && self.screen_profile().is_some()
            || mask.contains(FieldMask::FONT_SCALE) && self.font_scale_percent.is_some()
            || mask.contains(FieldMask::XLARGE) && self.extra_large
            || mask.contains(FieldMask::LOCALE) && self.locale.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.is_empty_within(FieldMask::ALL)
    }
}

fn density_from_dpi(dpi: i32) -> f32 {
    dpi as f32 / crate::constants::host::DENSITY_BASELINE
}

/// Resolve every field for `package`
pub fn resolve<P: Preferences + ?Sized>(prefs: &P, package: &str) -> OverrideRecord {
    resolve_fields(prefs, package, FieldMask::ALL)
}

/// Resolve only the fields in `mask`; the rest stay absent and are not read
pub fn resolve_fields<P: Preferences + ?Sized>(
    prefs: &P,
    package: &str,
    mask: FieldMask,
) -> OverrideRecord {
    let mut record = OverrideRecord::default();

    if mask.contains(FieldMask::DENSITY) {
        record.density_dpi = positive_with_default(prefs, package, keys::DPI, |v| v);
    }
    if mask.contains(FieldMask::SCREEN) {
        record.screen_class = positive_with_default(prefs, package, keys::SCREEN, |v| {
            screen::clamp_index(v) as i32
        })
        .map(|i| i as usize)
        .filter(|&i| screen::lookup(i).is_some());
    }
    if mask.contains(FieldMask::FONT_SCALE) {
        record.font_scale_percent = positive_with_default(prefs, package, keys::FONT_SCALE, |v| v);
    }
    if mask.contains(FieldMask::XLARGE) {
        record.extra_large = prefs.get_bool(&keys::key(package, keys::XLARGE), false);
    }
    if mask.contains(FieldMask::LOCALE) {
        record.locale = package_locale(prefs, package);
    }

    trace!(package = %package, record = ?record, "Resolved overrides");
    record
}

/// Locale override for a package. Package key only, no default fallback.
pub fn package_locale<P: Preferences + ?Sized>(prefs: &P, package: &str) -> Option<Locale> {
    prefs
        .get_string(&keys::key(package, keys::LOCALE), None)
        .and_then(|tag| Locale::parse(&tag))
}

/// Package value if positive after `normalize`, otherwise the default
/// record's value if positive, otherwise None
fn positive_with_default<P, F>(prefs: &P, package: &str, suffix: &str, normalize: F) -> Option<i32>
where
    P: Preferences + ?Sized,
    F: Fn(i32) -> i32,
{
    let own = normalize(prefs.get_int(&keys::key(package, suffix), 0));
    if own > 0 {
        return Some(own);
    }
    let fallback = normalize(prefs.get_int(&keys::key(keys::DEFAULT_PACKAGE, suffix), 0));
    (fallback > 0).then_some(fallback)
}
