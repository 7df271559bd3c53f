//! Application-wide constants
//!
//! Preference key layout, host flag values and file locations used
//! throughout the engine, kept in one place.

/// Preference key suffixes (full key = package name + suffix)
pub mod prefs {
    /// Reserved package name holding the global default record
    pub const DEFAULT_PACKAGE: &str = "default";

    /// Master switch: overrides only apply when this is true
    pub const ACTIVE: &str = "/active";

    /// Notifications posted by the package become insistent
    pub const INSISTENT_NOTIF: &str = "/insistent-notif";

    /// Density override in dpi
    pub const DPI: &str = "/dpi";

    /// Index into the screen profile table
    pub const SCREEN: &str = "/screen";

    /// Font scale in percent
    pub const FONT_SCALE: &str = "/font-scale";

    /// Report an extra-large screen layout
    pub const XLARGE: &str = "/tablet";

    /// Locale tag, `language[_region[_variant]]`
    pub const LOCALE: &str = "/locale";

    /// Build a full preference key
    pub fn key(package: &str, suffix: &str) -> String {
        format!("{package}{suffix}")
    }
}

/// Host platform values the engine writes into host objects
pub mod host {
    /// Screen-layout size bit for extra-large screens
    pub const SCREENLAYOUT_SIZE_XLARGE: u32 = 0x04;

    /// Notification flag: repeat sound/vibration until acknowledged
    pub const FLAG_INSISTENT: u32 = 0x04;

    /// Baseline density; density = dpi / DENSITY_BASELINE
    pub const DENSITY_BASELINE: f32 = 160.0;

    /// First API level with the display-info update path and the
    /// density field on the configuration object
    pub const API_DISPLAY_INFO: u32 = 17;
}

/// Config file locations
pub mod config {
    /// Directory name under the user's config dir
    pub const APP_DIR: &str = "app-settings";

    /// Engine settings file
    pub const FILENAME: &str = "settings.json";

    /// Default preference store file
    pub const PREFS_FILENAME: &str = "preferences.json";
}

/// Validation bounds for settings
pub mod validation {
    pub const MIN_SDK_INT: u32 = 1;
    pub const MAX_SDK_INT: u32 = 100;
}
