//! Host platform adapter boundary
//!
//! The engine never reaches into host objects directly. Configuration and
//! display metrics are plain values the host hands over (and takes back,
//! substituted). Objects the engine must mutate in place are reached only
//! through the narrow traits below. Host version differences surface as
//! [`HostCapabilities`], not as type inspection.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::chokepoints::ChokepointKind;
use crate::constants::host::API_DISPLAY_INFO;
use crate::locale::Locale;

pub mod sim;

/// Resource configuration as the host resolves it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub font_scale: f32,
    pub screen_layout: u32,
    pub screen_width_dp: i32,
    pub screen_height_dp: i32,
    pub smallest_screen_width_dp: i32,
    /// Only present on hosts with [`HostCapabilities::configuration_density`];
    /// 0 means undefined
    pub density_dpi: i32,
    pub locale: Option<Locale>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            font_scale: 1.0,
            screen_layout: 0,
            screen_width_dp: 0,
            screen_height_dp: 0,
            smallest_screen_width_dp: 0,
            density_dpi: 0,
            locale: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayMetrics {
    pub density: f32,
    pub density_dpi: i32,
    pub scaled_density: f32,
    pub width_pixels: i32,
    pub height_pixels: i32,
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self {
            density: 1.0,
            density_dpi: 160,
            scaled_density: 1.0,
            width_pixels: 0,
            height_pixels: 0,
        }
    }
}

/// Arguments of a resource configuration update, substitutable in place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUpdate {
    pub config: Option<Configuration>,
    pub metrics: Option<DisplayMetrics>,
}

/// What this host version supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostCapabilities {
    /// Density lives in a display-info object updated after construction,
    /// rather than being set once at display init
    pub display_info: bool,
    /// The configuration object carries its own density field
    pub configuration_density: bool,
}

impl HostCapabilities {
    pub fn for_api_level(sdk_int: u32) -> Self {
        let modern = sdk_int >= API_DISPLAY_INFO;
        Self {
            display_info: modern,
            configuration_density: modern,
        }
    }
}

/// Process-level view of the host
pub trait HostPlatform: Send + Sync {
    /// Package running in this process, if known
    fn current_package(&self) -> Option<String>;

    fn capabilities(&self) -> HostCapabilities;

    /// Replace the process-wide default locale.
    ///
    /// The engine calls this only through
    /// `locale::publish_process_default`.
    fn set_default_locale(&self, locale: Locale);
}

/// A display object being constructed or refreshed
pub trait DisplayHandle {
    /// Float density (dpi / 160), set during construction
    fn set_density(&mut self, density: f32) -> Result<()>;

    /// Integer density on the display-info sub-object
    fn set_logical_density_dpi(&mut self, dpi: i32) -> Result<()>;
}

/// A resource set whose configuration is being recomputed
pub trait ResourceHandle {
    /// Package owning these resources; None for resources the engine
    /// cannot attribute
    fn package_name(&self) -> Option<String>;

    /// The resource set's current metrics, used when the host passes none
    fn display_metrics(&self) -> Result<DisplayMetrics>;

    fn set_display_metrics(&mut self, metrics: DisplayMetrics) -> Result<()>;
}

pub trait NotificationHandle {
    fn flags(&self) -> Result<u32>;

    fn set_flags(&mut self, flags: u32) -> Result<()>;
}

/// Installs a chokepoint into the host's call path
pub trait HookInstaller {
    fn install(&mut self, kind: ChokepointKind) -> Result<()>;
}
