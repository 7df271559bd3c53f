//! In-process simulated host
//!
//! Implements every adapter trait over plain values so the engine can be
//! driven without a real platform: by the `simulate` command and by tests.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;

use super::{
    Configuration, DisplayHandle, DisplayMetrics, HookInstaller, HostCapabilities, HostPlatform,
    NotificationHandle, ResourceHandle, ResourceUpdate,
};
use crate::chokepoints::ChokepointKind;
use crate::engine::{Engine, InstallReport};
use crate::locale::Locale;
use crate::prefs::Preferences;

#[derive(Debug)]
pub struct SimulatedHost {
    capabilities: HostCapabilities,
    current_package: Option<String>,
    default_locale: Mutex<Option<Locale>>,
}

impl SimulatedHost {
    pub fn new(sdk_int: u32, current_package: Option<&str>) -> Self {
        Self {
            capabilities: HostCapabilities::for_api_level(sdk_int),
            current_package: current_package.map(str::to_string),
            default_locale: Mutex::new(None),
        }
    }

    /// Process default locale as last set by the engine
    pub fn default_locale(&self) -> Option<Locale> {
        match self.default_locale.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl HostPlatform for SimulatedHost {
    fn current_package(&self) -> Option<String> {
        self.current_package.clone()
    }

    fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    fn set_default_locale(&self, locale: Locale) {
        let mut guard = match self.default_locale.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(locale);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimDisplayInfo {
    pub logical_density_dpi: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimDisplay {
    pub density: f32,
    pub info: SimDisplayInfo,
    #[serde(skip)]
    pub fail_writes: bool,
}

impl Default for SimDisplay {
    fn default() -> Self {
        Self {
            density: 1.0,
            info: SimDisplayInfo {
                logical_density_dpi: 160,
            },
            fail_writes: false,
        }
    }
}

impl DisplayHandle for SimDisplay {
    fn set_density(&mut self, density: f32) -> Result<()> {
        if self.fail_writes {
            bail!("display density field not writable");
        }
        self.density = density;
        Ok(())
    }

    fn set_logical_density_dpi(&mut self, dpi: i32) -> Result<()> {
        if self.fail_writes {
            bail!("display info not available");
        }
        self.info.logical_density_dpi = dpi;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimResources {
    pub package: Option<String>,
    pub metrics: DisplayMetrics,
    pub fail_metrics: bool,
}

impl SimResources {
    pub fn new(package: Option<&str>) -> Self {
        Self {
            package: package.map(str::to_string),
            metrics: DisplayMetrics::default(),
            fail_metrics: false,
        }
    }
}

impl ResourceHandle for SimResources {
    fn package_name(&self) -> Option<String> {
        self.package.clone()
    }

    fn display_metrics(&self) -> Result<DisplayMetrics> {
        if self.fail_metrics {
            bail!("resource metrics unavailable");
        }
        Ok(self.metrics.clone())
    }

    fn set_display_metrics(&mut self, metrics: DisplayMetrics) -> Result<()> {
        if self.fail_metrics {
            bail!("resource metrics unavailable");
        }
        self.metrics = metrics;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimNotification {
    pub flags: u32,
}

impl NotificationHandle for SimNotification {
    fn flags(&self) -> Result<u32> {
        Ok(self.flags)
    }

    fn set_flags(&mut self, flags: u32) -> Result<()> {
        self.flags = flags;
        Ok(())
    }
}

/// Records installations; refuses the kinds listed in `reject`
#[derive(Debug, Default)]
pub struct SimInstaller {
    pub installed: Vec<ChokepointKind>,
    pub reject: Vec<ChokepointKind>,
}

impl SimInstaller {
    pub fn rejecting(kinds: impl IntoIterator<Item = ChokepointKind>) -> Self {
        Self {
            installed: Vec::new(),
            reject: kinds.into_iter().collect(),
        }
    }
}

impl HookInstaller for SimInstaller {
    fn install(&mut self, kind: ChokepointKind) -> Result<()> {
        if self.reject.contains(&kind) {
            bail!("target method for {kind} not found");
        }
        self.installed.push(kind);
        Ok(())
    }
}

/// Host state to run every chokepoint against once
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Falls back to the configured API level
    pub sdk_int: Option<u32>,
    pub executing_package: Option<String>,
    pub resource_package: Option<String>,
    pub configuration: Option<Configuration>,
    pub metrics: Option<DisplayMetrics>,
    pub resource_metrics: DisplayMetrics,
    pub notification_flags: u32,
    /// Chokepoints whose installation should fail
    pub fail_install: Vec<ChokepointKind>,
}

/// Host state after the run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub sdk_int: u32,
    pub install: InstallReport,
    pub display: SimDisplay,
    pub resource_update: ResourceUpdate,
    pub resource_metrics: DisplayMetrics,
    pub notification_flags: u32,
    pub default_locale: Option<Locale>,
}

pub fn run_scenario<P: Preferences>(
    prefs: P,
    scenario: Scenario,
    default_sdk: u32,
) -> ScenarioOutcome {
    let sdk_int = scenario.sdk_int.unwrap_or(default_sdk);
    let host = SimulatedHost::new(sdk_int, scenario.executing_package.as_deref());
    let engine = Engine::new(prefs, host);

    let mut installer = SimInstaller::rejecting(scenario.fail_install);
    let install = engine.install(&mut installer);

    let mut display = SimDisplay::default();
    let mut resources = SimResources::new(scenario.resource_package.as_deref());
    resources.metrics = scenario.resource_metrics;
    let mut resource_update = ResourceUpdate {
        config: scenario.configuration,
        metrics: scenario.metrics,
    };
    let mut notification = SimNotification {
        flags: scenario.notification_flags,
    };

    // The host only calls into chokepoints that made it in
    for kind in &install.installed {
        let changed = match kind {
            ChokepointKind::DisplayInit => engine.on_display_init(&mut display),
            ChokepointKind::DisplayInfoUpdate => engine.on_display_info_update(&mut display),
            ChokepointKind::ResourceConfiguration => {
                engine.on_resources_update(&mut resources, &mut resource_update)
            }
            ChokepointKind::NotificationDelivery => engine.on_notify(&mut notification),
        };
        info!(chokepoint = %kind, changed, "Simulated host call");
    }

    ScenarioOutcome {
        sdk_int,
        install,
        display,
        resource_update,
        resource_metrics: resources.metrics,
        notification_flags: notification.flags,
        default_locale: engine.host().default_locale(),
    }
}
