//! Override engine
//!
//! Owns the preference handle and the host adapter, installs the
//! chokepoints and runs them fail-open: whatever goes wrong inside a
//! chokepoint is logged and the host carries on with its own values.

use anyhow::{Result, anyhow};
use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{error, info, warn};

use crate::chokepoints::{self, ChokepointKind};
use crate::config::Settings;
use crate::gate;
use crate::host::{
    DisplayHandle, HookInstaller, HostPlatform, NotificationHandle, ResourceHandle, ResourceUpdate,
};
use crate::locale;
use crate::merger::ConfigurationMerger;
use crate::prefs::{JsonPreferences, Preferences};
use crate::resolver;

/// Outcome of [`Engine::install`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstallReport {
    pub installed: Vec<ChokepointKind>,
    pub failed: Vec<(ChokepointKind, String)>,
}

impl InstallReport {
    pub fn is_installed(&self, kind: ChokepointKind) -> bool {
        self.installed.contains(&kind)
    }
}

pub struct Engine<P, H> {
    prefs: P,
    host: H,
    merger: ConfigurationMerger,
}

impl<H: HostPlatform> Engine<JsonPreferences, H> {
    /// Open the preference file named in `settings`; used at runtime init
    /// and for command-line apps alike
    pub fn load(settings: &Settings, host: H) -> Result<Self> {
        let prefs = JsonPreferences::open(&settings.prefs_path)?;
        Ok(Self::new(prefs, host))
    }
}

impl<P: Preferences, H: HostPlatform> Engine<P, H> {
    pub fn new(prefs: P, host: H) -> Self {
        let merger = ConfigurationMerger::new(host.capabilities());
        Self { prefs, host, merger }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Install every chokepoint this host needs. Each one is independent:
    /// a failure is logged and recorded, the rest still install.
    pub fn install<I: HookInstaller + ?Sized>(&self, installer: &mut I) -> InstallReport {
        let mut report = InstallReport::default();

        for kind in ChokepointKind::for_host(self.host.capabilities()) {
            match installer.install(kind) {
                Ok(()) => {
                    info!(chokepoint = %kind, strategy = ?kind.strategy(), "Installed chokepoint");
                    report.installed.push(kind);
                }
                Err(e) => {
                    error!(chokepoint = %kind, error = ?e, "Failed to install chokepoint");
                    report.failed.push((kind, format!("{e:#}")));
                }
            }
        }

        report
    }

    pub fn on_display_init(&self, display: &mut dyn DisplayHandle) -> bool {
        fail_open(ChokepointKind::DisplayInit, || {
            chokepoints::display_init(&self.prefs, &self.host, display)
        })
    }

    pub fn on_display_info_update(&self, display: &mut dyn DisplayHandle) -> bool {
        fail_open(ChokepointKind::DisplayInfoUpdate, || {
            chokepoints::display_info_update(&self.prefs, &self.host, display)
        })
    }

    pub fn on_resources_update(
        &self,
        resources: &mut dyn ResourceHandle,
        update: &mut ResourceUpdate,
    ) -> bool {
        fail_open(ChokepointKind::ResourceConfiguration, || {
            chokepoints::resource_configuration(
                &self.prefs,
                &self.host,
                &self.merger,
                resources,
                update,
            )
        })
    }

    pub fn on_notify(&self, notification: &mut dyn NotificationHandle) -> bool {
        fail_open(ChokepointKind::NotificationDelivery, || {
            chokepoints::notification_delivery(&self.prefs, &self.host, notification)
        })
    }

    /// A package is being loaded into this process: pick up preference
    /// changes, then apply its locale as the process default
    pub fn on_package_load(&self, package: &str) {
        if let Err(e) = self.prefs.reload() {
            warn!(
                package = %package,
                error = ?e,
                "Preference reload failed, using previous values"
            );
        }

        if !gate::is_active(&self.prefs, package) {
            return;
        }
        if let Some(locale) = resolver::package_locale(&self.prefs, package) {
            locale::publish_process_default(&self.host, package, &locale);
        }
    }
}

/// Run a chokepoint body; errors and panics become "no change"
fn fail_open<F>(kind: ChokepointKind, body: F) -> bool
where
    F: FnOnce() -> Result<bool>,
{
    let result = catch_unwind(AssertUnwindSafe(body)).unwrap_or_else(|panic| {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(anyhow!("panicked: {message}"))
    });

    match result {
        Ok(changed) => changed,
        Err(e) => {
            error!(
                chokepoint = %kind,
                strategy = ?kind.strategy(),
                error = ?e,
                "Chokepoint failed, host values left unchanged"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::sim::{SimDisplay, SimInstaller, SimNotification, SimResources, SimulatedHost};
    use crate::host::{Configuration, DisplayMetrics};
    use crate::locale::Locale;
    use crate::test_utils::prefs_from;
    use serde_json::json;

    struct PanickingNotification;

    impl NotificationHandle for PanickingNotification {
        fn flags(&self) -> Result<u32> {
            panic!("host object went away");
        }

        fn set_flags(&mut self, _flags: u32) -> Result<()> {
            unreachable!()
        }
    }

    #[test]
    fn test_install_selects_display_path_by_api_level() {
        let legacy = Engine::new(prefs_from(json!({})), SimulatedHost::new(16, Some("p")));
        let report = legacy.install(&mut SimInstaller::default());
        assert!(report.is_installed(ChokepointKind::DisplayInit));
        assert!(!report.is_installed(ChokepointKind::DisplayInfoUpdate));

        let modern = Engine::new(prefs_from(json!({})), SimulatedHost::new(21, Some("p")));
        let report = modern.install(&mut SimInstaller::default());
        assert!(report.is_installed(ChokepointKind::DisplayInfoUpdate));
        assert!(!report.is_installed(ChokepointKind::DisplayInit));
        assert_eq!(report.installed.len(), 3);
    }

    #[test]
    fn test_install_failure_is_isolated() {
        let engine = Engine::new(prefs_from(json!({})), SimulatedHost::new(21, Some("p")));
        let mut installer = SimInstaller::rejecting([ChokepointKind::ResourceConfiguration]);
        let report = engine.install(&mut installer);

        assert!(report.is_installed(ChokepointKind::DisplayInfoUpdate));
        assert!(report.is_installed(ChokepointKind::NotificationDelivery));
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, ChokepointKind::ResourceConfiguration);
        assert_eq!(installer.installed, report.installed);
    }

    #[test]
    fn test_host_failure_is_fail_open() {
        let prefs = prefs_from(json!({"p/active": true, "p/dpi": 240}));
        let engine = Engine::new(prefs, SimulatedHost::new(21, Some("p")));

        let mut display = SimDisplay {
            fail_writes: true,
            ..Default::default()
        };
        assert!(!engine.on_display_info_update(&mut display));
        assert_eq!(display.info.logical_density_dpi, 160);

        let mut resources = SimResources::new(Some("p"));
        resources.fail_metrics = true;
        let mut update = ResourceUpdate {
            config: Some(Configuration::default()),
            metrics: None,
        };
        assert!(!engine.on_resources_update(&mut resources, &mut update));
        assert_eq!(update.config, Some(Configuration::default()));
        assert_eq!(resources.metrics, DisplayMetrics::default());
    }

    #[test]
    fn test_panic_is_contained() {
        let prefs = prefs_from(json!({"p/active": true, "p/insistent-notif": true}));
        let engine = Engine::new(prefs, SimulatedHost::new(21, Some("p")));
        assert!(!engine.on_notify(&mut PanickingNotification));
    }

    #[test]
    fn test_package_load_sets_default_locale_for_active_package() {
        let prefs = prefs_from(json!({"p/active": true, "p/locale": "pt_BR", "q/locale": "de"}));
        let engine = Engine::new(prefs, SimulatedHost::new(21, Some("p")));

        engine.on_package_load("q");
        assert_eq!(engine.host().default_locale(), None);

        engine.on_package_load("p");
        assert_eq!(engine.host().default_locale(), Some(Locale::new("pt", "BR", "")));
    }

    #[test]
    fn test_package_load_reloads_preferences() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, json!({"p/active": true}).to_string()).unwrap();

        let settings = Settings {
            prefs_path: path.clone(),
            ..Default::default()
        };
        let engine = Engine::load(&settings, SimulatedHost::new(21, Some("p"))).unwrap();
        engine.on_package_load("p");
        assert_eq!(engine.host().default_locale(), None);

        std::fs::write(&path, json!({"p/active": true, "p/locale": "ko_KR"}).to_string()).unwrap();
        engine.on_package_load("p");
        assert_eq!(engine.host().default_locale(), Some(Locale::new("ko", "KR", "")));
    }

    #[test]
    fn test_concurrent_chokepoints_share_engine() {
        let prefs = prefs_from(json!({
            "a/active": true, "a/dpi": 240,
            "b/active": true, "b/dpi": 480,
        }));
        let engine = std::sync::Arc::new(Engine::new(prefs, SimulatedHost::new(21, Some("a"))));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = std::sync::Arc::clone(&engine);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let mut display = SimDisplay::default();
                        assert!(engine.on_display_info_update(&mut display));
                        assert_eq!(display.info.logical_density_dpi, 240);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_notification_through_engine() {
        let prefs = prefs_from(json!({"p/active": true, "p/insistent-notif": true}));
        let engine = Engine::new(prefs, SimulatedHost::new(21, Some("p")));
        let mut n = SimNotification { flags: 0x10 };
        assert!(engine.on_notify(&mut n));
        assert_eq!(n.flags, 0x14);
    }
}
