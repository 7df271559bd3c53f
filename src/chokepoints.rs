//! Interception chokepoints
//!
//! Each function here is the body run at one host call site. They return
//! whether host-visible state changed and propagate host failures with `?`;
//! the [`Engine`](crate::engine::Engine) entry points turn failures into
//! no-ops. Every fallible host read happens before the first host write.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

use crate::constants::{host::FLAG_INSISTENT, prefs as keys};
use crate::gate;
use crate::host::{
    DisplayHandle, HostCapabilities, HostPlatform, NotificationHandle, ResourceHandle,
    ResourceUpdate,
};
use crate::locale;
use crate::merger::{ConfigurationMerger, LocaleScope};
use crate::prefs::Preferences;
use crate::resolver::{self, FieldMask, OverrideRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChokepointKind {
    /// Display object construction (hosts without display info)
    DisplayInit,
    /// Display info refresh (hosts with display info)
    DisplayInfoUpdate,
    /// Resource set configuration update
    ResourceConfiguration,
    /// Notification about to be posted
    NotificationDelivery,
}

/// How a chokepoint is allowed to touch host state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MutationStrategy {
    /// Object under construction, write fields directly
    InPlace,
    /// Shared object, write a copy and substitute the argument
    CloneAndSubstitute,
    /// OR bits into a flags value
    FlagOr,
}

impl ChokepointKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::DisplayInit => "display_init",
            Self::DisplayInfoUpdate => "display_info_update",
            Self::ResourceConfiguration => "resource_configuration",
            Self::NotificationDelivery => "notification_delivery",
        }
    }

    pub const fn strategy(self) -> MutationStrategy {
        match self {
            Self::DisplayInit | Self::DisplayInfoUpdate => MutationStrategy::InPlace,
            Self::ResourceConfiguration => MutationStrategy::CloneAndSubstitute,
            Self::NotificationDelivery => MutationStrategy::FlagOr,
        }
    }

    /// The one display chokepoint this host uses
    pub fn display_for(capabilities: HostCapabilities) -> Self {
        if capabilities.display_info {
            Self::DisplayInfoUpdate
        } else {
            Self::DisplayInit
        }
    }

    /// Chokepoints to install on a host, display path chosen by capability
    pub fn for_host(capabilities: HostCapabilities) -> [Self; 3] {
        [
            Self::display_for(capabilities),
            Self::ResourceConfiguration,
            Self::NotificationDelivery,
        ]
    }
}

impl fmt::Display for ChokepointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Density overrides of the executing package, if it is active
fn executing_density<P, H>(prefs: &P, host: &H) -> Option<(String, OverrideRecord)>
where
    P: Preferences + ?Sized,
    H: HostPlatform + ?Sized,
{
    let package = host.current_package()?;
    if !gate::is_active(prefs, &package) {
        return None;
    }
    let overrides = resolver::resolve_fields(prefs, &package, FieldMask::DENSITY);
    Some((package, overrides))
}

/// Display construction: set the float density in place
pub fn display_init<P, H>(prefs: &P, host: &H, display: &mut dyn DisplayHandle) -> Result<bool>
where
    P: Preferences + ?Sized,
    H: HostPlatform + ?Sized,
{
    let Some((package, overrides)) = executing_density(prefs, host) else {
        return Ok(false);
    };
    let Some(density) = overrides.density() else {
        return Ok(false);
    };
    display.set_density(density)?;
    debug!(package = %package, density, "Display density overridden");
    Ok(true)
}

/// Display info refresh: set the integer density on the info object
pub fn display_info_update<P, H>(
    prefs: &P,
    host: &H,
    display: &mut dyn DisplayHandle,
) -> Result<bool>
where
    P: Preferences + ?Sized,
    H: HostPlatform + ?Sized,
{
    let Some((package, overrides)) = executing_density(prefs, host) else {
        return Ok(false);
    };
    let Some(dpi) = overrides.density_dpi else {
        return Ok(false);
    };
    display.set_logical_density_dpi(dpi)?;
    debug!(package = %package, dpi, "Display info density overridden");
    Ok(true)
}

/// Resource configuration update.
///
/// Display fields follow the executing package, the locale follows the
/// package owning the resources. Both land on a single copy of the host
/// configuration, which then replaces the argument.
pub fn resource_configuration<P, H>(
    prefs: &P,
    host: &H,
    merger: &ConfigurationMerger,
    resources: &mut dyn ResourceHandle,
    update: &mut ResourceUpdate,
) -> Result<bool>
where
    P: Preferences + ?Sized,
    H: HostPlatform + ?Sized,
{
    let Some(base) = update.config.as_ref() else {
        return Ok(false);
    };
    let owner = resources.package_name();
    let executing = host.current_package();

    let mut effective = None;
    let mut metrics_from_resources = false;

    if let Some(package) = executing.as_deref()
        && gate::is_active(prefs, package)
    {
        let display = resolver::resolve_fields(prefs, package, FieldMask::DISPLAY);
        if !display.is_empty_within(FieldMask::DISPLAY) {
            // Without metrics from the host, start from the resource set's own
            let fallback;
            let base_metrics = match update.metrics.as_ref() {
                Some(m) => Some(m),
                None => {
                    fallback = resources.display_metrics()?;
                    metrics_from_resources = true;
                    Some(&fallback)
                }
            };
            let scope = LocaleScope::for_owner(Some(package), owner.as_deref().unwrap_or_default());
            effective = merger.merge(base, base_metrics, &display, FieldMask::DISPLAY, scope);
        }
    }

    if let Some(owner) = owner.as_deref()
        && gate::is_active(prefs, owner)
    {
        let language = resolver::resolve_fields(prefs, owner, FieldMask::LOCALE);
        let scope = LocaleScope::for_owner(executing.as_deref(), owner);
        effective = merger.merge_onto(effective, base, None, &language, FieldMask::LOCALE, scope);
    }

    let Some(effective) = effective else {
        trace!(owner = ?owner, executing = ?executing, "No resource overrides");
        return Ok(false);
    };

    // Fallible host write first; arguments are only replaced once it succeeded
    let mut new_metrics = effective.metrics;
    if metrics_from_resources && let Some(metrics) = new_metrics.take() {
        resources.set_display_metrics(metrics)?;
    }

    if let (Some(locale), Some(owner)) = (&effective.process_locale, owner.as_deref()) {
        locale::publish_process_default(host, owner, locale);
    }

    debug!(
        owner = ?owner,
        executing = ?executing,
        config = ?effective.config,
        "Resource configuration overridden"
    );
    update.config = Some(effective.config);
    if new_metrics.is_some() {
        update.metrics = new_metrics;
    }
    Ok(true)
}

/// Notification delivery: mark insistent for opted-in packages
pub fn notification_delivery<P, H>(
    prefs: &P,
    host: &H,
    notification: &mut dyn NotificationHandle,
) -> Result<bool>
where
    P: Preferences + ?Sized,
    H: HostPlatform + ?Sized,
{
    let Some(package) = host.current_package() else {
        return Ok(false);
    };
    if !gate::is_active_for(prefs, &package, keys::INSISTENT_NOTIF) {
        return Ok(false);
    }
    let flags = notification.flags()?;
    notification.set_flags(flags | FLAG_INSISTENT)?;
    debug!(package = %package, flags = flags | FLAG_INSISTENT, "Notification made insistent");
    Ok(true)
}
