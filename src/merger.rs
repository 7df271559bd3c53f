//! Configuration merging
//!
//! Produces a copy of the host's configuration and metrics with only the
//! overridden fields changed. When nothing in the requested field subset
//! is overridden the merger returns None and the host values must be left
//! alone, without even cloning them.

use serde::Serialize;
use tracing::debug;

use crate::constants::host::SCREENLAYOUT_SIZE_XLARGE;
use crate::host::{Configuration, DisplayMetrics, HostCapabilities};
use crate::locale::Locale;
use crate::resolver::{FieldMask, OverrideRecord};

/// Whether the configuration being merged belongs to the package running
/// in this process. Only then may a locale override become the process
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LocaleScope {
    ExecutingPackage,
    ForeignPackage,
}

impl LocaleScope {
    pub fn for_owner(executing: Option<&str>, owner: &str) -> Self {
        if executing == Some(owner) {
            Self::ExecutingPackage
        } else {
            Self::ForeignPackage
        }
    }
}

/// Result of one merge: owned by the chokepoint call that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveConfiguration {
    pub config: Configuration,
    /// Copy of the base metrics with overrides applied; None when the
    /// merge had no metrics to start from
    pub metrics: Option<DisplayMetrics>,
    /// Locale to publish as process default, if scoped to the executing package
    pub process_locale: Option<Locale>,
}

#[derive(Debug, Clone, Copy)]
pub struct ConfigurationMerger {
    capabilities: HostCapabilities,
}

impl ConfigurationMerger {
    pub fn new(capabilities: HostCapabilities) -> Self {
        Self { capabilities }
    }

    /// Merge `overrides ∩ mask` onto a copy of the base values
    pub fn merge(
        &self,
        base_config: &Configuration,
        base_metrics: Option<&DisplayMetrics>,
        overrides: &OverrideRecord,
        mask: FieldMask,
        scope: LocaleScope,
    ) -> Option<EffectiveConfiguration> {
        self.merge_onto(None, base_config, base_metrics, overrides, mask, scope)
    }

    /// Like [`merge`](Self::merge), but reuses `prior` as the copy when an
    /// earlier merge in the same call already produced one
    pub fn merge_onto(
        &self,
        prior: Option<EffectiveConfiguration>,
        base_config: &Configuration,
        base_metrics: Option<&DisplayMetrics>,
        overrides: &OverrideRecord,
        mask: FieldMask,
        scope: LocaleScope,
    ) -> Option<EffectiveConfiguration> {
        if overrides.is_empty_within(mask) {
            return prior;
        }

        let mut effective = prior.unwrap_or_else(|| EffectiveConfiguration {
            config: base_config.clone(),
            metrics: base_metrics.cloned(),
            process_locale: None,
        });
        self.apply(&mut effective, overrides, mask, scope);
        Some(effective)
    }

    fn apply(
        &self,
        effective: &mut EffectiveConfiguration,
        overrides: &OverrideRecord,
        mask: FieldMask,
        scope: LocaleScope,
    ) {
        let config = &mut effective.config;

        if mask.contains(FieldMask::SCREEN)
            && let Some(profile) = overrides.screen_profile()
        {
            config.smallest_screen_width_dp = profile.smallest_width_dp;
            config.screen_width_dp = profile.width_dp;
            config.screen_height_dp = profile.height_dp;
            if let (Some(metrics), Some((w, h))) = (effective.metrics.as_mut(), profile.pixels()) {
                metrics.width_pixels = w;
                metrics.height_pixels = h;
            }
        }

        if mask.contains(FieldMask::XLARGE) && overrides.extra_large {
            config.screen_layout |= SCREENLAYOUT_SIZE_XLARGE;
        }

        if mask.contains(FieldMask::DENSITY)
            && let (Some(dpi), Some(density)) = (overrides.density_dpi, overrides.density())
        {
            match effective.metrics.as_mut() {
                Some(metrics) => {
                    metrics.density = density;
                    metrics.density_dpi = dpi;
                }
                None => debug!(dpi, "No metrics to carry density override"),
            }
            // Both representations must agree where the host has both
            if self.capabilities.configuration_density {
                config.density_dpi = dpi;
            }
        }

        if mask.contains(FieldMask::FONT_SCALE)
            && let Some(scale) = overrides.font_scale()
        {
            config.font_scale = scale;
        }

        if mask.contains(FieldMask::LOCALE)
            && let Some(locale) = &overrides.locale
        {
            config.locale = Some(locale.clone());
            if scope == LocaleScope::ExecutingPackage {
                effective.process_locale = Some(locale.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostCapabilities;
    use crate::screen;

    fn base_config() -> Configuration {
        Configuration {
            font_scale: 1.0,
            screen_layout: 0x02 | 0x10,
            screen_width_dp: 360,
            screen_height_dp: 640,
            smallest_screen_width_dp: 360,
            density_dpi: 320,
            locale: Some(Locale::new("en", "US", "")),
        }
    }

    fn base_metrics() -> DisplayMetrics {
        DisplayMetrics {
            density: 2.0,
            density_dpi: 320,
            scaled_density: 2.0,
            width_pixels: 720,
            height_pixels: 1280,
        }
    }

    fn modern() -> ConfigurationMerger {
        ConfigurationMerger::new(HostCapabilities::for_api_level(19))
    }

    #[test]
    fn test_no_overrides_returns_none() {
        let merged = modern().merge(
            &base_config(),
            Some(&base_metrics()),
            &OverrideRecord::default(),
            FieldMask::ALL,
            LocaleScope::ExecutingPackage,
        );
        assert!(merged.is_none());
    }

    #[test]
    fn test_fields_outside_mask_return_none() {
        let overrides = OverrideRecord {
            locale: Some(Locale::new("fr", "", "")),
            ..Default::default()
        };
        let merged = modern().merge(
            &base_config(),
            Some(&base_metrics()),
            &overrides,
            FieldMask::DISPLAY,
            LocaleScope::ExecutingPackage,
        );
        assert!(merged.is_none());
    }

    #[test]
    fn test_screen_and_density_merge() {
        let overrides = OverrideRecord {
            density_dpi: Some(240),
            screen_class: Some(2),
            ..Default::default()
        };
        let merged = modern()
            .merge(
                &base_config(),
                Some(&base_metrics()),
                &overrides,
                FieldMask::DISPLAY,
                LocaleScope::ExecutingPackage,
            )
            .unwrap();

        assert_eq!(merged.config.smallest_screen_width_dp, 600);
        assert_eq!(merged.config.screen_width_dp, 600);
        assert_eq!(merged.config.screen_height_dp, 1024);
        assert_eq!(merged.config.density_dpi, 240);
        assert_eq!(merged.config.font_scale, 1.0);
        assert_eq!(merged.config.locale, base_config().locale);

        let metrics = merged.metrics.unwrap();
        assert_eq!(metrics.density, 1.5);
        assert_eq!(metrics.density_dpi, 240);
        assert_eq!(metrics.width_pixels, 1536);
        assert_eq!(metrics.height_pixels, 2048);
        // Untouched field copied through
        assert_eq!(metrics.scaled_density, 2.0);
        assert_eq!(merged.process_locale, None);
    }

    #[test]
    fn test_dp_only_profile_keeps_pixels() {
        let overrides = OverrideRecord {
            screen_class: Some(4),
            ..Default::default()
        };
        let merged = modern()
            .merge(
                &base_config(),
                Some(&base_metrics()),
                &overrides,
                FieldMask::ALL,
                LocaleScope::ForeignPackage,
            )
            .unwrap();
        assert_eq!(merged.config.smallest_screen_width_dp, 480);
        let metrics = merged.metrics.unwrap();
        assert_eq!(metrics.width_pixels, 720);
        assert_eq!(metrics.height_pixels, 1280);
    }

    #[test]
    fn test_screen_class_outside_table_is_no_change() {
        let overrides = OverrideRecord {
            screen_class: Some(screen::PROFILES.len()),
            ..Default::default()
        };
        let merged = modern().merge(
            &base_config(),
            Some(&base_metrics()),
            &overrides,
            FieldMask::ALL,
            LocaleScope::ForeignPackage,
        );
        assert!(merged.is_none());

        let overrides = OverrideRecord {
            screen_class: Some(usize::MAX),
            font_scale_percent: Some(120),
            ..Default::default()
        };
        let merged = modern()
            .merge(
                &base_config(),
                Some(&base_metrics()),
                &overrides,
                FieldMask::ALL,
                LocaleScope::ForeignPackage,
            )
            .unwrap();
        assert_eq!(merged.config.screen_width_dp, base_config().screen_width_dp);
        assert_eq!(merged.metrics, Some(base_metrics()));
        assert_eq!(merged.config.font_scale, 1.2);
    }

    #[test]
    fn test_legacy_host_leaves_configuration_density() {
        let merger = ConfigurationMerger::new(HostCapabilities::for_api_level(16));
        let overrides = OverrideRecord {
            density_dpi: Some(120),
            ..Default::default()
        };
        let merged = merger
            .merge(
                &base_config(),
                Some(&base_metrics()),
                &overrides,
                FieldMask::ALL,
                LocaleScope::ExecutingPackage,
            )
            .unwrap();
        assert_eq!(merged.config.density_dpi, 320);
        assert_eq!(merged.metrics.unwrap().density_dpi, 120);
    }

    #[test]
    fn test_extra_large_only_sets_bits() {
        let overrides = OverrideRecord {
            extra_large: true,
            ..Default::default()
        };
        let base = base_config();
        let merged = modern()
            .merge(
                &base,
                Some(&base_metrics()),
                &overrides,
                FieldMask::ALL,
                LocaleScope::ForeignPackage,
            )
            .unwrap();
        assert_eq!(merged.config.screen_layout & base.screen_layout, base.screen_layout);
        assert_eq!(merged.config.screen_layout, base.screen_layout | SCREENLAYOUT_SIZE_XLARGE);
    }

    #[test]
    fn test_font_scale_from_percent() {
        let overrides = OverrideRecord {
            font_scale_percent: Some(85),
            ..Default::default()
        };
        let merged = modern()
            .merge(&base_config(), None, &overrides, FieldMask::ALL, LocaleScope::ForeignPackage)
            .unwrap();
        assert_eq!(merged.config.font_scale, 85.0 / 100.0);
        assert!(merged.metrics.is_none());
    }

    #[test]
    fn test_locale_publishes_only_for_executing_package() {
        let overrides = OverrideRecord {
            locale: Some(Locale::new("fr", "CA", "")),
            ..Default::default()
        };

        let own = modern()
            .merge(
                &base_config(),
                None,
                &overrides,
                FieldMask::LOCALE,
                LocaleScope::ExecutingPackage,
            )
            .unwrap();
        assert_eq!(own.config.locale, Some(Locale::new("fr", "CA", "")));
        assert_eq!(own.process_locale, Some(Locale::new("fr", "CA", "")));

        let foreign = modern()
            .merge(&base_config(), None, &overrides, FieldMask::LOCALE, LocaleScope::ForeignPackage)
            .unwrap();
        assert_eq!(foreign.config.locale, Some(Locale::new("fr", "CA", "")));
        assert_eq!(foreign.process_locale, None);
    }

    #[test]
    fn test_merge_onto_reuses_prior_copy() {
        let merger = modern();
        let display = OverrideRecord {
            font_scale_percent: Some(120),
            ..Default::default()
        };
        let first = merger.merge(
            &base_config(),
            Some(&base_metrics()),
            &display,
            FieldMask::DISPLAY,
            LocaleScope::ExecutingPackage,
        );

        let locale = OverrideRecord {
            locale: Some(Locale::new("ja", "", "")),
            ..Default::default()
        };
        let merged = merger
            .merge_onto(
                first,
                &base_config(),
                None,
                &locale,
                FieldMask::LOCALE,
                LocaleScope::ForeignPackage,
            )
            .unwrap();

        assert_eq!(merged.config.font_scale, 1.2);
        assert_eq!(merged.config.locale, Some(Locale::new("ja", "", "")));
        assert_eq!(merged.metrics, Some(base_metrics()));
    }

    #[test]
    fn test_merge_onto_empty_keeps_prior() {
        let merger = modern();
        let merged = merger.merge_onto(
            None,
            &base_config(),
            None,
            &OverrideRecord::default(),
            FieldMask::ALL,
            LocaleScope::ExecutingPackage,
        );
        assert!(merged.is_none());
    }

    #[test]
    fn test_locale_scope_for_owner() {
        assert_eq!(LocaleScope::for_owner(Some("a"), "a"), LocaleScope::ExecutingPackage);
        assert_eq!(LocaleScope::for_owner(Some("a"), "b"), LocaleScope::ForeignPackage);
        assert_eq!(LocaleScope::for_owner(None, "a"), LocaleScope::ForeignPackage);
    }
}
