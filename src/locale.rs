//! Locale tags and the process-wide default locale

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::host::HostPlatform;

/// A `language[_region[_variant]]` locale
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Locale {
    pub language: String,
    pub region: String,
    pub variant: String,
}

impl Locale {
    pub fn new(
        language: impl Into<String>,
        region: impl Into<String>,
        variant: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            region: region.into(),
            variant: variant.into(),
        }
    }

    /// Parse a stored tag. Splits on `_` into at most three parts, so any
    /// further underscores stay in the variant. Empty tags and tags without
    /// a language yield None.
    pub fn parse(tag: &str) -> Option<Self> {
        if tag.is_empty() {
            return None;
        }

        let mut parts = tag.splitn(3, '_');
        let language = parts.next().unwrap_or_default();
        if language.is_empty() {
            return None;
        }
        let region = parts.next().unwrap_or_default();
        let variant = parts.next().unwrap_or_default();
        Some(Self::new(language, region, variant))
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.language)?;
        if !self.region.is_empty() || !self.variant.is_empty() {
            write!(f, "_{}", self.region)?;
        }
        if !self.variant.is_empty() {
            write!(f, "_{}", self.variant)?;
        }
        Ok(())
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.to_string()
    }
}

impl TryFrom<String> for Locale {
    type Error = anyhow::Error;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        Locale::parse(&tag).ok_or_else(|| anyhow!("invalid locale tag '{tag}'"))
    }
}

/// The only write path to the process-wide default locale.
///
/// Callers must already have established that `package` is the package
/// executing in this process; the default is shared by everything in it.
pub(crate) fn publish_process_default<H: HostPlatform + ?Sized>(
    host: &H,
    package: &str,
    locale: &Locale,
) {
    info!(package = %package, locale = %locale, "Setting process default locale");
    host.set_default_locale(locale.clone());
}
