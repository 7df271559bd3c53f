//! Per-application display and locale override engine
//!
//! Resolves density, screen profile, font scale, extra-large layout and
//! locale overrides for a package from a preference store, and applies
//! them at the host call sites where display, resource configuration and
//! notification values are finalised.

#![forbid(unsafe_code)]

pub mod chokepoints;
pub mod config;
pub mod constants;
pub mod engine;
pub mod gate;
pub mod host;
pub mod locale;
pub mod merger;
pub mod prefs;
pub mod resolver;
pub mod screen;

#[cfg(test)]
mod test_utils;

pub use engine::{Engine, InstallReport};
pub use resolver::OverrideRecord;
