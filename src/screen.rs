//! Screen profile table
//!
//! Fixed set of screen-size presets selectable per package. Index 0 means
//! "leave the screen untouched" and is also where invalid indices land.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScreenProfile {
    pub name: &'static str,
    pub smallest_width_dp: i32,
    pub width_dp: i32,
    pub height_dp: i32,
    pub width_px: i32,
    pub height_px: i32,
}

impl ScreenProfile {
    const fn new(
        name: &'static str,
        smallest_width_dp: i32,
        width_dp: i32,
        height_dp: i32,
        width_px: i32,
        height_px: i32,
    ) -> Self {
        Self {
            name,
            smallest_width_dp,
            width_dp,
            height_dp,
            width_px,
            height_px,
        }
    }

    /// Whether selecting this profile changes the dp dimensions at all
    pub fn overrides_dp(&self) -> bool {
        self.smallest_width_dp > 0
    }

    /// Pixel dimensions, only when the profile defines them
    pub fn pixels(&self) -> Option<(i32, i32)> {
        (self.width_px > 0).then_some((self.width_px, self.height_px))
    }
}

pub const PROFILES: [ScreenProfile; 5] = [
    ScreenProfile::new("Unchanged", 0, 0, 0, 0, 0),
    ScreenProfile::new("Phone (320dp)", 320, 320, 533, 480, 800),
    ScreenProfile::new("Tablet 7\" (600dp)", 600, 600, 1024, 1536, 2048),
    ScreenProfile::new("Tablet 10\" (720dp)", 720, 720, 1280, 1600, 2560),
    // dp only; metrics keep the device's pixel size
    ScreenProfile::new("Large phone (480dp)", 480, 480, 854, 0, 0),
];

/// Clamp a stored index into the table. Out-of-range resets to 0.
pub fn clamp_index(index: i32) -> usize {
    match usize::try_from(index) {
        Ok(i) if i < PROFILES.len() => i,
        _ => 0,
    }
}

/// Profile that actually changes the screen for `index`. None for the
/// "unchanged" entry and for anything outside the table.
pub fn lookup(index: usize) -> Option<&'static ScreenProfile> {
    PROFILES.get(index).filter(|p| p.overrides_dp())
}
