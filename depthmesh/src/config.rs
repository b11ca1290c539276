//! Reconstruction and capture settings
use crate::mesh::PlyFormat;
use serde::{Deserialize, Serialize};
use std::{ops::RangeInclusive, path::PathBuf, time::Duration};

/// Bounds offered for [`ClipRange::near`] in a settings UI
pub const NEAR_CLIP_BOUNDS: RangeInclusive<u32> = 100..=2000;

/// Bounds offered for [`ClipRange::far`] in a settings UI
pub const FAR_CLIP_BOUNDS: RangeInclusive<u32> = 500..=8000;

/// Clip distances, in sensor units (millimeters for most depth cameras)
///
/// A cell is kept when its world-space Z is within `near..=far`.  The mesher
/// uses these values verbatim; if `near > far`, every cell is clipped and the
/// resulting mesh is empty.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipRange {
    /// Nearest kept Z value (inclusive)
    pub near: u32,
    /// Farthest kept Z value (inclusive)
    pub far: u32,
}

impl Default for ClipRange {
    fn default() -> Self {
        Self {
            near: 500,
            far: 800,
        }
    }
}

impl ClipRange {
    /// Builds a new clip range
    pub fn new(near: u32, far: u32) -> Self {
        Self { near, far }
    }

    /// Checks whether the given Z value is inside the range
    #[inline]
    pub fn contains(&self, z: f32) -> bool {
        z >= self.near as f32 && z <= self.far as f32
    }

    /// Clamps each value into its UI bounds
    pub fn clamped(&self) -> Self {
        Self {
            near: self
                .near
                .clamp(*NEAR_CLIP_BOUNDS.start(), *NEAR_CLIP_BOUNDS.end()),
            far: self
                .far
                .clamp(*FAR_CLIP_BOUNDS.start(), *FAR_CLIP_BOUNDS.end()),
        }
    }
}

/// Behavior when a capture completes its countdown with an empty mesh
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyMeshPolicy {
    /// Report the failure and go back to idle
    #[default]
    Idle,

    /// Report the failure, then count down from
    /// [`CaptureConfig::cooldown`] and try to save again
    Retry,
}

/// Settings for the capture countdown and output files
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Countdown value set when a capture is triggered
    pub countdown: u32,

    /// Minimum delay between countdown steps, in milliseconds
    pub step_delay_ms: u64,

    /// Countdown value used after a capture attempt
    pub cooldown: u32,

    /// What to do when the countdown ends on an empty mesh
    pub on_empty_mesh: EmptyMeshPolicy,

    /// Directory in which capture files are written
    pub output_dir: PathBuf,

    /// Prefix for capture file names
    pub file_prefix: String,

    /// Output encoding
    pub format: PlyFormat,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            countdown: 3,
            step_delay_ms: 1000,
            cooldown: 20,
            on_empty_mesh: EmptyMeshPolicy::default(),
            output_dir: PathBuf::from("data"),
            file_prefix: "cloud_".to_owned(),
            format: PlyFormat::default(),
        }
    }
}

impl CaptureConfig {
    /// Returns the countdown step delay
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clip_contains() {
        let c = ClipRange::default();
        assert!(c.contains(500.0));
        assert!(c.contains(800.0));
        assert!(c.contains(650.5));
        assert!(!c.contains(499.9));
        assert!(!c.contains(800.1));

        let inverted = ClipRange::new(800, 500);
        assert!(!inverted.contains(650.0));
    }

    #[test]
    fn test_clip_clamped() {
        let c = ClipRange::new(5, 10_000).clamped();
        assert_eq!(c, ClipRange::new(100, 8000));
        let c = ClipRange::new(700, 900);
        assert_eq!(c.clamped(), c);
    }

    #[test]
    fn test_capture_defaults() {
        let c = CaptureConfig::default();
        assert_eq!(c.countdown, 3);
        assert_eq!(c.step_delay(), Duration::from_secs(1));
        assert_eq!(c.on_empty_mesh, EmptyMeshPolicy::Idle);
        assert_eq!(c.format, PlyFormat::BinaryLittleEndian);
    }
}
