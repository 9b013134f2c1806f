//! Parametric adjustment model.
//!
//! Every field defaults to its neutral value, so a partial YAML/JSON
//! document only needs the sliders that were moved:
//!
//! ```yaml
//! exposure: 0.3
//! contrast: 1.2
//! curves:
//!   master: [{x: 0, y: 0.05}, {x: 1, y: 0.95}]
//! resolution: 65
//! ```

use grade_lut::SUPPORTED_SIZES;
use serde::Deserialize;

use crate::{OpsError, OpsResult};

/// Default grid size for procedural LUTs.
pub const DEFAULT_RESOLUTION: usize = 33;

/// A curve control point in `[0, 1]²`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CurvePoint {
    /// Input value.
    pub x: f32,
    /// Output value.
    pub y: f32,
}

impl CurvePoint {
    /// Create a new control point.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Per-channel and master curves. Empty curves are the identity.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Curves {
    /// Red curve.
    pub r: Vec<CurvePoint>,
    /// Green curve.
    pub g: Vec<CurvePoint>,
    /// Blue curve.
    pub b: Vec<CurvePoint>,
    /// Applied to all channels after their own curve.
    pub master: Vec<CurvePoint>,
}

/// Primary grading sub-settings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Primaries {
    /// Overrides the top-level gamma when set.
    pub gamma: Option<f32>,
}

/// Slider and curve settings for procedural LUT synthesis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdjustmentSettings {
    /// Exposure in stops (`x * 2^exposure`).
    pub exposure: f32,
    /// Contrast multiplier around mid-gray 0.5.
    pub contrast: f32,
    /// Gamma; channels are raised to `1/gamma`.
    pub gamma: f32,
    /// Hue rotation in degrees.
    pub hue: f32,
    /// Saturation multiplier.
    pub saturation: f32,
    /// Vibrance multiplier, attenuated on already-saturated colors.
    pub vibrance: f32,
    /// Tone curves.
    pub curves: Curves,
    /// Requested grid size, snapped to 17, 33 or 65.
    pub resolution: usize,
    /// Primary grading overrides.
    pub primaries: Option<Primaries>,
}

impl Default for AdjustmentSettings {
    fn default() -> Self {
        Self {
            exposure: 0.0,
            contrast: 1.0,
            gamma: 1.0,
            hue: 0.0,
            saturation: 1.0,
            vibrance: 1.0,
            curves: Curves::default(),
            resolution: DEFAULT_RESOLUTION,
            primaries: None,
        }
    }
}

impl AdjustmentSettings {
    /// Gamma after the primaries override, floored at 0.01.
    pub fn effective_gamma(&self) -> f32 {
        let gamma = self.primaries.and_then(|p| p.gamma).unwrap_or(self.gamma);
        gamma.max(0.01)
    }

    /// Grid size: the supported size closest to `resolution`.
    ///
    /// Ties go to the smaller size.
    pub fn grid_size(&self) -> usize {
        SUPPORTED_SIZES
            .iter()
            .copied()
            .min_by_key(|&s| s.abs_diff(self.resolution))
            .unwrap_or(DEFAULT_RESOLUTION)
    }

    /// Whether hue, saturation and vibrance are all neutral.
    pub fn hsl_is_neutral(&self) -> bool {
        self.hue.rem_euclid(360.0) == 0.0 && self.saturation == 1.0 && self.vibrance == 1.0
    }

    /// Rejects non-finite slider values.
    pub fn validate(&self) -> OpsResult<()> {
        let sliders = [
            ("exposure", self.exposure),
            ("contrast", self.contrast),
            ("gamma", self.effective_gamma()),
            ("hue", self.hue),
            ("saturation", self.saturation),
            ("vibrance", self.vibrance),
        ];
        for (name, value) in sliders {
            if !value.is_finite() {
                return Err(OpsError::InvalidParameter(format!("{name} must be finite, got {value}")));
            }
        }
        let curves = &self.curves;
        for (name, points) in [("r", &curves.r), ("g", &curves.g), ("b", &curves.b), ("master", &curves.master)] {
            if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
                return Err(OpsError::InvalidParameter(format!("curve {name} has a non-finite point")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_uses_neutral_defaults() {
        let s: AdjustmentSettings = serde_yaml::from_str(
            "exposure: 0.5\ncurves:\n  master: [{x: 0, y: 0.1}, {x: 1, y: 0.9}]\n",
        )
        .unwrap();
        assert_eq!(s.exposure, 0.5);
        assert_eq!(s.contrast, 1.0);
        assert_eq!(s.curves.master.len(), 2);
        assert!(s.curves.r.is_empty());
        assert_eq!(s.grid_size(), 33);
    }

    #[test]
    fn resolution_snaps_to_supported() {
        let size = |resolution| AdjustmentSettings { resolution, ..Default::default() }.grid_size();
        assert_eq!(size(0), 17);
        assert_eq!(size(20), 17);
        assert_eq!(size(33), 33);
        assert_eq!(size(50), 65);
        assert_eq!(size(4096), 65);
    }

    #[test]
    fn primaries_gamma_overrides() {
        let s = AdjustmentSettings {
            gamma: 2.0,
            primaries: Some(Primaries { gamma: Some(0.0) }),
            ..Default::default()
        };
        assert_eq!(s.effective_gamma(), 0.01);
    }

    #[test]
    fn nan_rejected() {
        let s = AdjustmentSettings { contrast: f32::NAN, ..Default::default() };
        assert!(matches!(s.validate(), Err(OpsError::InvalidParameter(_))));
    }
}
