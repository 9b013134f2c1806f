//! Procedural LUT synthesis.
//!
//! Every grid node's normalized coordinate runs through a fixed pipeline:
//!
//! ```text
//! exposure   x * 2^exposure
//! contrast   0.5 + (x - 0.5) * contrast
//! gamma      max(x, 0)^(1/gamma)
//! HSL        hue rotate, saturation * vibrance weighting
//! curves     r/g/b curve, then master curve
//! clamp      [0, 1]
//! ```
//!
//! Nodes are independent, so the grid is evaluated in parallel.

use grade_lut::{LutVolume, node_coord, serialize_cube};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::color::{hsl_to_rgb, rgb_to_hsl};
use crate::{AdjustmentSettings, Curve, OpsResult};

/// Synthesizes a [`LutVolume`] from [`AdjustmentSettings`].
#[derive(Debug, Clone)]
pub struct ProceduralLutBuilder {
    settings: AdjustmentSettings,
    gain: f32,
    inv_gamma: f32,
    hsl_neutral: bool,
    channel_curves: [Curve; 3],
    master: Curve,
}

impl ProceduralLutBuilder {
    /// Prepares the pipeline for `settings`.
    pub fn new(settings: AdjustmentSettings) -> Self {
        let curves = &settings.curves;
        let channel_curves = [Curve::new(&curves.r), Curve::new(&curves.g), Curve::new(&curves.b)];
        let master = Curve::new(&curves.master);
        Self {
            gain: settings.exposure.exp2(),
            inv_gamma: 1.0 / settings.effective_gamma(),
            hsl_neutral: settings.hsl_is_neutral(),
            channel_curves,
            master,
            settings,
        }
    }

    /// The settings this builder evaluates.
    pub fn settings(&self) -> &AdjustmentSettings {
        &self.settings
    }

    /// Grid size of the generated volume.
    pub fn size(&self) -> usize {
        self.settings.grid_size()
    }

    /// Maps one normalized RGB triple through the pipeline.
    pub fn evaluate(&self, rgb: [f32; 3]) -> [f32; 3] {
        let s = &self.settings;
        let mut px = rgb.map(|x| {
            let x = x * self.gain;
            let x = 0.5 + (x - 0.5) * s.contrast;
            if self.inv_gamma == 1.0 { x } else { x.max(0.0).powf(self.inv_gamma) }
        });

        if !self.hsl_neutral {
            let [h, sat, l] = rgb_to_hsl(px.map(|x| x.clamp(0.0, 1.0)));
            let h = (h + s.hue / 360.0).rem_euclid(1.0);
            let sat = (sat * s.saturation * (1.0 + (s.vibrance - 1.0) * (1.0 - sat))).clamp(0.0, 1.0);
            px = hsl_to_rgb([h, sat, l]);
        }

        for (x, curve) in px.iter_mut().zip(&self.channel_curves) {
            *x = curve.eval(*x);
        }
        px.map(|x| self.master.eval(x).clamp(0.0, 1.0))
    }

    /// Evaluates every grid node.
    pub fn build(&self) -> OpsResult<LutVolume> {
        self.settings.validate()?;
        let size = self.size();
        trace!(size, "building procedural LUT");

        let data: Vec<[f32; 3]> = (0..size * size * size)
            .into_par_iter()
            .map(|i| self.evaluate(node_coord(size, i)))
            .collect();

        debug!(size, entries = data.len(), "procedural LUT built");
        Ok(LutVolume::from_data(data, size)?)
    }

    /// Renders the pipeline as `.cube` text for download.
    pub fn to_cube(&self) -> OpsResult<String> {
        self.settings.validate()?;
        Ok(serialize_cube(self.size(), |rgb| self.evaluate(rgb)))
    }
}

/// Builds a procedural LUT in one call.
pub fn build_procedural(settings: &AdjustmentSettings) -> OpsResult<LutVolume> {
    ProceduralLutBuilder::new(settings.clone()).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CurvePoint, Curves};
    use approx::assert_abs_diff_eq;

    #[test]
    fn neutral_settings_build_identity() {
        let lut = build_procedural(&AdjustmentSettings { resolution: 17, ..Default::default() }).unwrap();
        assert_eq!(lut.size(), 17);
        for (i, v) in lut.data().iter().enumerate() {
            let expect = node_coord(17, i);
            for c in 0..3 {
                assert_abs_diff_eq!(v[c], expect[c], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn contrast_pivots_on_mid_gray() {
        let b = ProceduralLutBuilder::new(AdjustmentSettings { contrast: 2.0, ..Default::default() });
        let mid = b.evaluate([128.0 / 255.0; 3]);
        assert!((mid[0] * 255.0 - 128.0).abs() <= 1.5);
        let hi = b.evaluate([0.8; 3]);
        let lo = b.evaluate([0.2; 3]);
        assert!(hi[0] > 0.8);
        assert!(lo[0] < 0.2);
    }

    #[test]
    fn exposure_one_stop_doubles() {
        let b = ProceduralLutBuilder::new(AdjustmentSettings { exposure: 1.0, ..Default::default() });
        assert_abs_diff_eq!(b.evaluate([0.2, 0.3, 0.6])[0], 0.4, epsilon = 1e-6);
        assert_eq!(b.evaluate([0.2, 0.3, 0.6])[2], 1.0);
    }

    #[test]
    fn gamma_brightens_midtones() {
        let b = ProceduralLutBuilder::new(AdjustmentSettings { gamma: 2.0, ..Default::default() });
        assert_abs_diff_eq!(b.evaluate([0.25; 3])[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn zero_saturation_is_gray() {
        let b = ProceduralLutBuilder::new(AdjustmentSettings { saturation: 0.0, ..Default::default() });
        let out = b.evaluate([0.9, 0.2, 0.4]);
        assert_abs_diff_eq!(out[0], out[1], epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], out[2], epsilon = 1e-6);
    }

    #[test]
    fn hue_rotation_cycles_primaries() {
        let b = ProceduralLutBuilder::new(AdjustmentSettings { hue: 120.0, ..Default::default() });
        let out = b.evaluate([1.0, 0.0, 0.0]);
        assert_abs_diff_eq!(out[0], 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(out[1], 1.0, epsilon = 1e-5);
    }

    #[test]
    fn channel_then_master_curve() {
        let settings = AdjustmentSettings {
            curves: Curves {
                r: vec![CurvePoint::new(0.0, 0.0), CurvePoint::new(1.0, 0.5)],
                master: vec![CurvePoint::new(0.0, 0.0), CurvePoint::new(0.5, 1.0), CurvePoint::new(1.0, 1.0)],
                ..Default::default()
            },
            ..Default::default()
        };
        let out = ProceduralLutBuilder::new(settings).evaluate([1.0, 0.25, 0.0]);
        // red: curve 1.0 -> 0.5, master 0.5 -> 1.0
        assert_abs_diff_eq!(out[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(out[2], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn cube_text_parses_back() {
        let b = ProceduralLutBuilder::new(AdjustmentSettings {
            resolution: 17,
            exposure: 0.3,
            ..Default::default()
        });
        let parsed = grade_lut::parse_cube(&b.to_cube().unwrap()).unwrap();
        let built = b.build().unwrap();
        assert_eq!(parsed.size(), 17);
        for (a, b) in parsed.data().iter().zip(built.data()) {
            for c in 0..3 {
                assert_abs_diff_eq!(a[c], b[c], epsilon = 1e-5);
            }
        }
    }
}
