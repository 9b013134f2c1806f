//! RGB <-> HSL conversion.
//!
//! All components are in `[0, 1]`; hue is a fraction of a full turn.

/// RGB to HSL.
pub fn rgb_to_hsl([r, g, b]: [f32; 3]) -> [f32; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    let d = max - min;
    if d < 1e-6 {
        return [0.0, 0.0, l];
    }

    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    let h = if max == r {
        let h = (g - b) / d;
        if h < 0.0 { h + 6.0 } else { h }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    [h / 6.0, s, l]
}

/// HSL to RGB.
pub fn hsl_to_rgb([h, s, l]: [f32; 3]) -> [f32; 3] {
    if s < 1e-6 {
        return [l, l, l];
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    [
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0),
    ]
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn primaries() {
        assert_abs_diff_eq!(rgb_to_hsl([1.0, 0.0, 0.0])[0], 0.0);
        assert_abs_diff_eq!(rgb_to_hsl([0.0, 1.0, 0.0])[0], 1.0 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(rgb_to_hsl([0.0, 0.0, 1.0])[0], 2.0 / 3.0, epsilon = 1e-6);
        assert_eq!(rgb_to_hsl([0.4, 0.4, 0.4]), [0.0, 0.0, 0.4]);
    }

    #[test]
    fn roundtrip() {
        for rgb in [[0.2, 0.5, 0.9], [0.9, 0.1, 0.3], [0.6, 0.6, 0.1], [1.0, 1.0, 1.0]] {
            let back = hsl_to_rgb(rgb_to_hsl(rgb));
            for c in 0..3 {
                assert_abs_diff_eq!(back[c], rgb[c], epsilon = 1e-5);
            }
        }
    }
}
