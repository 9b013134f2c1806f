//! Adobe/Resolve .cube LUT format support.
//!
//! The .cube format is a simple text-based LUT format widely supported
//! by DaVinci Resolve, Adobe applications, and many other tools.
//!
//! # Format
//!
//! ```text
//! # Comment
//! TITLE "LUT Name"
//! LUT_3D_SIZE 33
//! DOMAIN_MIN 0.0 0.0 0.0
//! DOMAIN_MAX 1.0 1.0 1.0
//! 0.0 0.0 0.0
//! ...
//! 1.0 1.0 1.0
//! ```
//!
//! Data rows follow [`AXIS_ORDER`](crate::AXIS_ORDER): red varies fastest,
//! then green, then blue. Row `i` therefore lands directly at flat index `i`
//! of the volume.
//!
//! When `LUT_3D_SIZE` is missing the size is inferred from the row count if
//! it is a perfect cube.

use crate::{LutError, LutResult, LutVolume, grid_entries};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Reads a 3D LUT from a .cube file.
pub fn read_cube<P: AsRef<Path>>(path: P) -> LutResult<LutVolume> {
    let bytes = fs::read(path.as_ref())?;
    parse_cube_bytes(&bytes)
}

/// Writes a volume to a .cube file.
pub fn write_cube<P: AsRef<Path>>(path: P, lut: &LutVolume) -> LutResult<()> {
    fs::write(path.as_ref(), serialize_volume(lut))?;
    Ok(())
}

/// Parses a 3D LUT from raw uploaded bytes.
pub fn parse_cube_bytes(bytes: &[u8]) -> LutResult<LutVolume> {
    if bytes.is_empty() {
        return Err(LutError::EmptyInput);
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|e| LutError::malformed(format!("not UTF-8 text: {e}")))?;
    parse_cube(text)
}

/// Parses a 3D LUT from `.cube` text.
///
/// # Example
///
/// ```rust
/// let text = "LUT_3D_SIZE 2\n\
///     0 0 0\n1 0 0\n0 1 0\n1 1 0\n0 0 1\n1 0 1\n0 1 1\n1 1 1\n";
/// let lut = grade_lut::parse_cube(text).unwrap();
/// assert_eq!(lut.get(1, 0, 0), [1.0, 0.0, 0.0]);
/// ```
pub fn parse_cube(text: &str) -> LutResult<LutVolume> {
    let mut size: Option<usize> = None;
    let mut domain_min = [0.0_f32; 3];
    let mut domain_max = [1.0_f32; 3];
    let mut data: Vec<[f32; 3]> = Vec::new();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with("TITLE") {
            continue;
        } else if line.starts_with("LUT_3D_SIZE") {
            size = Some(parse_size(line)?);
        } else if line.starts_with("LUT_1D_SIZE") {
            return Err(LutError::malformed("expected 3D LUT, found 1D"));
        } else if line.starts_with("DOMAIN_MIN") {
            domain_min = parse_keyword_triplet(line)?;
        } else if line.starts_with("DOMAIN_MAX") {
            domain_max = parse_keyword_triplet(line)?;
        } else if line.starts_with("LUT_3D_INPUT_RANGE") {
            // Resolve shorthand: one min/max pair for all channels
            let [lo, hi] = parse_range(line)?;
            domain_min = [lo; 3];
            domain_max = [hi; 3];
        } else {
            data.push(parse_row(line, lineno + 1)?);
        }
    }

    let size = match size {
        Some(n) => n,
        None => infer_size(data.len()).ok_or_else(|| {
            LutError::malformed(format!(
                "missing LUT_3D_SIZE and {} rows is not a perfect cube",
                data.len()
            ))
        })?,
    };
    let expected = grid_entries(size)?;
    if data.len() != expected {
        return Err(LutError::malformed(format!(
            "expected {} rows, found {}",
            expected,
            data.len()
        )));
    }

    LutVolume::from_data(data, size)?.with_domain(domain_min, domain_max)
}

/// Serializes a mapping function as `.cube` text over a unit domain.
///
/// `mapping` receives the normalized coordinate of every node in
/// [`AXIS_ORDER`](crate::AXIS_ORDER) and returns its output triple.
pub fn serialize_cube<F>(size: usize, mapping: F) -> String
where
    F: Fn([f32; 3]) -> [f32; 3],
{
    let mut out = header(size, [0.0; 3], [1.0; 3]);
    let n = (size.max(2) - 1) as f32;
    for b in 0..size {
        for g in 0..size {
            for r in 0..size {
                let rgb = mapping([r as f32 / n, g as f32 / n, b as f32 / n]);
                push_row(&mut out, rgb);
            }
        }
    }
    out
}

/// Serializes a volume (including its domain) as `.cube` text.
pub fn serialize_volume(lut: &LutVolume) -> String {
    let mut out = header(lut.size(), lut.domain_min, lut.domain_max);
    for rgb in lut.data() {
        push_row(&mut out, *rgb);
    }
    out
}

fn header(size: usize, min: [f32; 3], max: [f32; 3]) -> String {
    let rows = grid_entries(size).unwrap_or(0);
    let mut out = String::with_capacity(rows * 28 + 128);
    out.push_str("# Generated by grade-lut\n");
    let _ = writeln!(out, "LUT_3D_SIZE {size}");
    let _ = writeln!(out, "DOMAIN_MIN {} {} {}", min[0], min[1], min[2]);
    let _ = writeln!(out, "DOMAIN_MAX {} {} {}", max[0], max[1], max[2]);
    out.push('\n');
    out
}

#[inline]
fn push_row(out: &mut String, rgb: [f32; 3]) {
    let _ = writeln!(out, "{:.6} {:.6} {:.6}", rgb[0], rgb[1], rgb[2]);
}

/// Integer cube root when `rows` is a perfect cube.
fn infer_size(rows: usize) -> Option<usize> {
    if rows == 0 {
        return None;
    }
    let guess = (rows as f64).cbrt().round() as usize;
    (guess.saturating_sub(1)..=guess + 1).find(|n| n * n * n == rows)
}

// Helper functions

fn parse_size(line: &str) -> LutResult<usize> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(LutError::malformed(format!("invalid size line: {line}")));
    }
    parts[1]
        .parse()
        .map_err(|_| LutError::malformed(format!("invalid size value: {}", parts[1])))
}

fn parse_keyword_triplet(line: &str) -> LutResult<[f32; 3]> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 4 {
        return Err(LutError::malformed(format!("invalid domain line: {line}")));
    }
    Ok([parse_float(parts[1])?, parse_float(parts[2])?, parse_float(parts[3])?])
}

fn parse_range(line: &str) -> LutResult<[f32; 2]> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(LutError::malformed(format!("invalid input range line: {line}")));
    }
    Ok([parse_float(parts[1])?, parse_float(parts[2])?])
}

fn parse_row(line: &str, lineno: usize) -> LutResult<[f32; 3]> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(LutError::malformed(format!(
            "line {lineno}: expected 3 values, found {}",
            parts.len()
        )));
    }
    Ok([parse_float(parts[0])?, parse_float(parts[1])?, parse_float(parts[2])?])
}

fn parse_float(s: &str) -> LutResult<f32> {
    s.parse()
        .map_err(|_| LutError::malformed(format!("invalid number: {s}")))
}
