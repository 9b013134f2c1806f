//! End-to-end synthesis: procedural volumes through the samplers and
//! histogram transfer on decoded images.

use approx::assert_abs_diff_eq;
use grade_compute::{ComputeImage, CpuSampler, Sampler, WorkerPool};
use grade_io::{ImageData, OutputFormat};
use grade_lut::{LutVolume, parse_cube};
use grade_ops::{AdjustmentSettings, HistogramTransferBuilder, ProceduralLutBuilder};

fn ramp(width: u32) -> ImageData {
    let data = (0..width)
        .flat_map(|x| {
            let v = (x * 255 / (width - 1)) as u8;
            [v, 255 - v, v / 2]
        })
        .collect();
    ImageData::new(width, 1, 3, data).unwrap()
}

#[test]
fn neutral_settings_apply_as_identity() {
    let lut = ProceduralLutBuilder::new(AdjustmentSettings::default()).build().unwrap();
    let src = ramp(64);
    let mut img = ComputeImage::from_f32(src.to_f32(), 64, 1, 3).unwrap();
    CpuSampler::trilinear().apply(&mut img, &lut, 1.0).unwrap();
    let out = ImageData::from_f32(64, 1, 3, img.data()).unwrap();
    assert_eq!(out, src);
}

#[test]
fn serialized_procedural_volume_parses_back() {
    let settings = AdjustmentSettings {
        contrast: 1.3,
        saturation: 0.7,
        resolution: 17,
        ..Default::default()
    };
    let builder = ProceduralLutBuilder::new(settings);
    let text = builder.to_cube().unwrap();
    let parsed: LutVolume = parse_cube(&text).unwrap();
    let built = builder.build().unwrap();
    assert_eq!(parsed.size(), 17);
    for (a, b) in parsed.data().iter().zip(built.data()) {
        for c in 0..3 {
            assert_abs_diff_eq!(a[c], b[c], epsilon = 1e-5);
        }
    }
}

#[test]
fn zero_intensity_leaves_image_untouched() {
    let settings = AdjustmentSettings {
        exposure: 1.0,
        ..Default::default()
    };
    let lut = ProceduralLutBuilder::new(settings).build().unwrap();
    let original = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
    let mut img = ComputeImage::from_f32(original.clone(), 2, 1, 3).unwrap();
    CpuSampler::new().apply(&mut img, &lut, 0.0).unwrap();
    assert_eq!(img.data(), original.as_slice());
}

#[test]
fn png_reference_transfer_survives_encoding() {
    let reference = ramp(256);
    let bytes = grade_io::encode(&reference, OutputFormat::Png).unwrap();
    let decoded = grade_io::decode(&bytes).unwrap();
    assert_eq!(decoded, reference);

    let builder = HistogramTransferBuilder::with_reference(&decoded);
    let sources = vec![ramp(256), ramp(32)];
    let matched = builder.apply_batch(sources.clone(), &WorkerPool::with_threads(2).unwrap());
    assert_eq!(matched.len(), 2);
    assert_eq!(matched[0], sources[0]);
    assert_eq!(matched[1].width, 32);
}
