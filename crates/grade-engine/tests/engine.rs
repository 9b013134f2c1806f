//! Engine operations over encoded bytes, CPU only.

use std::sync::Arc;

use grade_compute::{CpuSampler, Engine, SamplerSelector};
use grade_engine::{
    EngineConfig, EngineError, EntitledSet, GradingEngine, MemoryStore, ObjectStore, Transform,
};
use grade_io::{ImageData, OutputFormat};
use grade_lut::{LutRegistry, LutVolume};
use grade_ops::AdjustmentSettings;

const RED_CUBE: &str = "TITLE \"corners\"\n\
LUT_3D_SIZE 2\n\
DOMAIN_MIN 0 0 0\n\
DOMAIN_MAX 1 1 1\n\
0 0 0\n1 0 0\n0 1 0\n1 1 0\n0 0 1\n1 0 1\n0 1 1\n1 1 1\n";

fn config() -> EngineConfig {
    EngineConfig {
        workers: 1,
        ..Default::default()
    }
}

fn cpu_engine() -> GradingEngine {
    GradingEngine::with_selector(config(), SamplerSelector::cpu_only()).unwrap()
}

/// Engine whose accelerated path is a trilinear CPU sampler.
fn trilinear_engine() -> GradingEngine {
    let selector = SamplerSelector::with_gpu(Arc::new(CpuSampler::trilinear()));
    GradingEngine::with_selector(config(), selector).unwrap()
}

fn png(image: &ImageData) -> Vec<u8> {
    grade_io::encode(image, OutputFormat::Png).unwrap()
}

fn gradient(w: u32, h: u32) -> ImageData {
    let mut data = Vec::with_capacity((w * h * 3) as usize);
    for y in 0..h {
        for x in 0..w {
            data.extend_from_slice(&[(x * 255 / w.max(2)) as u8, (y * 255 / h.max(2)) as u8, 90]);
        }
    }
    ImageData::new(w, h, 3, data).unwrap()
}

#[test]
fn pure_red_through_corner_cube() {
    let engine = cpu_engine();
    let red = ImageData::new(1, 1, 3, vec![255, 0, 0]).unwrap();
    let out = engine
        .apply(
            &png(&red),
            &Transform::Cube(RED_CUBE.as_bytes().to_vec()),
            Engine::Cpu,
            1.0,
            OutputFormat::Png,
        )
        .unwrap();
    assert_eq!(grade_io::decode(&out).unwrap().data, vec![255, 0, 0]);
}

#[test]
fn neutral_procedural_is_identity_on_trilinear_path() {
    let engine = trilinear_engine();
    let image = gradient(40, 30);
    let out = engine
        .apply(
            &png(&image),
            &Transform::Procedural(AdjustmentSettings::default()),
            Engine::Auto,
            1.0,
            OutputFormat::Png,
        )
        .unwrap();
    assert_eq!(grade_io::decode(&out).unwrap(), image);
}

#[test]
fn zero_intensity_returns_input() {
    let engine = cpu_engine();
    let image = gradient(8, 8);
    let settings = AdjustmentSettings {
        contrast: 2.0,
        ..Default::default()
    };
    let out = engine
        .apply(&png(&image), &Transform::from(settings), Engine::Cpu, 0.0, OutputFormat::Png)
        .unwrap();
    assert_eq!(grade_io::decode(&out).unwrap(), image);
}

#[test]
fn empty_upload_is_reported() {
    let engine = cpu_engine();
    let err = engine
        .apply(&[], &Transform::Volume(LutVolume::identity(2).unwrap()), Engine::Cpu, 1.0, OutputFormat::Png)
        .unwrap_err();
    assert_eq!(err.kind(), "EmptyInput");
}

#[test]
fn unknown_engine_name() {
    let err = EngineError::from(Engine::parse("cuda").unwrap_err());
    assert_eq!(err.kind(), "UnsupportedEngine");
}

#[cfg(not(feature = "gpu"))]
#[test]
fn gpu_request_without_gpu_support() {
    let engine = cpu_engine();
    let err = engine
        .apply(
            &png(&gradient(2, 2)),
            &Transform::Volume(LutVolume::identity(2).unwrap()),
            Engine::Gpu,
            1.0,
            OutputFormat::Png,
        )
        .unwrap_err();
    assert_eq!(err.kind(), "UnsupportedEngine");
}

#[test]
fn rgba_keeps_alpha_in_png_and_drops_it_in_jpeg() {
    let engine = cpu_engine();
    let image = ImageData::new(2, 1, 4, vec![10, 20, 30, 40, 200, 150, 100, 250]).unwrap();
    let transform = Transform::Volume(LutVolume::identity(17).unwrap());

    let out = engine.apply(&png(&image), &transform, Engine::Cpu, 1.0, OutputFormat::Png).unwrap();
    let decoded = grade_io::decode(&out).unwrap();
    assert_eq!(decoded.channels, 4);
    assert_eq!(decoded.data[3], 40);
    assert_eq!(decoded.data[7], 250);

    let out = engine
        .apply(&png(&image), &transform, Engine::Cpu, 1.0, OutputFormat::Jpeg { quality: 95 })
        .unwrap();
    assert_eq!(grade_io::decode(&out).unwrap().channels, 3);
}

#[test]
fn presets_from_registry_and_store() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Corners.cube"), RED_CUBE).unwrap();
    let registry = LutRegistry::load(dir.path()).unwrap();

    let store = Arc::new(MemoryStore::new());
    let invert = grade_lut::serialize_cube(2, |[r, g, b]| [1.0 - r, 1.0 - g, 1.0 - b]);
    store.write_bytes("luts/Invert.cube", invert.as_bytes(), "text/plain").unwrap();

    let engine = cpu_engine().with_registry(registry).with_store(store);
    assert_eq!(engine.resolve_preset("Corners").unwrap().size(), 2);

    let black = ImageData::new(1, 1, 3, vec![0, 0, 0]).unwrap();
    let out = engine
        .apply(&png(&black), &Transform::Preset("Invert".into()), Engine::Cpu, 1.0, OutputFormat::Png)
        .unwrap();
    assert_eq!(grade_io::decode(&out).unwrap().data, vec![255, 255, 255]);

    let err = engine.resolve_preset("Missing").unwrap_err();
    assert_eq!(err.kind(), "LutNotFound");
}

#[test]
fn config_lut_dir_loads_registry() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Corners.cube"), RED_CUBE).unwrap();
    let config = EngineConfig {
        lut_dir: Some(dir.path().to_path_buf()),
        ..config()
    };
    let engine = GradingEngine::with_selector(config, SamplerSelector::cpu_only()).unwrap();
    assert_eq!(engine.registry().names().collect::<Vec<_>>(), vec!["Corners"]);
}

#[test]
fn batch_reports_every_item_in_order() {
    let engine = cpu_engine();
    let items = vec![
        png(&gradient(16, 9)),
        Vec::new(),
        b"not an image".to_vec(),
        png(&ImageData::new(3, 5, 4, vec![128; 60]).unwrap()),
        grade_io::encode(&gradient(7, 7), OutputFormat::default()).unwrap(),
    ];
    let transform = Transform::Volume(LutVolume::from_fn(5, |[r, g, b]| [1.0 - r, 1.0 - g, 1.0 - b]).unwrap());
    let report = engine
        .apply_batch(&items, &transform, Engine::Cpu, 1.0, OutputFormat::Png)
        .unwrap();

    assert_eq!(report.len(), 5);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed(), 2);
    for (i, item) in report.items.iter().enumerate() {
        assert_eq!(item.item, i);
    }
    assert_eq!(report.items[1].kind, Some("EmptyInput"));
    assert_eq!(report.items[2].kind, Some("UnsupportedFormat"));

    let dims: Vec<(u32, u32, u32)> = [0, 3, 4]
        .iter()
        .map(|&i| {
            let img = grade_io::decode(report.items[i].output.as_ref().unwrap()).unwrap();
            (img.width, img.height, img.channels)
        })
        .collect();
    assert_eq!(dims, vec![(16, 9, 3), (3, 5, 4), (7, 7, 3)]);

    // mid-gray sits on the center node, alpha untouched
    let rgba = grade_io::decode(report.items[3].output.as_ref().unwrap()).unwrap();
    assert_eq!(&rgba.data[..4], &[128, 128, 128, 128]);
}

#[test]
fn chunked_batch_reports_late_decode_failures() {
    let config = EngineConfig {
        gpu_memory_mb: Some(1),
        memory_fraction: 0.5,
        ..config()
    };
    let engine = GradingEngine::with_selector(config, SamplerSelector::cpu_only()).unwrap();
    let good = png(&gradient(200, 200));
    // header intact, pixel stream cut short
    let truncated = good[..good.len() - 20].to_vec();
    assert_eq!(grade_io::probe(&truncated).unwrap(), (200, 200, 3));

    let items = vec![good.clone(), truncated, good.clone(), good];
    let plan = engine.plan_batch(&[(200, 200); 4], 3, Engine::Cpu).unwrap();
    assert_eq!(plan.batch_size, 1);

    let identity = Transform::Volume(LutVolume::identity(2).unwrap());
    let report = engine
        .apply_batch(&items, &identity, Engine::Cpu, 1.0, OutputFormat::Png)
        .unwrap();
    assert_eq!(report.len(), 4);
    assert_eq!(report.succeeded, 3);
    assert!(!report.items[1].ok);
    assert_eq!(report.items[1].kind, Some("InvalidImage"));
    let single = engine
        .apply(&items[0], &identity, Engine::Cpu, 1.0, OutputFormat::Png)
        .unwrap();
    for i in [0, 2, 3] {
        assert_eq!(report.items[i].output.as_ref(), Some(&single));
    }
}

#[test]
fn batch_with_malformed_transform_fails_whole_call() {
    let engine = cpu_engine();
    let items = vec![png(&gradient(4, 4))];
    let err = engine
        .apply_batch(
            &items,
            &Transform::Cube(b"LUT_3D_SIZE 3\n0 0 0\n".to_vec()),
            Engine::Cpu,
            1.0,
            OutputFormat::Png,
        )
        .unwrap_err();
    assert_eq!(err.kind(), "MalformedLutFormat");
}

#[test]
fn histogram_self_match_and_batch() {
    let engine = cpu_engine();
    let reference = gradient(64, 32);
    let matcher = engine
        .build_histogram_transfer(&png(&reference))
        .unwrap()
        .with_output(OutputFormat::Png);

    let out = matcher.apply_to(&png(&reference)).unwrap();
    assert_eq!(grade_io::decode(&out).unwrap(), reference);
    let blue = *matcher.transfer_for(&png(&reference)).unwrap().table(2);
    assert!(blue.iter().enumerate().all(|(i, &v)| v as usize == i));

    let report = matcher.match_batch(&[png(&gradient(10, 10)), Vec::new()]);
    assert_eq!(report.succeeded, 1);
    assert!(!report.items[1].ok);
}

#[test]
fn transfer_transform_in_batch() {
    let engine = cpu_engine();
    let reference = gradient(32, 32);
    let lut = engine.histogram_matcher(&reference).builder().build(&reference);
    let report = engine
        .apply_batch(&[png(&reference)], &Transform::Transfer(lut), Engine::Cpu, 1.0, OutputFormat::Png)
        .unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(grade_io::decode(report.items[0].output.as_ref().unwrap()).unwrap(), reference);
}

#[test]
fn texture_export_and_cache() {
    let lut = LutVolume::identity(17).unwrap();
    let engine = cpu_engine();
    let texture = grade_io::decode(&engine.export_texture(&lut).unwrap()).unwrap();
    assert_eq!((texture.width, texture.height, texture.channels), (289, 17, 3));

    assert_eq!(engine.export_texture_cached(&lut, "id17").unwrap_err().kind(), "StoreError");

    let store = Arc::new(MemoryStore::new());
    let engine = cpu_engine().with_store(store.clone());
    let first = engine.export_texture_cached(&lut, "id17").unwrap();
    let second = engine.export_texture_cached(&lut, "id17").unwrap();
    assert_eq!(first, "memory://textures/id17.png");
    assert_eq!(first, second);
    assert_eq!(store.len(), 1);
    assert_eq!(store.content_type("textures/id17.png").as_deref(), Some("image/png"));
}

#[test]
fn plan_uses_configured_device_memory() {
    let config = EngineConfig {
        gpu_memory_mb: Some(1),
        memory_fraction: 0.5,
        ..config()
    };
    let engine = GradingEngine::with_selector(config, SamplerSelector::cpu_only()).unwrap();
    // 100*100*3*4 = 120_000 bytes per image, budget 524_288
    let plan = engine.plan_batch(&[(100, 100); 10], 3, Engine::Cpu).unwrap();
    assert_eq!(plan.batch_size, 4);
    assert_eq!(plan.chunk_count(), 3);

    let plan = engine.plan_batch(&[(8000, 8000); 3], 3, Engine::Cpu).unwrap();
    assert_eq!(plan.batch_size, 1);
    assert_eq!(plan.image_count(), 3);
}

#[test]
fn entitlements_gate_usage() {
    let engine = cpu_engine().with_entitlements(Arc::new(EntitledSet::new(["studio"])));
    engine.authorize("studio").unwrap();
    engine.authorize("studio").unwrap();
    engine.authorize("guest").unwrap();
    assert_eq!(engine.authorize("guest").unwrap_err().kind(), "NotEntitled");

    cpu_engine().authorize("anyone").unwrap();
}

#[test]
fn procedural_cube_text_round_trips() {
    let engine = cpu_engine();
    let settings = AdjustmentSettings {
        hue: 30.0,
        resolution: 17,
        ..Default::default()
    };
    let text = engine.procedural_cube(&settings).unwrap();
    let parsed = engine.parse_cube(text.as_bytes()).unwrap();
    let built = engine.build_procedural(&settings).unwrap();
    assert_eq!(parsed.size(), built.size());
    for (a, b) in parsed.data().iter().zip(built.data()) {
        for c in 0..3 {
            approx::assert_abs_diff_eq!(a[c], b[c], epsilon = 1e-5);
        }
    }
}
