//! End-to-end sampler selection and batch scheduling.

use std::sync::Arc;

use grade_compute::{
    BatchScheduler, ComputeError, ComputeImage, ComputeResult, CpuSampler, DeviceLimits, Engine,
    Sampler, SamplerSelector, WorkerPool, plan_batch,
};
use grade_lut::LutVolume;

/// Sampler that always reports device exhaustion.
struct OutOfMemory(DeviceLimits);

impl Sampler for OutOfMemory {
    fn apply(&self, _: &mut ComputeImage, _: &LutVolume, _: f32) -> ComputeResult<()> {
        Err(ComputeError::ResourceExhausted("simulated".into()))
    }
    fn name(&self) -> &'static str {
        "oom"
    }
    fn limits(&self) -> &DeviceLimits {
        &self.0
    }
}

fn warm() -> LutVolume {
    LutVolume::from_fn(17, |[r, g, b]| [(r * 1.1).min(1.0), g, b * 0.9]).unwrap()
}

#[test]
fn auto_engine_survives_gpu_exhaustion() {
    let selector = SamplerSelector::with_gpu(Arc::new(OutOfMemory(DeviceLimits::with_memory(1 << 20))));
    let sampler = selector.select(Engine::Auto).unwrap();

    let mut img = ComputeImage::from_f32(vec![0.5, 0.5, 0.5], 1, 1, 3).unwrap();
    sampler.apply(&mut img, &warm(), 1.0).unwrap();
    // CPU nearest result: node 8 of 16 is exactly 0.5
    assert!((img.data()[0] - 0.55).abs() < 1e-5);
    assert!((img.data()[2] - 0.45).abs() < 1e-5);
}

#[test]
fn scheduler_through_fallback_keeps_order() {
    let selector = SamplerSelector::with_gpu(Arc::new(OutOfMemory(DeviceLimits::with_memory(64))));
    let scheduler = BatchScheduler::new(selector.select(Engine::Gpu).unwrap()).with_memory_fraction(0.5);

    let images: Vec<ComputeImage> = (1..=6u32)
        .map(|i| ComputeImage::from_f32(vec![i as f32 / 10.0; (i * 3) as usize], i, 1, 3).unwrap())
        .collect();
    let plan = scheduler.plan(&images);
    assert!(plan.chunk_count() > 1);

    let out = scheduler.run(images, &LutVolume::identity(2).unwrap(), 1.0);
    for (i, res) in out.into_iter().enumerate() {
        let img = res.unwrap();
        assert_eq!(img.width, i as u32 + 1);
    }
}

#[test]
fn plan_covers_every_input_for_any_budget() {
    let dims: Vec<(u32, u32)> = (0..23).map(|i| (100 + i * 37, 50 + i * 11)).collect();
    for budget in [1u64, 1_000, 1_000_000, u64::MAX] {
        let plan = plan_batch(&dims, 4, budget);
        assert!(plan.chunks.iter().all(|c| !c.is_empty()));
        let covered: Vec<usize> = plan.chunks.iter().flat_map(|c| c.clone()).collect();
        assert_eq!(covered, (0..23).collect::<Vec<_>>());
    }
}

#[test]
fn pooled_sampling_matches_sequential() {
    let lut = warm();
    let images: Vec<ComputeImage> = (0..8)
        .map(|i| ComputeImage::from_f32(vec![i as f32 / 8.0; 12], 2, 2, 3).unwrap())
        .collect();
    let run = |pool: &WorkerPool| {
        pool.map_ordered(images.clone(), |mut img| {
            CpuSampler::trilinear().apply(&mut img, &lut, 0.7).unwrap();
            img.into_data()
        })
    };
    assert_eq!(run(&WorkerPool::sequential()), run(&WorkerPool::with_threads(4).unwrap()));
}
