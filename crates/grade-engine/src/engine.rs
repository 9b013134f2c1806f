//! The grading engine.
//!
//! [`GradingEngine`] owns everything a request needs: the sampler selector
//! (and through it the device context), the preset registry, the worker
//! pool and the optional store/entitlement collaborators. The host builds
//! one at startup and shares it.

use std::borrow::Cow;
use std::sync::Arc;

use grade_compute::{BatchPlan, BatchScheduler, ComputeImage, Engine, SamplerSelector, WorkerPool};
use grade_io::{ImageData, OutputFormat};
use grade_lut::{LutError, LutRegistry, LutVolume};
use grade_ops::{AdjustmentSettings, HistogramTransferBuilder, ProceduralLutBuilder, TransferLut};
#[allow(unused_imports)]
use tracing::{debug, info, trace, warn};

use crate::access::{Entitlements, UsageGate};
use crate::matcher::HistogramMatcher;
use crate::store::ObjectStore;
use crate::{BatchReport, EngineConfig, EngineError, EngineResult, Transform};

/// Store prefix of preset `.cube` files.
pub const PRESET_PREFIX: &str = "luts/";
/// Store prefix of cached textures.
pub const TEXTURE_PREFIX: &str = "textures/";

enum Resolved<'a> {
    Volume(Cow<'a, LutVolume>),
    Transfer(&'a TransferLut),
}

/// Color-grading operations over encoded image bytes.
pub struct GradingEngine {
    config: EngineConfig,
    selector: SamplerSelector,
    registry: LutRegistry,
    pool: WorkerPool,
    store: Option<Arc<dyn ObjectStore>>,
    gate: Option<UsageGate>,
}

impl GradingEngine {
    /// Builds an engine, probing for a GPU unless `config.engine` is `cpu`.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let selector = match config.engine {
            Engine::Cpu => SamplerSelector::cpu_only(),
            Engine::Auto | Engine::Gpu => SamplerSelector::detect(),
        };
        Self::with_selector(config, selector)
    }

    /// Builds an engine around a caller-owned sampler selector.
    pub fn with_selector(config: EngineConfig, selector: SamplerSelector) -> EngineResult<Self> {
        config.validate()?;
        let registry = match &config.lut_dir {
            Some(dir) => LutRegistry::load(dir)?,
            None => LutRegistry::new(),
        };
        let pool = WorkerPool::with_threads(config.workers)?;
        info!(
            engine = %config.engine,
            gpu = selector.has_gpu(),
            presets = registry.len(),
            workers = pool.threads(),
            "grading engine ready"
        );
        Ok(Self {
            config,
            selector,
            registry,
            pool,
            store: None,
            gate: None,
        })
    }

    /// Replaces the preset registry.
    pub fn with_registry(mut self, registry: LutRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Attaches an object store for presets and cached textures.
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Gates [`authorize`](Self::authorize) on `entitlements`.
    pub fn with_entitlements(mut self, entitlements: Arc<dyn Entitlements>) -> Self {
        self.gate = Some(UsageGate::new(entitlements));
        self
    }

    /// Replaces the worker pool.
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    /// Validated configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Preset registry consulted before the store.
    pub fn registry(&self) -> &LutRegistry {
        &self.registry
    }

    /// Sampler selection for `auto`/`cpu`/`gpu` requests.
    pub fn selector(&self) -> &SamplerSelector {
        &self.selector
    }

    /// Pool running per-image decode, encode and histogram work.
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Admits `caller`: unlimited when entitled, otherwise one free use.
    ///
    /// Always succeeds when no entitlements are attached.
    pub fn authorize(&self, caller: &str) -> EngineResult<()> {
        match &self.gate {
            Some(gate) => gate.authorize(caller),
            None => Ok(()),
        }
    }

    // === LUT synthesis ===

    /// Parses `.cube` bytes.
    pub fn parse_cube(&self, bytes: &[u8]) -> EngineResult<LutVolume> {
        Ok(grade_lut::parse_cube_bytes(bytes)?)
    }

    /// Renders `mapping` sampled on a `size` grid as `.cube` text.
    pub fn serialize_cube<F>(&self, size: usize, mapping: F) -> String
    where
        F: Fn([f32; 3]) -> [f32; 3],
    {
        grade_lut::serialize_cube(size, mapping)
    }

    /// Synthesizes a volume from slider/curve settings.
    pub fn build_procedural(&self, settings: &AdjustmentSettings) -> EngineResult<LutVolume> {
        Ok(grade_ops::build_procedural(settings)?)
    }

    /// Synthesizes settings straight to downloadable `.cube` text.
    pub fn procedural_cube(&self, settings: &AdjustmentSettings) -> EngineResult<String> {
        Ok(ProceduralLutBuilder::new(settings.clone()).to_cube()?)
    }

    /// Looks up a preset in the registry, then under `luts/<name>.cube` in the store.
    pub fn resolve_preset(&self, name: &str) -> EngineResult<Cow<'_, LutVolume>> {
        if let Some(lut) = self.registry.lookup(name) {
            return Ok(Cow::Borrowed(lut));
        }
        if let Some(store) = &self.store {
            let key = format!("{PRESET_PREFIX}{name}.cube");
            if let Some(bytes) = store.read_bytes(&key)? {
                debug!(name, key, "preset loaded from store");
                return Ok(Cow::Owned(grade_lut::parse_cube_bytes(&bytes)?));
            }
        }
        Err(LutError::LutNotFound(name.to_string()).into())
    }

    fn resolve<'a>(&'a self, transform: &'a Transform) -> EngineResult<Resolved<'a>> {
        Ok(match transform {
            Transform::Volume(volume) => Resolved::Volume(Cow::Borrowed(volume)),
            Transform::Cube(bytes) => Resolved::Volume(Cow::Owned(self.parse_cube(bytes)?)),
            Transform::Preset(name) => Resolved::Volume(self.resolve_preset(name)?),
            Transform::Procedural(settings) => {
                Resolved::Volume(Cow::Owned(self.build_procedural(settings)?))
            }
            Transform::Transfer(lut) => Resolved::Transfer(lut),
        })
    }

    // === Application ===

    /// Decodes, grades and re-encodes one image.
    ///
    /// GPU failures degrade to CPU inside the sampler; only format and
    /// validation errors surface.
    pub fn apply(
        &self,
        image_bytes: &[u8],
        transform: &Transform,
        engine: Engine,
        intensity: f32,
        output: OutputFormat,
    ) -> EngineResult<Vec<u8>> {
        trace!(
            transform = transform.label(),
            %engine,
            intensity,
            len = image_bytes.len(),
            "apply"
        );
        let image = grade_io::decode(image_bytes)?;
        let graded = self.apply_image(&image, transform, engine, intensity)?;
        Ok(grade_io::encode(&graded, output)?)
    }

    /// Grades a decoded image.
    pub fn apply_image(
        &self,
        image: &ImageData,
        transform: &Transform,
        engine: Engine,
        intensity: f32,
    ) -> EngineResult<ImageData> {
        match self.resolve(transform)? {
            Resolved::Volume(volume) => {
                let sampler = self.selector.select(engine)?;
                let mut img = to_compute(image)?;
                sampler.apply(&mut img, &volume, intensity)?;
                debug!(
                    sampler = sampler.name(),
                    width = image.width,
                    height = image.height,
                    size = volume.size(),
                    "image graded"
                );
                from_compute(&img)
            }
            Resolved::Transfer(lut) => apply_transfer(image, lut, intensity),
        }
    }

    /// Grades many images with one transform.
    ///
    /// A transform that fails to resolve fails the call; per-image decode
    /// or encode failures are recorded in the report and the rest continue.
    pub fn apply_batch(
        &self,
        items: &[Vec<u8>],
        transform: &Transform,
        engine: Engine,
        intensity: f32,
        output: OutputFormat,
    ) -> EngineResult<BatchReport> {
        trace!(items = items.len(), transform = transform.label(), %engine, "apply_batch");
        let inputs: Vec<&[u8]> = items.iter().map(Vec::as_slice).collect();

        let results = match self.resolve(transform)? {
            Resolved::Volume(volume) => {
                self.apply_volume_batch(inputs, &volume, engine, intensity, output)?
            }
            Resolved::Transfer(lut) => {
                self.pool.map_ordered(inputs, |bytes| -> EngineResult<Vec<u8>> {
                    let image = grade_io::decode(bytes)?;
                    let graded = apply_transfer(&image, lut, intensity)?;
                    Ok(grade_io::encode(&graded, output)?)
                })
            }
        };

        let report = BatchReport::from_results(results);
        info!(
            items = report.len(),
            succeeded = report.succeeded,
            failed = report.failed(),
            "batch applied"
        );
        Ok(report)
    }

    fn apply_volume_batch(
        &self,
        inputs: Vec<&[u8]>,
        volume: &LutVolume,
        engine: Engine,
        intensity: f32,
        output: OutputFormat,
    ) -> EngineResult<Vec<EngineResult<Vec<u8>>>> {
        let scheduler = self.scheduler(engine)?;

        // plan from headers; pixels are decoded one chunk at a time
        let mut results: Vec<Option<EngineResult<Vec<u8>>>> = Vec::with_capacity(inputs.len());
        let mut slots = Vec::new();
        let mut dims = Vec::new();
        let mut channels = 3;
        for (i, bytes) in inputs.iter().enumerate() {
            match grade_io::probe(bytes) {
                Ok((w, h, c)) => {
                    slots.push(i);
                    dims.push((w, h));
                    channels = channels.max(c);
                    results.push(None);
                }
                Err(e) => results.push(Some(Err(e.into()))),
            }
        }
        let plan = grade_compute::plan_batch(&dims, channels, scheduler.budget());

        let mut decode_failures = Vec::new();
        scheduler.run_planned(
            &plan,
            volume,
            intensity,
            |range| {
                let decoded = self.pool.map_ordered(slots[range.clone()].to_vec(), |i| -> EngineResult<ComputeImage> {
                    to_compute(&grade_io::decode(inputs[i])?)
                });
                range
                    .zip(decoded)
                    .map(|(pos, item)| match item {
                        Ok(image) => Some(image),
                        Err(e) => {
                            decode_failures.push((pos, e));
                            None
                        }
                    })
                    .collect()
            },
            |chunk| {
                let encoded = self.pool.map_ordered(chunk, |(pos, item)| -> (usize, EngineResult<Vec<u8>>) {
                    let bytes = item
                        .map_err(EngineError::from)
                        .and_then(|img| Ok(grade_io::encode(&from_compute(&img)?, output)?));
                    (pos, bytes)
                });
                for (pos, item) in encoded {
                    results[slots[pos]] = Some(item);
                }
            },
        );
        for (pos, e) in decode_failures {
            results[slots[pos]] = Some(Err(e));
        }
        Ok(results.into_iter().flatten().collect())
    }

    // === Scheduling ===

    /// Batch scheduler for `engine`, honoring the configured memory settings.
    pub fn scheduler(&self, engine: Engine) -> EngineResult<BatchScheduler> {
        let sampler = self.selector.select(engine)?;
        let scheduler = BatchScheduler::new(sampler).with_memory_fraction(self.config.memory_fraction);
        Ok(match self.config.device_limits() {
            Some(limits) => scheduler.with_limits(limits),
            None => scheduler,
        })
    }

    /// Plans chunks for images of the given `(width, height)`.
    pub fn plan_batch(&self, dims: &[(u32, u32)], channels: u32, engine: Engine) -> EngineResult<BatchPlan> {
        let budget = self.scheduler(engine)?.budget();
        Ok(grade_compute::plan_batch(dims, channels, budget))
    }

    // === Histogram transfer ===

    /// Prepares histogram matching against an encoded reference image.
    pub fn build_histogram_transfer(&self, reference_bytes: &[u8]) -> EngineResult<HistogramMatcher<'_>> {
        let reference = grade_io::decode(reference_bytes)?;
        Ok(self.histogram_matcher(&reference))
    }

    /// Prepares histogram matching against a decoded reference image.
    pub fn histogram_matcher(&self, reference: &ImageData) -> HistogramMatcher<'_> {
        let builder = HistogramTransferBuilder::new(reference, self.config.working_resolution);
        HistogramMatcher::new(builder, &self.pool, self.config.output_format())
    }

    // === Texture export ===

    /// Flattens `volume` into an `N x N²` PNG tile texture.
    pub fn export_texture(&self, volume: &LutVolume) -> EngineResult<Vec<u8>> {
        let texture = grade_lut::export_texture(volume);
        let image = ImageData::new(texture.width, texture.height, 3, texture.to_rgb8())?;
        Ok(grade_io::encode(&image, OutputFormat::Png)?)
    }

    /// Exports the texture to the store under `textures/<key>.png`.
    ///
    /// An existing object is reused without regenerating it.
    pub fn export_texture_cached(&self, volume: &LutVolume, key: &str) -> EngineResult<String> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| EngineError::Store("no object store configured".into()))?;
        let object = format!("{TEXTURE_PREFIX}{key}.png");
        if store.read_bytes(&object)?.is_some() {
            debug!(key = object, "texture cache hit");
            return Ok(store.url(&object));
        }
        let png = self.export_texture(volume)?;
        let url = store.write_bytes(&object, &png, OutputFormat::Png.content_type())?;
        debug!(key = object, len = png.len(), "texture cached");
        Ok(url)
    }
}

impl std::fmt::Debug for GradingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GradingEngine")
            .field("config", &self.config)
            .field("selector", &self.selector)
            .field("presets", &self.registry.len())
            .field("workers", &self.pool.threads())
            .field("store", &self.store.is_some())
            .field("gate", &self.gate)
            .finish()
    }
}

pub(crate) fn to_compute(image: &ImageData) -> EngineResult<ComputeImage> {
    Ok(ComputeImage::from_f32(image.to_f32(), image.width, image.height, image.channels)?)
}

pub(crate) fn from_compute(image: &ComputeImage) -> EngineResult<ImageData> {
    Ok(ImageData::from_f32(image.width, image.height, image.channels, image.data())?)
}

/// Table lookup on 8-bit data at full intensity, blended in float otherwise.
pub(crate) fn apply_transfer(image: &ImageData, lut: &TransferLut, intensity: f32) -> EngineResult<ImageData> {
    if !(intensity < 1.0) {
        return Ok(lut.apply(image));
    }
    let mut img = to_compute(image)?;
    lut.apply_normalized(&mut img, intensity);
    from_compute(&img)
}
