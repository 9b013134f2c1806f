//! Memory-bounded batch application.
//!
//! Inputs are split, in order, into contiguous chunks sized from the mean
//! image footprint and a fraction of device memory:
//!
//! ```text
//! bytes_per_image = mean(width * height) * channels * 4
//! batch_size      = max(1, floor(budget / bytes_per_image))
//! ```
//!
//! Inside a chunk every image is zero-padded to the chunk's largest width
//! and height and stacked vertically into one tensor, sampled with a single
//! call, then cropped back to its own size. Device memory is released
//! between chunks.
//!
//! The budget is an estimate, not a bound. The padded tensor is
//! `max_width * max_height * n`, so one large image in a chunk of small
//! ones can exceed it several times over. A stacked tensor whose size does
//! not fit in memory arithmetic fails that chunk with
//! [`ComputeError::ResourceExhausted`].

use std::ops::Range;
use std::sync::Arc;

use grade_lut::LutVolume;
#[allow(unused_imports)]
use tracing::{debug, info, trace};

use crate::memory::{self, BYTES_PER_SAMPLE, format_bytes};
use crate::sampler::Sampler;
use crate::{ComputeError, ComputeImage, ComputeResult, DeviceLimits};

/// Partition of a batch into contiguous chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    /// Input index ranges, in order; together they cover every input once.
    pub chunks: Vec<Range<usize>>,
    /// Images per full chunk (always at least 1).
    pub batch_size: usize,
    /// Memory budget the plan was made for, in bytes.
    pub budget: u64,
    /// Estimated footprint of one image, in bytes.
    pub bytes_per_image: u64,
}

impl BatchPlan {
    /// Number of chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of images covered.
    pub fn image_count(&self) -> usize {
        self.chunks.last().map_or(0, |c| c.end)
    }

    /// Whether the plan covers no images.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Plans chunks for images of the given `(width, height)` under `budget` bytes.
pub fn plan_batch(dims: &[(u32, u32)], channels: u32, budget: u64) -> BatchPlan {
    let count = dims.len();
    let total_pixels: u64 = dims.iter().map(|&(w, h)| w as u64 * h as u64).sum();
    let mean_pixels = if count == 0 { 0 } else { total_pixels / count as u64 };
    let bytes_per_image = mean_pixels * channels as u64 * BYTES_PER_SAMPLE;

    let batch_size = if bytes_per_image == 0 {
        count.max(1)
    } else {
        ((budget / bytes_per_image) as usize).max(1)
    };

    let chunks = (0..count)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(count))
        .collect();

    BatchPlan {
        chunks,
        batch_size,
        budget,
        bytes_per_image,
    }
}

/// Drives a sampler across many images chunk by chunk.
pub struct BatchScheduler {
    sampler: Arc<dyn Sampler>,
    memory_fraction: f64,
    limits: Option<DeviceLimits>,
}

impl BatchScheduler {
    /// Scheduler using the default memory fraction, or `GRADE_MEMORY_FRACTION`.
    pub fn new(sampler: Arc<dyn Sampler>) -> Self {
        Self {
            sampler,
            memory_fraction: memory::memory_fraction_override()
                .unwrap_or(memory::DEFAULT_MEMORY_FRACTION),
            limits: None,
        }
    }

    /// Overrides the share of device memory a chunk may occupy.
    pub fn with_memory_fraction(mut self, fraction: f64) -> Self {
        self.memory_fraction = fraction;
        self
    }

    /// Plans against `limits` instead of the sampler's own.
    pub fn with_limits(mut self, limits: DeviceLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Memory budget per chunk, in bytes.
    pub fn budget(&self) -> u64 {
        self.limits
            .as_ref()
            .unwrap_or_else(|| self.sampler.limits())
            .budget(self.memory_fraction)
    }

    /// Plans chunks for `images`.
    pub fn plan(&self, images: &[ComputeImage]) -> BatchPlan {
        let dims: Vec<(u32, u32)> = images.iter().map(|i| (i.width, i.height)).collect();
        let channels = images.iter().map(|i| i.channels).max().unwrap_or(3);
        plan_batch(&dims, channels, self.budget())
    }

    /// Applies `volume` to every image, returning results in input order.
    ///
    /// A failing chunk fails only its own items.
    pub fn run(
        &self,
        images: Vec<ComputeImage>,
        volume: &LutVolume,
        intensity: f32,
    ) -> Vec<ComputeResult<ComputeImage>> {
        let plan = self.plan(&images);
        let mut pending = images.into_iter();
        let mut results = Vec::with_capacity(plan.image_count());
        self.run_planned(
            &plan,
            volume,
            intensity,
            |range| pending.by_ref().take(range.len()).map(Some).collect(),
            |chunk| results.extend(chunk.into_iter().map(|(_, result)| result)),
        );
        results
    }

    /// Runs `plan`, loading each chunk's images only when it is reached.
    ///
    /// `load` gets the input range of one chunk and returns one slot per
    /// index; `None` slots are skipped. `sink` gets each finished chunk as
    /// `(input index, result)` pairs in order. At most one chunk is resident
    /// at a time.
    pub fn run_planned<L, S>(
        &self,
        plan: &BatchPlan,
        volume: &LutVolume,
        intensity: f32,
        mut load: L,
        mut sink: S,
    ) where
        L: FnMut(Range<usize>) -> Vec<Option<ComputeImage>>,
        S: FnMut(Vec<(usize, ComputeResult<ComputeImage>)>),
    {
        debug!(
            images = plan.image_count(),
            batch_size = plan.batch_size,
            chunks = plan.chunk_count(),
            budget = %format_bytes(plan.budget),
            per_image = %format_bytes(plan.bytes_per_image),
            backend = self.sampler.name(),
            "batch planned"
        );

        let mut graded = 0usize;
        let mut failed = 0usize;
        for chunk in &plan.chunks {
            let mut indices = Vec::with_capacity(chunk.len());
            let mut items = Vec::with_capacity(chunk.len());
            for (index, slot) in chunk.clone().zip(load(chunk.clone())) {
                if let Some(image) = slot {
                    indices.push(index);
                    items.push(image);
                }
            }

            if !items.is_empty() {
                type Finished = Vec<(usize, ComputeResult<ComputeImage>)>;
                let finished: Finished = match self.run_chunk(items, volume, intensity) {
                    Ok(done) => {
                        graded += done.len();
                        indices.into_iter().zip(done.into_iter().map(Ok)).collect()
                    }
                    Err(e) => {
                        let msg = e.to_string();
                        failed += indices.len();
                        indices
                            .into_iter()
                            .map(|index| (index, Err(ComputeError::OperationFailed(msg.clone()))))
                            .collect()
                    }
                };
                sink(finished);
            }
            self.sampler.release();
        }

        info!(graded, failed, "batch complete");
    }

    fn run_chunk(
        &self,
        mut items: Vec<ComputeImage>,
        volume: &LutVolume,
        intensity: f32,
    ) -> ComputeResult<Vec<ComputeImage>> {
        if items.len() == 1 {
            self.sampler.apply(&mut items[0], volume, intensity)?;
            return Ok(items);
        }

        let (mut stacked, cell_h) = stack_padded(&items)?;
        trace!(
            width = stacked.width,
            height = stacked.height,
            items = items.len(),
            "chunk stacked"
        );
        self.sampler.apply(&mut stacked, volume, intensity)?;

        Ok(items
            .iter()
            .enumerate()
            .map(|(i, img)| stacked.crop_rows(i as u32 * cell_h, img.width, img.height, img.channels))
            .collect())
    }
}

/// Pads every image to the largest width/height and stacks them vertically.
///
/// Returns the tensor and the height of one cell.
fn stack_padded(items: &[ComputeImage]) -> ComputeResult<(ComputeImage, u32)> {
    let width = items.iter().map(|i| i.width).max().unwrap_or(0);
    let height = items.iter().map(|i| i.height).max().unwrap_or(0);
    let channels = items.iter().map(|i| i.channels).max().unwrap_or(3);

    let too_large = || {
        ComputeError::ResourceExhausted(format!(
            "{} images of {width}x{height} do not fit one tensor",
            items.len()
        ))
    };
    let total_height = u32::try_from(items.len())
        .ok()
        .and_then(|n| height.checked_mul(n))
        .ok_or_else(too_large)?;
    (width as usize)
        .checked_mul(total_height as usize)
        .and_then(|px| px.checked_mul(channels as usize))
        .ok_or_else(too_large)?;

    let mut stacked = ComputeImage::new(width, total_height, channels);
    for (i, img) in items.iter().enumerate() {
        img.blit_into(&mut stacked, i as u32 * height);
    }
    Ok((stacked, height))
}
