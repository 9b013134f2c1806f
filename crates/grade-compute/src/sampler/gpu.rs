//! wgpu sampler.
//!
//! [`DeviceContext`] owns the device and queue; callers construct it once
//! and share it through `Arc`. [`GpuSampler`] compiles the LUT pipeline on
//! that context and processes images in row bands sized to the device's
//! storage binding limit.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use grade_lut::LutVolume;
use tracing::{debug, trace};
use wgpu::util::DeviceExt;

use super::{Sampler, clamp_intensity};
use crate::memory::format_bytes;
use crate::shaders;
use crate::{ComputeError, ComputeImage, ComputeResult, DeviceLimits};

/// Uniform block shared with the LUT shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct LutParams {
    dims: [u32; 4],
    domain_min: [f32; 4],
    domain_max: [f32; 4],
}

/// Owned GPU device and queue.
pub struct DeviceContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_info: wgpu::AdapterInfo,
    max_workgroups: u32,
    limits: DeviceLimits,
}

impl DeviceContext {
    /// Create a context on the high-performance adapter.
    pub fn new() -> ComputeResult<Self> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> ComputeResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ComputeError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        let adapter_limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("grade_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter_limits.clone(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| ComputeError::DeviceCreation(e.to_string()))?;

        let limits = DeviceLimits::from_wgpu(&adapter_limits, &adapter_info);
        debug!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            memory = %format_bytes(limits.total_memory),
            max_buffer = %format_bytes(limits.max_buffer_bytes),
            "GPU device created"
        );

        Ok(Self {
            device,
            queue,
            adapter_info,
            max_workgroups: adapter_limits.max_compute_workgroups_per_dimension.max(1),
            limits,
        })
    }

    /// Name of the first usable adapter, if any.
    pub fn probe() -> Option<String> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .map(|a| a.get_info().name)
        })
    }

    /// Get device name.
    pub fn device_name(&self) -> &str {
        &self.adapter_info.name
    }

    /// Get backend type (Vulkan, DX12, Metal, etc.)
    pub fn backend(&self) -> wgpu::Backend {
        self.adapter_info.backend
    }

    /// Detected device limits.
    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    /// Runs `f` inside OOM and validation error scopes.
    fn scoped<T>(&self, f: impl FnOnce() -> T) -> ComputeResult<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let out = f();
        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());
        if let Some(e) = oom {
            return Err(ComputeError::ResourceExhausted(e.to_string()));
        }
        if let Some(e) = validation {
            return Err(ComputeError::OperationFailed(e.to_string()));
        }
        Ok(out)
    }
}

impl std::fmt::Debug for DeviceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceContext")
            .field("adapter", &self.adapter_info.name)
            .field("limits", &self.limits)
            .finish()
    }
}

/// Trilinear LUT sampler on a wgpu device.
pub struct GpuSampler {
    ctx: Arc<DeviceContext>,
    pipeline: wgpu::ComputePipeline,
}

impl GpuSampler {
    /// Compiles the LUT pipeline on `ctx`.
    pub fn new(ctx: Arc<DeviceContext>) -> ComputeResult<Self> {
        let pipeline = ctx.scoped(|| {
            let module = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("lut3d_shader"),
                source: wgpu::ShaderSource::Wgsl(shaders::LUT3D.into()),
            });
            ctx.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("lut3d_pipeline"),
                layout: None,
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        })?;
        Ok(Self { ctx, pipeline })
    }

    /// The device context.
    pub fn context(&self) -> &Arc<DeviceContext> {
        &self.ctx
    }

    /// Samples one band of rows, returning its output samples.
    fn run_band(&self, band: &[f32], width: u32, rows: u32, channels: u32, params: LutParams, lut_buf: &wgpu::Buffer) -> ComputeResult<Vec<f32>> {
        let device = &self.ctx.device;
        let size = (band.len() * 4) as u64;

        let (dst, staging) = self.ctx.scoped(|| {
            let src = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("image_buffer"),
                contents: bytemuck::cast_slice(band),
                usage: wgpu::BufferUsages::STORAGE,
            });
            let dst = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("output_buffer"),
                size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });
            let staging = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("staging_buffer"),
                size,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });
            let mut uniform = params;
            uniform.dims = [width, rows, channels, params.dims[3]];
            let params_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("lut_params"),
                contents: bytemuck::bytes_of(&uniform),
                usage: wgpu::BufferUsages::UNIFORM,
            });

            let layout = self.pipeline.get_bind_group_layout(0);
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("lut3d_bind_group"),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: src.as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 1, resource: dst.as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 2, resource: params_buf.as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 3, resource: lut_buf.as_entire_binding() },
                ],
            });

            let groups = (width * rows).div_ceil(256);
            let gx = groups.min(self.ctx.max_workgroups);
            let gy = groups.div_ceil(gx);

            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lut3d_encoder"),
            });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("lut3d_pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(gx, gy, 1);
            }
            encoder.copy_buffer_to_buffer(&dst, 0, &staging, 0, size);
            self.ctx.queue.submit(std::iter::once(encoder.finish()));
            (dst, staging)
        })?;

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| ComputeError::OperationFailed("map channel closed".into()))?
            .map_err(|e| ComputeError::OperationFailed(format!("map failed: {e}")))?;

        let mapped = slice.get_mapped_range();
        let out: Vec<f32> = bytemuck::cast_slice(&mapped).to_vec();
        drop(mapped);
        staging.unmap();
        drop(dst);
        Ok(out)
    }
}

impl Sampler for GpuSampler {
    fn apply(&self, image: &mut ComputeImage, volume: &LutVolume, intensity: f32) -> ComputeResult<()> {
        let (w, h, c) = image.dimensions();
        if w == 0 || h == 0 {
            return Ok(());
        }
        let limits = &self.ctx.limits;
        let lut = volume.to_flat();
        let lut_bytes = (lut.len() * 4) as u64;
        let row_bytes = (w as u64) * (c as u64) * 4;
        if lut_bytes > limits.max_buffer_bytes || row_bytes > limits.max_buffer_bytes {
            return Err(ComputeError::ResourceExhausted(format!(
                "row of {} or LUT of {} exceeds buffer limit {}",
                format_bytes(row_bytes),
                format_bytes(lut_bytes),
                format_bytes(limits.max_buffer_bytes)
            )));
        }
        let max_rows = ((limits.max_buffer_bytes / row_bytes) as u32).clamp(1, h);
        trace!(width = w, height = h, band_rows = max_rows, lut_size = volume.size(), "gpu sample");

        let lut_buf = self.ctx.scoped(|| {
            self.ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("lut3d_buffer"),
                contents: bytemuck::cast_slice(&lut),
                usage: wgpu::BufferUsages::STORAGE,
            })
        })?;

        let params = LutParams {
            dims: [w, h, c, volume.size() as u32],
            domain_min: [
                volume.domain_min[0],
                volume.domain_min[1],
                volume.domain_min[2],
                clamp_intensity(intensity),
            ],
            domain_max: [volume.domain_max[0], volume.domain_max[1], volume.domain_max[2], 0.0],
        };

        let row_len = (w * c) as usize;
        let mut output = Vec::with_capacity(image.data.len());
        let mut y = 0u32;
        while y < h {
            let rows = max_rows.min(h - y);
            let start = y as usize * row_len;
            let band = &image.data[start..start + rows as usize * row_len];
            output.extend(self.run_band(band, w, rows, c, params, &lut_buf)?);
            y += rows;
        }

        image.data = output;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "gpu"
    }

    fn limits(&self) -> &DeviceLimits {
        &self.ctx.limits
    }

    fn release(&self) {
        self.ctx.device.poll(wgpu::Maintain::Wait);
    }
}
