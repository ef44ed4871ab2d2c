//! Accelerator path for the batched induction passes via wgpu compute.
//!
//! Flat source arrays in, induced velocities out, one output per
//! evaluation point; ground mirrors are already replicated in the
//! arrays by the caller. Construction fails cleanly when no GPU adapter
//! is available and callers fall back to the CPU parallel-for.

use bytemuck::{Pod, Zeroable};
use std::borrow::Cow;
use vortex_core::induction::BatchedInduction;
use vortex_types::config::ParticleKernel;
use vortex_types::error::{VortexError, VortexResult};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GpuParams {
    point_count: u32,
    source_count: u32,
    kernel: u32,
    _pad: u32,
}

fn kernel_code(kernel: ParticleKernel) -> u32 {
    match kernel {
        ParticleKernel::LowOrderAlgebraic => 0,
        ParticleKernel::HighOrderAlgebraic => 1,
        ParticleKernel::Gaussian => 2,
    }
}

/// Batched Biot-Savart evaluator on the GPU.
pub struct GpuInduction {
    device: wgpu::Device,
    queue: wgpu::Queue,
    layout: wgpu::BindGroupLayout,
    filament_pipeline: wgpu::ComputePipeline,
    particle_pipeline: wgpu::ComputePipeline,
}

impl GpuInduction {
    /// Create the evaluator. Returns `Err` when no suitable adapter is
    /// found.
    pub fn new() -> VortexResult<Self> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| {
            VortexError::AcceleratorError("No suitable GPU adapter found".to_string())
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("vortex-gpu"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .map_err(|e| VortexError::AcceleratorError(format!("GPU device request failed: {e}")))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("induction"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("induction.wgsl"))),
        });

        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("induction_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(1, true),
                storage_entry(2, true),
                storage_entry(3, true),
                storage_entry(4, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("induction_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let make_pipeline = |entry: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: entry,
                compilation_options: Default::default(),
                cache: None,
            })
        };

        Ok(GpuInduction {
            filament_pipeline: make_pipeline("filament_induction"),
            particle_pipeline: make_pipeline("particle_induction"),
            device,
            queue,
            layout,
        })
    }

    fn dispatch(
        &mut self,
        pipeline_is_filament: bool,
        points: &[[f32; 4]],
        src_a: &[[f32; 4]],
        src_b: &[[f32; 4]],
        kernel: u32,
    ) -> VortexResult<Vec<[f32; 3]>> {
        if points.is_empty() {
            return Ok(Vec::new());
        }
        // A zero-source pass is a no-op.
        if src_a.is_empty() {
            return Ok(vec![[0.0; 3]; points.len()]);
        }
        if src_a.len() != src_b.len() {
            return Err(VortexError::AcceleratorError(format!(
                "source array length mismatch: {} vs {}",
                src_a.len(),
                src_b.len()
            )));
        }

        let params = GpuParams {
            point_count: points.len() as u32,
            source_count: src_a.len() as u32,
            kernel,
            _pad: 0,
        };
        let param_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let point_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("points"),
                contents: bytemuck::cast_slice(points),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let src_a_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("src_a"),
                contents: bytemuck::cast_slice(src_a),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let src_b_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("src_b"),
                contents: bytemuck::cast_slice(src_b),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let out_size = (points.len() * std::mem::size_of::<[f32; 4]>()) as u64;
        let out_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("velocities"),
            size: out_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size: out_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("induction_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: param_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: point_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: src_a_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: src_b_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: out_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("induction_pass"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("induction"),
                timestamp_writes: None,
            });
            pass.set_pipeline(if pipeline_is_filament {
                &self.filament_pipeline
            } else {
                &self.particle_pipeline
            });
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(points.len().div_ceil(64) as u32, 1, 1);
        }
        encoder.copy_buffer_to_buffer(&out_buffer, 0, &staging_buffer, 0, out_size);
        self.queue.submit(Some(encoder.finish()));

        let slice = staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| VortexError::AcceleratorError("readback channel closed".to_string()))?
            .map_err(|e| VortexError::AcceleratorError(format!("buffer map failed: {e:?}")))?;

        let data = slice.get_mapped_range();
        let raw: &[[f32; 4]] = bytemuck::cast_slice(&data);
        let out = raw.iter().map(|v| [v[0], v[1], v[2]]).collect();
        drop(data);
        staging_buffer.unmap();
        Ok(out)
    }
}

impl BatchedInduction for GpuInduction {
    fn filament_velocities(
        &mut self,
        points: &[[f32; 4]],
        endpoints_a: &[[f32; 4]],
        endpoints_b: &[[f32; 4]],
    ) -> VortexResult<Vec<[f32; 3]>> {
        self.dispatch(true, points, endpoints_a, endpoints_b, 0)
    }

    fn particle_velocities(
        &mut self,
        points: &[[f32; 4]],
        positions: &[[f32; 4]],
        alphas: &[[f32; 4]],
        kernel: ParticleKernel,
    ) -> VortexResult<Vec<[f32; 3]>> {
        self.dispatch(false, points, positions, alphas, kernel_code(kernel))
    }
}
