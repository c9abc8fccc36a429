//! wgpu-backed [`RenderDevice`].
//!
//! Owns the device-side resource tables the opaque handles index into. The
//! vertex-array object of older APIs maps to a render pipeline here: the
//! layout handle returned by `create_vertex_layout` identifies a pipeline
//! with the vertex buffer layout baked in, which the surrounding viewer
//! issues draw calls with.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::error::RenderError;
use crate::gfx::buffers::{BufferKind, RawBuffer};
use crate::gfx::device::{BoundAttribute, BufferHandle, LayoutHandle, ProgramHandle, RenderDevice};

struct GpuProgram {
    label: String,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
}

/// Production [`RenderDevice`] over a `wgpu::Device`/`wgpu::Queue` pair.
pub struct WgpuDevice {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
    buffers: Vec<wgpu::Buffer>,
    programs: Vec<GpuProgram>,
    pipelines: Vec<wgpu::RenderPipeline>,
}

impl WgpuDevice {
    /// Wraps an existing device and queue, typically the ones driving the
    /// viewer's surface. `color_format` must match the render target the
    /// draw calls will be issued against.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        color_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            device,
            queue,
            color_format,
            depth_format: Some(wgpu::TextureFormat::Depth32Float),
            buffers: Vec::new(),
            programs: Vec::new(),
            pipelines: Vec::new(),
        }
    }

    /// Acquires an adapter and device without a surface, for offscreen use.
    pub fn headless() -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| RenderError::Device(format!("no suitable adapter: {e}")))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("meshview device"),
            required_features: wgpu::Features::default(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| RenderError::Device(format!("device request failed: {e}")))?;

        Ok(Self::new(
            Arc::new(device),
            Arc::new(queue),
            wgpu::TextureFormat::Bgra8Unorm,
        ))
    }

    /// Overrides the depth attachment format the baked pipelines expect.
    /// `None` disables the depth stencil state entirely.
    pub fn with_depth_format(mut self, format: Option<wgpu::TextureFormat>) -> Self {
        self.depth_format = format;
        self
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Resolves an uploaded buffer for binding during rendering.
    pub fn buffer(&self, handle: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(handle.0 as usize)
    }

    /// Resolves a baked pipeline for a draw call's layout handle.
    pub fn pipeline(&self, handle: LayoutHandle) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(handle.0 as usize)
    }
}

impl RenderDevice for WgpuDevice {
    fn upload_buffers(
        &mut self,
        kind: BufferKind,
        buffers: &[RawBuffer],
    ) -> Result<Vec<BufferHandle>, RenderError> {
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        };

        // All-or-nothing: nothing is retained unless the whole batch
        // allocates cleanly.
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let mut created = Vec::with_capacity(buffers.len());
        for (i, buffer) in buffers.iter().enumerate() {
            created.push(
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{} buffer {}", kind.label(), i)),
                        contents: &buffer.bytes,
                        usage,
                    }),
            );
        }
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(RenderError::Device(error.to_string()));
        }

        let base = self.buffers.len() as u32;
        let handles = (0..created.len() as u32)
            .map(|i| BufferHandle(base + i))
            .collect();
        self.buffers.extend(created);
        Ok(handles)
    }

    fn create_program(
        &mut self,
        label: &str,
        vertex_wgsl: &str,
        fragment_wgsl: &str,
    ) -> Result<ProgramHandle, RenderError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{label} vertex")),
                source: wgpu::ShaderSource::Wgsl(vertex_wgsl.into()),
            });
        let fragment = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{label} fragment")),
                source: wgpu::ShaderSource::Wgsl(fragment_wgsl.into()),
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(RenderError::Device(error.to_string()));
        }

        let handle = ProgramHandle(self.programs.len() as u32);
        self.programs.push(GpuProgram {
            label: label.to_string(),
            vertex,
            fragment,
        });
        Ok(handle)
    }

    fn create_vertex_layout(
        &mut self,
        program: ProgramHandle,
        stride: u32,
        attributes: &[BoundAttribute],
    ) -> Result<LayoutHandle, RenderError> {
        let gpu_program = self
            .programs
            .get(program.0 as usize)
            .ok_or_else(|| RenderError::Device(format!("unknown program handle {program:?}")))?;

        let attributes: Vec<wgpu::VertexAttribute> = attributes
            .iter()
            .map(|a| wgpu::VertexAttribute {
                format: a.format,
                offset: a.offset as wgpu::BufferAddress,
                shader_location: a.location,
            })
            .collect();

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&gpu_program.label),
                layout: None,
                vertex: wgpu::VertexState {
                    module: &gpu_program.vertex,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: stride as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &attributes,
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &gpu_program.fragment,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.color_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: self.depth_format.map(|format| wgpu::DepthStencilState {
                    format,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(RenderError::Device(error.to_string()));
        }

        let handle = LayoutHandle(self.pipelines.len() as u32);
        self.pipelines.push(pipeline);
        Ok(handle)
    }
}
