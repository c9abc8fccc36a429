//! Graphics-facing half of the crate: device seam, buffer upload, vertex
//! layout binding and draw-call assembly.
//!
//! Everything here is device-agnostic except [`wgpu_device`], which is the
//! one production implementation of the [`RenderDevice`] seam.

pub mod buffers;
pub mod device;
pub mod draw_call;
pub mod layout;
pub mod wgpu_device;

pub use buffers::{AttributeFormat, BufferKind, GeometryBuffers, RawBuffer, VertexAttribute};
pub use device::{BoundAttribute, BufferHandle, LayoutHandle, ProgramHandle, RenderDevice};
pub use draw_call::{DrawBinding, DrawCall, DrawCallBuilder, RenderMesh};
pub use wgpu_device::WgpuDevice;
