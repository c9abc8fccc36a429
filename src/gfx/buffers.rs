//! Raw vertex/index buffer data and upload.
//!
//! A model resource carries its geometry as opaque byte blocks plus a
//! per-buffer element count, element stride and (for vertex buffers) a list
//! of typed attribute descriptors. This module holds those CPU-side types and
//! the upload path that turns them into device buffer handles.

use log::debug;

use crate::error::RenderError;
use crate::gfx::device::{BufferHandle, RenderDevice};

/// Which device binding a buffer is uploaded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
}

impl BufferKind {
    pub fn label(self) -> &'static str {
        match self {
            BufferKind::Vertex => "vertex",
            BufferKind::Index => "index",
        }
    }
}

/// Numeric format of one vertex attribute, as declared by the container.
///
/// This is a closed set: the container only ever emits these nine formats,
/// and dispatch over them is an exhaustive match. Unrecognized tags are
/// rejected at parse time by [`AttributeFormat::from_tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeFormat {
    R32G32B32Float,
    R8G8B8A8Unorm,
    R32G32Float,
    R16G16Float,
    R32G32B32A32Float,
    R8G8B8A8Uint,
    R16G16Sint,
    R16G16B16A16Sint,
    R16G16Unorm,
}

impl AttributeFormat {
    /// Parses a container format tag.
    ///
    /// Any tag outside the fixed table is a fatal format error naming the
    /// offending tag.
    pub fn from_tag(tag: &str) -> Result<Self, RenderError> {
        match tag {
            "R32G32B32_FLOAT" => Ok(AttributeFormat::R32G32B32Float),
            "R8G8B8A8_UNORM" => Ok(AttributeFormat::R8G8B8A8Unorm),
            "R32G32_FLOAT" => Ok(AttributeFormat::R32G32Float),
            "R16G16_FLOAT" => Ok(AttributeFormat::R16G16Float),
            "R32G32B32A32_FLOAT" => Ok(AttributeFormat::R32G32B32A32Float),
            "R8G8B8A8_UINT" => Ok(AttributeFormat::R8G8B8A8Uint),
            "R16G16_SINT" => Ok(AttributeFormat::R16G16Sint),
            "R16G16B16A16_SINT" => Ok(AttributeFormat::R16G16B16A16Sint),
            "R16G16_UNORM" => Ok(AttributeFormat::R16G16Unorm),
            other => Err(RenderError::UnknownAttributeFormat(other.to_string())),
        }
    }

    /// Maps the container format onto the device vertex format.
    ///
    /// Component count, numeric representation and normalization follow the
    /// fixed table; the match is exhaustive on purpose.
    pub fn vertex_format(self) -> wgpu::VertexFormat {
        match self {
            AttributeFormat::R32G32B32Float => wgpu::VertexFormat::Float32x3,
            AttributeFormat::R8G8B8A8Unorm => wgpu::VertexFormat::Unorm8x4,
            AttributeFormat::R32G32Float => wgpu::VertexFormat::Float32x2,
            AttributeFormat::R16G16Float => wgpu::VertexFormat::Float16x2,
            AttributeFormat::R32G32B32A32Float => wgpu::VertexFormat::Float32x4,
            AttributeFormat::R8G8B8A8Uint => wgpu::VertexFormat::Uint8x4,
            AttributeFormat::R16G16Sint => wgpu::VertexFormat::Sint16x2,
            AttributeFormat::R16G16B16A16Sint => wgpu::VertexFormat::Sint16x4,
            AttributeFormat::R16G16Unorm => wgpu::VertexFormat::Unorm16x2,
        }
    }
}

/// One typed attribute within a vertex buffer's layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Semantic tag from the container, e.g. `POSITION`, `NORMAL`,
    /// `TEXCOORD`. Repeated `TEXCOORD` entries are disambiguated at bind
    /// time by an increasing suffix.
    pub name: String,
    pub format: AttributeFormat,
    /// Byte offset within a vertex.
    pub offset: u32,
}

/// A CPU-side buffer extracted from the resource, read-only and uploaded
/// once per resource load.
#[derive(Debug, Clone, Default)]
pub struct RawBuffer {
    /// Number of elements (vertices or indices).
    pub element_count: u32,
    /// Bytes per element: the vertex stride, or the index width.
    pub element_size: u32,
    /// Raw contents, `element_count * element_size` bytes.
    pub bytes: Vec<u8>,
    /// Attribute layout; empty for index buffers.
    pub attributes: Vec<VertexAttribute>,
}

impl RawBuffer {
    /// Builds a vertex buffer from interleaved vertex bytes.
    pub fn vertex(bytes: Vec<u8>, stride: u32, attributes: Vec<VertexAttribute>) -> Self {
        let element_count = if stride == 0 {
            0
        } else {
            bytes.len() as u32 / stride
        };
        Self {
            element_count,
            element_size: stride,
            bytes,
            attributes,
        }
    }

    /// Builds a 16-bit index buffer.
    pub fn index_u16(indices: &[u16]) -> Self {
        Self {
            element_count: indices.len() as u32,
            element_size: 2,
            bytes: bytemuck::cast_slice(indices).to_vec(),
            attributes: Vec::new(),
        }
    }

    /// Builds a 32-bit index buffer.
    pub fn index_u32(indices: &[u32]) -> Self {
        Self {
            element_count: indices.len() as u32,
            element_size: 4,
            bytes: bytemuck::cast_slice(indices).to_vec(),
            attributes: Vec::new(),
        }
    }
}

/// The resource's complete geometry block: ordered vertex and index buffers.
#[derive(Debug, Clone, Default)]
pub struct GeometryBuffers {
    pub vertex_buffers: Vec<RawBuffer>,
    pub index_buffers: Vec<RawBuffer>,
}

/// Uploads a sequence of raw buffers, one device handle per input buffer,
/// order-preserving.
///
/// There is no partial-success state: a device allocation failure fails the
/// whole sequence.
pub fn upload_buffers(
    device: &mut dyn RenderDevice,
    buffers: &[RawBuffer],
    kind: BufferKind,
) -> Result<Vec<BufferHandle>, RenderError> {
    let handles = device.upload_buffers(kind, buffers)?;
    debug!("uploaded {} {} buffer(s)", handles.len(), kind.label());
    Ok(handles)
}
