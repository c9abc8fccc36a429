//! Device abstraction for the draw-call pipeline.
//!
//! Everything that touches the graphics device goes through [`RenderDevice`]:
//! buffer upload, shader program creation, and vertex-layout (pipeline)
//! creation. The production implementation is
//! [`WgpuDevice`](crate::gfx::wgpu_device::WgpuDevice); tests drive the
//! pipeline against a mock. Handles are opaque indices into device-owned
//! resource tables and stay valid for the device's lifetime.
//!
//! Device operations are not safe to interleave across concurrent resource
//! loads; the builder takes the device by `&mut`, which serializes access
//! statically.

use crate::error::RenderError;
use crate::gfx::buffers::{BufferKind, RawBuffer};

/// Opaque handle to an uploaded device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u32);

/// Opaque handle to a compiled shader program (vertex + fragment modules).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) u32);

/// Opaque handle to a configured vertex layout bound to a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutHandle(pub(crate) u32);

/// A vertex attribute resolved against a program's inputs, ready for the
/// device: shader input slot, device format, byte offset within a vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundAttribute {
    pub location: u32,
    pub format: wgpu::VertexFormat,
    pub offset: u32,
}

/// Device-facing operations used while building draw calls.
pub trait RenderDevice {
    /// Allocates one device buffer per input buffer, order-preserving.
    /// Either every buffer uploads or the whole call fails.
    fn upload_buffers(
        &mut self,
        kind: BufferKind,
        buffers: &[RawBuffer],
    ) -> Result<Vec<BufferHandle>, RenderError>;

    /// Creates the device modules for an already validated vertex/fragment
    /// source pair.
    fn create_program(
        &mut self,
        label: &str,
        vertex_wgsl: &str,
        fragment_wgsl: &str,
    ) -> Result<ProgramHandle, RenderError>;

    /// Bakes a vertex layout against a program's inputs. On wgpu this
    /// produces the render pipeline the draw call is later issued with.
    fn create_vertex_layout(
        &mut self,
        program: ProgramHandle,
        stride: u32,
        attributes: &[BoundAttribute],
    ) -> Result<LayoutHandle, RenderError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording mock device for pipeline tests.

    use super::*;

    #[derive(Debug, Default)]
    pub struct MockDevice {
        /// (kind, byte length) per uploaded buffer, in upload order.
        pub uploads: Vec<(BufferKind, usize)>,
        /// (label, vertex source, fragment source) per created program.
        pub programs: Vec<(String, String, String)>,
        /// (program, stride, bound attributes) per created layout.
        pub layouts: Vec<(ProgramHandle, u32, Vec<BoundAttribute>)>,
        /// When set, the next upload fails with a device error.
        pub fail_next_upload: bool,
    }

    impl MockDevice {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl RenderDevice for MockDevice {
        fn upload_buffers(
            &mut self,
            kind: BufferKind,
            buffers: &[RawBuffer],
        ) -> Result<Vec<BufferHandle>, RenderError> {
            if self.fail_next_upload {
                self.fail_next_upload = false;
                return Err(RenderError::Device("mock allocation failure".to_string()));
            }
            let mut handles = Vec::with_capacity(buffers.len());
            for buffer in buffers {
                let handle = BufferHandle(self.uploads.len() as u32);
                self.uploads.push((kind, buffer.bytes.len()));
                handles.push(handle);
            }
            Ok(handles)
        }

        fn create_program(
            &mut self,
            label: &str,
            vertex_wgsl: &str,
            fragment_wgsl: &str,
        ) -> Result<ProgramHandle, RenderError> {
            let handle = ProgramHandle(self.programs.len() as u32);
            self.programs.push((
                label.to_string(),
                vertex_wgsl.to_string(),
                fragment_wgsl.to_string(),
            ));
            Ok(handle)
        }

        fn create_vertex_layout(
            &mut self,
            program: ProgramHandle,
            stride: u32,
            attributes: &[BoundAttribute],
        ) -> Result<LayoutHandle, RenderError> {
            let handle = LayoutHandle(self.layouts.len() as u32);
            self.layouts.push((program, stride, attributes.to_vec()));
            Ok(handle)
        }
    }
}
