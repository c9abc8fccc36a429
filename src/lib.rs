//! Draw-call preparation for compiled model resources.
//!
//! Takes a parsed model document plus its raw geometry buffers and turns them
//! into sorted, GPU-ready draw-call records: buffers uploaded, materials
//! resolved, shader variants compiled and cached, vertex layouts bound
//! against each shader's reflected inputs.
//!
//! The crate never owns a window or a frame loop. The production device is
//! [`gfx::WgpuDevice`] (headless-capable); everything above it goes through
//! the [`gfx::RenderDevice`] seam so the whole pipeline is testable without
//! a GPU.
//!
//! ```no_run
//! use meshview::gfx::{DrawCallBuilder, GeometryBuffers, WgpuDevice};
//! use meshview::material::MaterialTable;
//! use meshview::shader::{EmbeddedShaderStore, ShaderCache, ShaderParams};
//!
//! # fn load_document() -> meshview::document::ModelDocument { unimplemented!() }
//! # fn load_geometry() -> GeometryBuffers { unimplemented!() }
//! # fn main() -> Result<(), meshview::error::RenderError> {
//! let mut device = WgpuDevice::headless()?;
//! let mut cache = ShaderCache::new();
//! let store = EmbeddedShaderStore;
//! let materials = MaterialTable::new();
//!
//! let mut builder = DrawCallBuilder::new(&mut device, &mut cache, &store, &materials);
//! let draw_calls = builder.build(
//!     &load_document(),
//!     &load_geometry(),
//!     &ShaderParams::new(),
//!     &[],
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod error;
pub mod gfx;
pub mod material;
pub mod shader;

pub use document::{BufferRef, DrawCallNode, ModelDocument, SceneObject};
pub use error::RenderError;
pub use gfx::{DrawCall, DrawCallBuilder, RenderMesh, WgpuDevice};
pub use material::{Material, MaterialResolver, MaterialTable};
pub use shader::{EmbeddedShaderStore, ShaderCache, ShaderParams, ShaderProgram};
