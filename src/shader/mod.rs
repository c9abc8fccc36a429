//! Shader loading: preprocessing, compilation and caching.
//!
//! Model materials request shaders by name; the cache maps those names onto
//! a fixed set of built-in shader files, specializes the source text with
//! per-model boolean parameters, compiles through naga and the device seam,
//! and guarantees at most one compiled program per distinct
//! (file, parameter-assignment) pair.

pub mod cache;
pub mod compiler;
pub mod preprocess;
pub mod store;

use std::collections::{BTreeSet, HashMap};

use crate::gfx::device::ProgramHandle;

/// Per-model boolean compile-time switches. Partial: parameters not present
/// fall back to the default baked into the shader source.
pub type ShaderParams = HashMap<String, bool>;

/// A compiled shader program and the source facts that built it.
#[derive(Debug)]
pub struct ShaderProgram {
    /// Shader name as requested by the material, e.g. `vr_standard.vfx`.
    pub name: String,
    /// Canonical shader file identity the name resolved to.
    pub file: &'static str,
    /// Device program handle.
    pub handle: ProgramHandle,
    /// The caller-supplied parameter set used for this build.
    pub params: ShaderParams,
    /// Every parameter name the source pair declares.
    pub declared_params: BTreeSet<String>,
    /// Render-mode names the source supports, for UI/debug selection.
    pub render_modes: Vec<String>,
    vertex_inputs: HashMap<String, u32>,
}

impl ShaderProgram {
    /// Looks up a vertex input slot by shader input name. `None` means the
    /// shader does not consume that attribute.
    pub fn input_location(&self, name: &str) -> Option<u32> {
        self.vertex_inputs.get(name).copied()
    }
}

pub use cache::ShaderCache;
pub use store::{EmbeddedShaderStore, MemoryShaderStore, ShaderSourceStore};
