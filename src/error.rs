//! Error types for draw-call construction and shader loading.
//!
//! Every variant is fatal to the current resource build: the caller is
//! expected to present the error and discard the partially built result.
//! Conditions that are explicitly normal (a vertex attribute the shader does
//! not declare, a draw call without a tint color) never surface here.

use thiserror::Error;

/// Shader pipeline stage, carried in compile diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Errors raised while turning a parsed model resource into draw calls.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A draw-call node declared a primitive topology other than the
    /// triangle-list literal.
    #[error("unknown primitive type in draw call ({0})")]
    UnknownPrimitiveType(String),

    /// An index buffer declared an element size other than 2 or 4 bytes.
    #[error("unsupported index element size {0}, expected 2 or 4")]
    UnsupportedIndexWidth(u32),

    /// A vertex attribute carried a numeric format tag outside the fixed
    /// container format table.
    #[error("unknown vertex attribute format {0:?}")]
    UnknownAttributeFormat(String),

    /// The resource declared a different number of vertex and index buffers.
    #[error("vertex buffer count {vertex_buffers} does not match index buffer count {index_buffers}")]
    BufferCountMismatch {
        vertex_buffers: usize,
        index_buffers: usize,
    },

    /// A draw-call node referenced a buffer index that was never uploaded.
    #[error("draw call references {kind} buffer {index} but only {count} were uploaded")]
    MissingBuffer {
        kind: &'static str,
        index: u32,
        count: usize,
    },

    /// A draw-call node declared no vertex buffer bindings at all.
    #[error("draw call declares no vertex buffer bindings")]
    MissingVertexBuffer,

    /// A draw call's start index does not fit the index buffer's byte range.
    #[error("start index {start_index} with index element size {element_size} overflows the byte offset range")]
    StartIndexOverflow { start_index: u32, element_size: u32 },

    /// A shader stage failed to parse or validate. Carries the compiler
    /// diagnostic verbatim.
    #[error("error setting up {stage} shader \"{name}\": {log}")]
    ShaderCompile {
        name: String,
        stage: ShaderStage,
        log: String,
    },

    /// The vertex and fragment stages do not agree on their interface.
    #[error("error linking shader \"{name}\": {log}")]
    ShaderLink { name: String, log: String },

    /// A `#define param_` line carried a value that is not an integer.
    #[error("invalid value {value:?} for shader parameter {name}")]
    InvalidParameterValue { name: String, value: String },

    /// A referenced shader source unit or material could not be resolved.
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    /// A shader source unit includes itself, directly or transitively.
    #[error("cyclic shader include: {0}")]
    CyclicInclude(String),

    /// The graphics device reported a failure, e.g. buffer allocation.
    #[error("device error: {0}")]
    Device(String),
}
