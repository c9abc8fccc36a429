//! Typed view of a parsed model resource document.
//!
//! The container reader hands this crate a tree of named key/value nodes. To
//! keep string-keyed lookups out of the draw-call builder, the reader is
//! expected to lower that tree into these structs once, with required and
//! optional fields explicit. Field meanings follow the container's
//! `m_sceneObjects` / `m_drawCalls` layout.

/// A whole model resource's draw-call description.
#[derive(Debug, Clone, Default)]
pub struct ModelDocument {
    /// Scene objects in declaration order (`m_sceneObjects`).
    pub scene_objects: Vec<SceneObject>,
}

/// A named group of draw calls within the model (`m_sceneObjects[i]`).
#[derive(Debug, Clone, Default)]
pub struct SceneObject {
    /// Draw-call nodes in declaration order (`m_drawCalls`).
    pub draw_calls: Vec<DrawCallNode>,
}

/// One draw-call node as declared by the resource.
#[derive(Debug, Clone)]
pub struct DrawCallNode {
    /// Primitive topology literal (`m_nPrimitiveType`). Only
    /// `RENDER_PRIM_TRIANGLES` is accepted.
    pub primitive_type: String,
    /// Material name (`m_material`), overridden positionally by skin
    /// materials when any are supplied.
    pub material: String,
    /// Index buffer reference (`m_indexBuffer`).
    pub index_buffer: BufferRef,
    /// Vertex buffer references (`m_vertexBuffers`). Only the first binding
    /// is honored by the builder.
    pub vertex_buffers: Vec<BufferRef>,
    /// `m_nBaseVertex`.
    pub base_vertex: u32,
    /// `m_nVertexCount`.
    pub vertex_count: u32,
    /// `m_nStartIndex`, in index elements. The builder converts this to a
    /// byte offset using the index buffer's element size.
    pub start_index: u32,
    /// `m_nIndexCount`.
    pub index_count: u32,
    /// `m_vTintColor`, absent on untinted draw calls.
    pub tint_color: Option<[f32; 3]>,
}

/// A reference into the resource's uploaded buffer arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRef {
    /// Index into the vertex or index buffer array (`m_hBuffer`).
    pub buffer: u32,
    /// Byte offset to bind at (`m_nBindOffsetBytes`).
    pub bind_offset_bytes: u32,
}
