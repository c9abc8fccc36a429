//! Draw-call construction.
//!
//! The top of the pipeline: walks a model document's scene objects in
//! declaration order, uploads the resource's geometry, resolves materials
//! and shaders, and assembles one GPU-ready [`DrawCall`] record per
//! draw-call node. The finished list is sorted by material name so a
//! renderer iterating it changes state as rarely as possible.

use std::sync::Arc;

use cgmath::{Matrix4, SquareMatrix, Vector3, Vector4};
use log::debug;

use crate::document::{DrawCallNode, ModelDocument};
use crate::error::RenderError;
use crate::gfx::buffers::{upload_buffers, BufferKind, GeometryBuffers};
use crate::gfx::device::{BufferHandle, LayoutHandle, RenderDevice};
use crate::gfx::layout::bind_vertex_layout;
use crate::material::{Material, MaterialResolver};
use crate::shader::store::ShaderSourceStore;
use crate::shader::{ShaderCache, ShaderParams, ShaderProgram};

/// An uploaded buffer plus the byte offset to bind it at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawBinding {
    pub handle: BufferHandle,
    pub offset: u32,
}

/// One GPU submission unit prepared from a draw-call node.
#[derive(Debug)]
pub struct DrawCall {
    /// Always a triangle list; other topologies are rejected during
    /// construction.
    pub primitive_topology: wgpu::PrimitiveTopology,
    pub material: Material,
    pub shader: Arc<ShaderProgram>,
    pub vertex_buffer: DrawBinding,
    pub index_buffer: DrawBinding,
    pub base_vertex: u32,
    pub vertex_count: u32,
    /// Byte offset into the index buffer (the node's element offset times
    /// the index element size).
    pub start_index: u32,
    pub index_count: u32,
    /// Matches the referenced index buffer's declared element size.
    pub index_format: wgpu::IndexFormat,
    /// White when the node declares no tint.
    pub tint_color: Vector3<f32>,
    pub layout: LayoutHandle,
}

/// A loaded model resource, ready for a renderer: its draw calls plus the
/// instance state that outlives the resource data.
#[derive(Debug)]
pub struct RenderMesh {
    pub transform: Matrix4<f32>,
    pub tint: Vector4<f32>,
    /// Per-instance material substitutions, indexed positionally over each
    /// scene object's draw calls. Empty means the document's own materials.
    pub skin_materials: Vec<String>,
    pub draw_calls: Vec<DrawCall>,
}

impl Default for RenderMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderMesh {
    pub fn new() -> Self {
        Self {
            transform: Matrix4::identity(),
            tint: Vector4::new(1.0, 1.0, 1.0, 1.0),
            skin_materials: Vec::new(),
            draw_calls: Vec::new(),
        }
    }

    pub fn with_skin_materials(mut self, materials: Vec<String>) -> Self {
        self.skin_materials = materials;
        self
    }

    /// Builds this mesh's draw calls from a resource's document and
    /// geometry. The document and raw buffers are only borrowed for the
    /// build; afterwards the data lives in device memory.
    pub fn load(
        &mut self,
        builder: &mut DrawCallBuilder<'_>,
        document: &ModelDocument,
        geometry: &GeometryBuffers,
        model_params: &ShaderParams,
    ) -> Result<(), RenderError> {
        self.draw_calls = builder.build(document, geometry, model_params, &self.skin_materials)?;
        Ok(())
    }
}

/// Builds draw-call records for one resource load.
///
/// Borrows the device, shader cache, shader source store and material
/// resolver for the duration of the build; failures abort the whole
/// resource and leave nothing half-built in the returned list.
///
/// Known limitation carried over from the container semantics: when a
/// draw-call node declares several vertex-buffer bindings, only the first
/// is honored.
pub struct DrawCallBuilder<'a> {
    device: &'a mut dyn RenderDevice,
    cache: &'a mut ShaderCache,
    store: &'a dyn ShaderSourceStore,
    materials: &'a dyn MaterialResolver,
}

impl<'a> DrawCallBuilder<'a> {
    pub fn new(
        device: &'a mut dyn RenderDevice,
        cache: &'a mut ShaderCache,
        store: &'a dyn ShaderSourceStore,
        materials: &'a dyn MaterialResolver,
    ) -> Self {
        Self {
            device,
            cache,
            store,
            materials,
        }
    }

    /// Uploads the geometry and assembles every draw call the document
    /// declares, sorted ascending by material name.
    pub fn build(
        &mut self,
        document: &ModelDocument,
        geometry: &GeometryBuffers,
        model_params: &ShaderParams,
        skin_materials: &[String],
    ) -> Result<Vec<DrawCall>, RenderError> {
        if geometry.vertex_buffers.len() != geometry.index_buffers.len() {
            return Err(RenderError::BufferCountMismatch {
                vertex_buffers: geometry.vertex_buffers.len(),
                index_buffers: geometry.index_buffers.len(),
            });
        }

        let vertex_handles =
            upload_buffers(self.device, &geometry.vertex_buffers, BufferKind::Vertex)?;
        let index_handles = upload_buffers(self.device, &geometry.index_buffers, BufferKind::Index)?;

        let mut draw_calls = Vec::new();
        for object in &document.scene_objects {
            for (index, node) in object.draw_calls.iter().enumerate() {
                let material_name = if skin_materials.is_empty() {
                    node.material.as_str()
                } else {
                    skin_materials.get(index).map(String::as_str).ok_or_else(|| {
                        RenderError::MissingDependency(format!("skin material {index}"))
                    })?
                };

                draw_calls.push(self.build_draw_call(
                    node,
                    material_name,
                    geometry,
                    &vertex_handles,
                    &index_handles,
                    model_params,
                )?);
            }
        }

        // Stable ascending ordinal sort; purely a state-change optimization
        // for the renderer.
        draw_calls.sort_by(|a, b| a.material.name.cmp(&b.material.name));

        debug!("built {} draw call(s)", draw_calls.len());
        Ok(draw_calls)
    }

    fn build_draw_call(
        &mut self,
        node: &DrawCallNode,
        material_name: &str,
        geometry: &GeometryBuffers,
        vertex_handles: &[BufferHandle],
        index_handles: &[BufferHandle],
        model_params: &ShaderParams,
    ) -> Result<DrawCall, RenderError> {
        if node.primitive_type != "RENDER_PRIM_TRIANGLES" {
            return Err(RenderError::UnknownPrimitiveType(node.primitive_type.clone()));
        }

        let material = self.materials.resolve(material_name)?;
        let shader = self
            .cache
            .get(&material.shader_name, model_params, self.store, self.device)?;

        let index_ref = node.index_buffer;
        let index_raw = geometry
            .index_buffers
            .get(index_ref.buffer as usize)
            .ok_or(RenderError::MissingBuffer {
                kind: "index",
                index: index_ref.buffer,
                count: geometry.index_buffers.len(),
            })?;
        let index_handle = index_handles
            .get(index_ref.buffer as usize)
            .copied()
            .ok_or(RenderError::MissingBuffer {
                kind: "index",
                index: index_ref.buffer,
                count: index_handles.len(),
            })?;
        let index_format = match index_raw.element_size {
            2 => wgpu::IndexFormat::Uint16,
            4 => wgpu::IndexFormat::Uint32,
            other => return Err(RenderError::UnsupportedIndexWidth(other)),
        };
        // element offset -> byte offset
        let start_index = node
            .start_index
            .checked_mul(index_raw.element_size)
            .ok_or(RenderError::StartIndexOverflow {
                start_index: node.start_index,
                element_size: index_raw.element_size,
            })?;

        // Only the first vertex-buffer binding is honored.
        let vertex_ref = node
            .vertex_buffers
            .first()
            .copied()
            .ok_or(RenderError::MissingVertexBuffer)?;
        let vertex_raw = geometry
            .vertex_buffers
            .get(vertex_ref.buffer as usize)
            .ok_or(RenderError::MissingBuffer {
                kind: "vertex",
                index: vertex_ref.buffer,
                count: geometry.vertex_buffers.len(),
            })?;
        let vertex_handle = vertex_handles
            .get(vertex_ref.buffer as usize)
            .copied()
            .ok_or(RenderError::MissingBuffer {
                kind: "vertex",
                index: vertex_ref.buffer,
                count: vertex_handles.len(),
            })?;

        let layout = bind_vertex_layout(
            self.device,
            &shader,
            &vertex_raw.attributes,
            vertex_raw.element_size,
        )?;

        Ok(DrawCall {
            primitive_topology: wgpu::PrimitiveTopology::TriangleList,
            material,
            shader,
            vertex_buffer: DrawBinding {
                handle: vertex_handle,
                offset: vertex_ref.bind_offset_bytes,
            },
            index_buffer: DrawBinding {
                handle: index_handle,
                offset: index_ref.bind_offset_bytes,
            },
            base_vertex: node.base_vertex,
            vertex_count: node.vertex_count,
            start_index,
            index_count: node.index_count,
            index_format,
            tint_color: node
                .tint_color
                .map(|c| Vector3::new(c[0], c[1], c[2]))
                .unwrap_or_else(|| Vector3::new(1.0, 1.0, 1.0)),
            layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BufferRef, SceneObject};
    use crate::gfx::buffers::{AttributeFormat, RawBuffer, VertexAttribute};
    use crate::gfx::device::testing::MockDevice;
    use crate::material::MaterialTable;
    use crate::shader::store::MemoryShaderStore;

    fn attribute(name: &str, format: AttributeFormat, offset: u32) -> VertexAttribute {
        VertexAttribute {
            name: name.to_string(),
            format,
            offset,
        }
    }

    /// Three vertices of position+normal+texcoord, three 16-bit indices.
    fn test_geometry() -> GeometryBuffers {
        let stride = 32u32;
        GeometryBuffers {
            vertex_buffers: vec![RawBuffer::vertex(
                vec![0u8; (3 * stride) as usize],
                stride,
                vec![
                    attribute("POSITION", AttributeFormat::R32G32B32Float, 0),
                    attribute("NORMAL", AttributeFormat::R32G32B32Float, 12),
                    attribute("TEXCOORD", AttributeFormat::R32G32Float, 24),
                ],
            )],
            index_buffers: vec![RawBuffer::index_u16(&[0, 1, 2])],
        }
    }

    fn test_store() -> MemoryShaderStore {
        let mut store = MemoryShaderStore::new();
        store.insert(
            "simple.vert.wgsl",
            "\
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) texcoord: vec2<f32>,
}
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
}
@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>(vertex.position + vec3<f32>(vertex.texcoord, 0.0), 1.0);
    out.normal = vertex.normal;
    return out;
}
",
        );
        store.insert(
            "simple.frag.wgsl",
            "\
@fragment
fn fs_main(@location(0) normal: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(normal, 1.0);
}
",
        );
        store
    }

    fn test_materials() -> MaterialTable {
        let mut materials = MaterialTable::new();
        materials.insert(Material::new("materials/zebra", "vr_simple.vfx"));
        materials.insert(Material::new("materials/aardvark", "vr_simple.vfx"));
        materials.insert(Material::new("materials/override", "vr_simple.vfx"));
        materials
    }

    fn triangle_node(material: &str) -> DrawCallNode {
        DrawCallNode {
            primitive_type: "RENDER_PRIM_TRIANGLES".to_string(),
            material: material.to_string(),
            index_buffer: BufferRef {
                buffer: 0,
                bind_offset_bytes: 0,
            },
            vertex_buffers: vec![BufferRef {
                buffer: 0,
                bind_offset_bytes: 0,
            }],
            base_vertex: 0,
            vertex_count: 3,
            start_index: 0,
            index_count: 3,
            tint_color: None,
        }
    }

    fn two_call_document() -> ModelDocument {
        ModelDocument {
            scene_objects: vec![SceneObject {
                draw_calls: vec![
                    triangle_node("materials/zebra"),
                    triangle_node("materials/aardvark"),
                ],
            }],
        }
    }

    #[test]
    fn test_end_to_end_build_sorted_by_material() {
        let store = test_store();
        let materials = test_materials();
        let mut device = MockDevice::new();
        let mut cache = ShaderCache::new();
        let mut builder = DrawCallBuilder::new(&mut device, &mut cache, &store, &materials);

        let draw_calls = builder
            .build(
                &two_call_document(),
                &test_geometry(),
                &ShaderParams::new(),
                &[],
            )
            .unwrap();

        assert_eq!(draw_calls.len(), 2);
        // declaration order was zebra, aardvark; output is sorted
        assert_eq!(draw_calls[0].material.name, "materials/aardvark");
        assert_eq!(draw_calls[1].material.name, "materials/zebra");
        for draw_call in &draw_calls {
            assert_eq!(
                draw_call.primitive_topology,
                wgpu::PrimitiveTopology::TriangleList
            );
            assert_eq!(draw_call.vertex_count, 3);
            assert_eq!(draw_call.index_count, 3);
            assert_eq!(draw_call.index_format, wgpu::IndexFormat::Uint16);
            assert_eq!(draw_call.tint_color, Vector3::new(1.0, 1.0, 1.0));
        }
        // one vertex + one index upload, one shared shader program
        assert_eq!(device.uploads.len(), 2);
        assert_eq!(device.programs.len(), 1);
        assert!(Arc::ptr_eq(&draw_calls[0].shader, &draw_calls[1].shader));
    }

    #[test]
    fn test_unknown_primitive_type_is_fatal_and_named() {
        let store = test_store();
        let materials = test_materials();
        let mut device = MockDevice::new();
        let mut cache = ShaderCache::new();
        let mut builder = DrawCallBuilder::new(&mut device, &mut cache, &store, &materials);

        let mut document = two_call_document();
        document.scene_objects[0].draw_calls[1].primitive_type =
            "RENDER_PRIM_LINES".to_string();

        let err = builder
            .build(&document, &test_geometry(), &ShaderParams::new(), &[])
            .unwrap_err();
        assert!(matches!(err, RenderError::UnknownPrimitiveType(ref t) if t == "RENDER_PRIM_LINES"));
        assert!(err.to_string().contains("RENDER_PRIM_LINES"));
    }

    #[test]
    fn test_index_width_maps_to_index_format() {
        let store = test_store();
        let materials = test_materials();
        let mut device = MockDevice::new();
        let mut cache = ShaderCache::new();

        let mut geometry = test_geometry();
        geometry.index_buffers[0] = RawBuffer::index_u32(&[0, 1, 2]);

        let mut builder = DrawCallBuilder::new(&mut device, &mut cache, &store, &materials);
        let draw_calls = builder
            .build(
                &two_call_document(),
                &geometry,
                &ShaderParams::new(),
                &[],
            )
            .unwrap();
        assert_eq!(draw_calls[0].index_format, wgpu::IndexFormat::Uint32);
    }

    #[test]
    fn test_unsupported_index_width_is_fatal() {
        let store = test_store();
        let materials = test_materials();
        let mut device = MockDevice::new();
        let mut cache = ShaderCache::new();

        let mut geometry = test_geometry();
        geometry.index_buffers[0].element_size = 3;

        let mut builder = DrawCallBuilder::new(&mut device, &mut cache, &store, &materials);
        let err = builder
            .build(
                &two_call_document(),
                &geometry,
                &ShaderParams::new(),
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedIndexWidth(3)));
    }

    #[test]
    fn test_out_of_range_buffer_reference_is_fatal() {
        let store = test_store();
        let materials = test_materials();
        let mut device = MockDevice::new();
        let mut cache = ShaderCache::new();

        let mut document = two_call_document();
        document.scene_objects[0].draw_calls[0].index_buffer = BufferRef {
            buffer: 5,
            bind_offset_bytes: 0,
        };

        let mut builder = DrawCallBuilder::new(&mut device, &mut cache, &store, &materials);
        let err = builder
            .build(&document, &test_geometry(), &ShaderParams::new(), &[])
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::MissingBuffer {
                kind: "index",
                index: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_overflowing_start_index_is_fatal() {
        let store = test_store();
        let materials = test_materials();
        let mut device = MockDevice::new();
        let mut cache = ShaderCache::new();

        let mut document = two_call_document();
        document.scene_objects[0].draw_calls[0].start_index = u32::MAX;

        let mut builder = DrawCallBuilder::new(&mut device, &mut cache, &store, &materials);
        let err = builder
            .build(&document, &test_geometry(), &ShaderParams::new(), &[])
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::StartIndexOverflow {
                start_index: u32::MAX,
                element_size: 2,
            }
        ));
    }

    #[test]
    fn test_start_index_becomes_byte_offset() {
        let store = test_store();
        let materials = test_materials();
        let mut device = MockDevice::new();
        let mut cache = ShaderCache::new();

        let mut document = two_call_document();
        document.scene_objects[0].draw_calls[0].start_index = 6;
        let mut geometry = test_geometry();
        geometry.index_buffers[0] = RawBuffer::index_u16(&[0, 1, 2, 0, 2, 1, 1, 2, 0]);

        let mut builder = DrawCallBuilder::new(&mut device, &mut cache, &store, &materials);
        let draw_calls = builder
            .build(&document, &geometry, &ShaderParams::new(), &[])
            .unwrap();

        let zebra = draw_calls
            .iter()
            .find(|d| d.material.name == "materials/zebra")
            .unwrap();
        assert_eq!(zebra.start_index, 12); // 6 elements * 2 bytes
    }

    #[test]
    fn test_device_upload_failure_aborts_the_build() {
        let store = test_store();
        let materials = test_materials();
        let mut device = MockDevice::new();
        device.fail_next_upload = true;
        let mut cache = ShaderCache::new();
        let mut builder = DrawCallBuilder::new(&mut device, &mut cache, &store, &materials);

        let err = builder
            .build(
                &two_call_document(),
                &test_geometry(),
                &ShaderParams::new(),
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, RenderError::Device(_)));
        // nothing retained, nothing compiled
        assert!(device.uploads.is_empty());
        assert!(device.programs.is_empty());
    }

    #[test]
    fn test_buffer_count_mismatch_is_fatal() {
        let store = test_store();
        let materials = test_materials();
        let mut device = MockDevice::new();
        let mut cache = ShaderCache::new();

        let mut geometry = test_geometry();
        geometry.index_buffers.push(RawBuffer::index_u16(&[0]));

        let mut builder = DrawCallBuilder::new(&mut device, &mut cache, &store, &materials);
        let err = builder
            .build(
                &two_call_document(),
                &geometry,
                &ShaderParams::new(),
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, RenderError::BufferCountMismatch { .. }));
        assert!(device.uploads.is_empty());
    }

    #[test]
    fn test_skin_materials_override_positionally() {
        let store = test_store();
        let materials = test_materials();
        let mut device = MockDevice::new();
        let mut cache = ShaderCache::new();
        let mut builder = DrawCallBuilder::new(&mut device, &mut cache, &store, &materials);

        let skins = vec![
            "materials/override".to_string(),
            "materials/aardvark".to_string(),
        ];
        let draw_calls = builder
            .build(
                &two_call_document(),
                &test_geometry(),
                &ShaderParams::new(),
                &skins,
            )
            .unwrap();

        let names: Vec<&str> = draw_calls
            .iter()
            .map(|d| d.material.name.as_str())
            .collect();
        assert_eq!(names, vec!["materials/aardvark", "materials/override"]);
    }

    #[test]
    fn test_tint_color_is_carried() {
        let store = test_store();
        let materials = test_materials();
        let mut device = MockDevice::new();
        let mut cache = ShaderCache::new();

        let mut document = two_call_document();
        document.scene_objects[0].draw_calls[0].tint_color = Some([0.25, 0.5, 0.75]);

        let mut builder = DrawCallBuilder::new(&mut device, &mut cache, &store, &materials);
        let draw_calls = builder
            .build(&document, &test_geometry(), &ShaderParams::new(), &[])
            .unwrap();
        let zebra = draw_calls
            .iter()
            .find(|d| d.material.name == "materials/zebra")
            .unwrap();
        assert_eq!(zebra.tint_color, Vector3::new(0.25, 0.5, 0.75));
    }

    #[test]
    fn test_missing_material_aborts_the_build() {
        let store = test_store();
        let materials = MaterialTable::new();
        let mut device = MockDevice::new();
        let mut cache = ShaderCache::new();
        let mut builder = DrawCallBuilder::new(&mut device, &mut cache, &store, &materials);

        let err = builder
            .build(
                &two_call_document(),
                &test_geometry(),
                &ShaderParams::new(),
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, RenderError::MissingDependency(_)));
    }

    #[test]
    fn test_render_mesh_load_populates_draw_calls() {
        let store = test_store();
        let materials = test_materials();
        let mut device = MockDevice::new();
        let mut cache = ShaderCache::new();
        let mut builder = DrawCallBuilder::new(&mut device, &mut cache, &store, &materials);

        let mut mesh = RenderMesh::new();
        mesh.load(
            &mut builder,
            &two_call_document(),
            &test_geometry(),
            &ShaderParams::new(),
        )
        .unwrap();
        assert_eq!(mesh.draw_calls.len(), 2);
        assert_eq!(mesh.tint, Vector4::new(1.0, 1.0, 1.0, 1.0));
    }
}
