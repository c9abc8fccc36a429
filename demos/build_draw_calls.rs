//! Builds draw calls for a small synthetic model on a headless device and
//! prints the resulting records.
//!
//! Run with `RUST_LOG=debug` to watch the upload and shader-cache activity.

use anyhow::Result;

use meshview::document::{BufferRef, DrawCallNode, ModelDocument, SceneObject};
use meshview::gfx::{
    AttributeFormat, DrawCallBuilder, GeometryBuffers, RawBuffer, VertexAttribute, WgpuDevice,
};
use meshview::material::{Material, MaterialTable};
use meshview::shader::{EmbeddedShaderStore, ShaderCache, ShaderParams};

fn triangle_geometry() -> GeometryBuffers {
    // position (3 f32) + normal (3 f32) + texcoord (2 f32), 32-byte stride
    let vertices: [f32; 24] = [
        -0.5, -0.5, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, //
        0.5, -0.5, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, //
        0.0, 0.5, 0.0, 0.0, 0.0, 1.0, 0.5, 1.0,
    ];
    GeometryBuffers {
        vertex_buffers: vec![RawBuffer::vertex(
            bytemuck::cast_slice(&vertices).to_vec(),
            32,
            vec![
                VertexAttribute {
                    name: "POSITION".to_string(),
                    format: AttributeFormat::R32G32B32Float,
                    offset: 0,
                },
                VertexAttribute {
                    name: "NORMAL".to_string(),
                    format: AttributeFormat::R32G32B32Float,
                    offset: 12,
                },
                VertexAttribute {
                    name: "TEXCOORD".to_string(),
                    format: AttributeFormat::R32G32Float,
                    offset: 24,
                },
            ],
        )],
        index_buffers: vec![RawBuffer::index_u16(&[0, 1, 2])],
    }
}

fn triangle_document() -> ModelDocument {
    ModelDocument {
        scene_objects: vec![SceneObject {
            draw_calls: vec![DrawCallNode {
                primitive_type: "RENDER_PRIM_TRIANGLES".to_string(),
                material: "materials/demo_triangle".to_string(),
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
                tint_color: Some([1.0, 0.6, 0.2]),
            }],
        }],
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut device = WgpuDevice::headless()?;
    let mut cache = ShaderCache::new();
    let store = EmbeddedShaderStore::new();
    let mut materials = MaterialTable::new();
    materials.insert(Material::new("materials/demo_triangle", "vr_standard.vfx"));

    let mut builder = DrawCallBuilder::new(&mut device, &mut cache, &store, &materials);
    let draw_calls = builder.build(
        &triangle_document(),
        &triangle_geometry(),
        &ShaderParams::new(),
        &[],
    )?;

    for (i, draw_call) in draw_calls.iter().enumerate() {
        println!(
            "draw call {i}: material={} shader={} ({}) indices={} format={:?} tint={:?}",
            draw_call.material.name,
            draw_call.shader.name,
            draw_call.shader.file,
            draw_call.index_count,
            draw_call.index_format,
            draw_call.tint_color,
        );
        println!(
            "  render modes available: {:?}",
            draw_call.shader.render_modes
        );
    }

    Ok(())
}
