//! Vertex layout binding.
//!
//! Matches a vertex buffer's attribute descriptors against a compiled
//! program's reflected inputs and bakes the result into a device layout
//! handle. Attributes the shader does not declare are skipped silently:
//! shaders commonly consume a subset of the available vertex data.

use log::trace;

use crate::error::RenderError;
use crate::gfx::buffers::VertexAttribute;
use crate::gfx::device::{BoundAttribute, LayoutHandle, RenderDevice};
use crate::shader::ShaderProgram;

/// Derives the shader input name for a container semantic tag. Repeated
/// TEXCOORD attributes get an increasing suffix: the first stays bare, the
/// second becomes `texcoord2`, and so on.
fn shader_input_name(semantic: &str, texcoord_index: u32) -> String {
    let name = semantic.to_ascii_lowercase();
    if semantic == "TEXCOORD" && texcoord_index > 1 {
        format!("{name}{texcoord_index}")
    } else {
        name
    }
}

/// Binds an ordered attribute list to a program's inputs with the given
/// vertex stride, producing the device layout handle for the draw call.
pub fn bind_vertex_layout(
    device: &mut dyn RenderDevice,
    program: &ShaderProgram,
    attributes: &[VertexAttribute],
    stride: u32,
) -> Result<LayoutHandle, RenderError> {
    let mut texcoord_count = 0u32;
    let mut bound = Vec::with_capacity(attributes.len());

    for attribute in attributes {
        if attribute.name == "TEXCOORD" {
            texcoord_count += 1;
        }
        let input_name = shader_input_name(&attribute.name, texcoord_count);

        let Some(location) = program.input_location(&input_name) else {
            trace!(
                "shader {} declares no input {input_name}, skipping attribute",
                program.name
            );
            continue;
        };

        bound.push(BoundAttribute {
            location,
            format: attribute.format.vertex_format(),
            offset: attribute.offset,
        });
    }

    device.create_vertex_layout(program.handle, stride, &bound)
}
