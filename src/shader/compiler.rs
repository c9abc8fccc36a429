//! Shader stage compilation.
//!
//! Preprocessed sources still carry `#define param_` lines; those are
//! lowered to WGSL boolean constants first. Each stage is then parsed and
//! validated with naga, the stage interfaces are checked against each other
//! (the program-link step of older APIs), the vertex entry point's inputs
//! are reflected into a name-to-location map, and finally the device modules
//! are created. A stage failure carries the requested shader name, the stage
//! kind, and the compiler diagnostic verbatim.

use std::collections::HashMap;

use crate::error::{RenderError, ShaderStage};
use crate::gfx::device::{ProgramHandle, RenderDevice};
use crate::shader::preprocess::parse_define;

pub(crate) const VERTEX_ENTRY: &str = "vs_main";
pub(crate) const FRAGMENT_ENTRY: &str = "fs_main";

/// Outcome of compiling a vertex/fragment source pair.
#[derive(Debug)]
pub(crate) struct CompiledProgram {
    pub handle: ProgramHandle,
    /// Vertex entry-point inputs: shader input name to location slot.
    pub vertex_inputs: HashMap<String, u32>,
}

/// Compiles a preprocessed source pair into a device program.
pub(crate) fn compile(
    device: &mut dyn RenderDevice,
    shader_name: &str,
    label: &str,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<CompiledProgram, RenderError> {
    let vertex_wgsl = lower_directives(vertex_source)?;
    let fragment_wgsl = lower_directives(fragment_source)?;

    // naga modules live only for this call; the device keeps its own copies.
    let vertex_module = check_stage(shader_name, ShaderStage::Vertex, &vertex_wgsl)?;
    let fragment_module = check_stage(shader_name, ShaderStage::Fragment, &fragment_wgsl)?;

    link_check(shader_name, &vertex_module, &fragment_module)?;
    let vertex_inputs = reflect_vertex_inputs(shader_name, &vertex_module)?;

    let handle = device.create_program(label, &vertex_wgsl, &fragment_wgsl)?;
    Ok(CompiledProgram {
        handle,
        vertex_inputs,
    })
}

/// Lowers `#define param_<NAME> <N>` lines to WGSL boolean constants.
/// Any other line passes through untouched.
pub(crate) fn lower_directives(source: &str) -> Result<String, RenderError> {
    let mut lowered = String::with_capacity(source.len());
    for line in source.split_inclusive('\n') {
        let body = line.trim_end_matches(['\r', '\n']);
        match parse_define(body) {
            Some((name, value)) => {
                let enabled = value.parse::<i64>().map_err(|_| {
                    RenderError::InvalidParameterValue {
                        name: name.to_string(),
                        value: value.to_string(),
                    }
                })? != 0;
                lowered.push_str(&format!("const param_{name}: bool = {enabled};"));
                lowered.push_str(&line[body.len()..]);
            }
            None => lowered.push_str(line),
        }
    }
    Ok(lowered)
}

/// Parses and validates one stage, returning its module.
fn check_stage(
    shader_name: &str,
    stage: ShaderStage,
    source: &str,
) -> Result<naga::Module, RenderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| RenderError::ShaderCompile {
        name: shader_name.to_string(),
        stage,
        log: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| RenderError::ShaderCompile {
        name: shader_name.to_string(),
        stage,
        log: e.emit_to_string(source),
    })?;

    Ok(module)
}

fn entry_point<'m>(
    module: &'m naga::Module,
    stage: naga::ShaderStage,
    entry: &str,
) -> Option<&'m naga::EntryPoint> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage && ep.name == entry)
}

/// Collects `(name, location)` for every user-facing binding of a function
/// argument list, flattening struct arguments.
fn collect_locations(module: &naga::Module, function: &naga::Function) -> Vec<(String, u32)> {
    let mut bindings = Vec::new();
    for argument in &function.arguments {
        match &argument.binding {
            Some(naga::Binding::Location { location, .. }) => {
                if let Some(name) = &argument.name {
                    bindings.push((name.clone(), *location));
                }
            }
            Some(naga::Binding::BuiltIn(_)) => {}
            None => {
                if let naga::TypeInner::Struct { members, .. } = &module.types[argument.ty].inner {
                    for member in members {
                        if let Some(naga::Binding::Location { location, .. }) = &member.binding {
                            if let Some(name) = &member.name {
                                bindings.push((name.clone(), *location));
                            }
                        }
                    }
                }
            }
        }
    }
    bindings
}

/// Locations produced by a function's result, flattening struct results.
fn result_locations(module: &naga::Module, function: &naga::Function) -> Vec<u32> {
    let Some(result) = &function.result else {
        return Vec::new();
    };
    match &result.binding {
        Some(naga::Binding::Location { location, .. }) => vec![*location],
        Some(naga::Binding::BuiltIn(_)) => Vec::new(),
        None => {
            let naga::TypeInner::Struct { members, .. } = &module.types[result.ty].inner else {
                return Vec::new();
            };
            members
                .iter()
                .filter_map(|member| match &member.binding {
                    Some(naga::Binding::Location { location, .. }) => Some(*location),
                    _ => None,
                })
                .collect()
        }
    }
}

/// Cross-stage interface check: every fragment input location must be fed by
/// a vertex output location.
fn link_check(
    shader_name: &str,
    vertex: &naga::Module,
    fragment: &naga::Module,
) -> Result<(), RenderError> {
    let vertex_entry =
        entry_point(vertex, naga::ShaderStage::Vertex, VERTEX_ENTRY).ok_or_else(|| {
            RenderError::ShaderCompile {
                name: shader_name.to_string(),
                stage: ShaderStage::Vertex,
                log: format!("no `{VERTEX_ENTRY}` vertex entry point"),
            }
        })?;
    let fragment_entry = entry_point(fragment, naga::ShaderStage::Fragment, FRAGMENT_ENTRY)
        .ok_or_else(|| RenderError::ShaderCompile {
            name: shader_name.to_string(),
            stage: ShaderStage::Fragment,
            log: format!("no `{FRAGMENT_ENTRY}` fragment entry point"),
        })?;

    let outputs = result_locations(vertex, &vertex_entry.function);
    for (name, location) in collect_locations(fragment, &fragment_entry.function) {
        if !outputs.contains(&location) {
            return Err(RenderError::ShaderLink {
                name: shader_name.to_string(),
                log: format!(
                    "fragment input `{name}` at location {location} has no matching vertex output"
                ),
            });
        }
    }
    Ok(())
}

/// Reflects the vertex entry point's inputs into a name-to-location map.
fn reflect_vertex_inputs(
    shader_name: &str,
    vertex: &naga::Module,
) -> Result<HashMap<String, u32>, RenderError> {
    let entry = entry_point(vertex, naga::ShaderStage::Vertex, VERTEX_ENTRY).ok_or_else(|| {
        RenderError::ShaderCompile {
            name: shader_name.to_string(),
            stage: ShaderStage::Vertex,
            log: format!("no `{VERTEX_ENTRY}` vertex entry point"),
        }
    })?;
    Ok(collect_locations(vertex, &entry.function).into_iter().collect())
}
