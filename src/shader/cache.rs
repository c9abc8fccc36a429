//! Compiled shader program cache.
//!
//! Owned by the rendering context and passed by reference; lives exactly as
//! long as the device whose programs it holds. Programs are cached for the
//! cache's whole lifetime, no eviction. Taking the cache by `&mut` makes the
//! get-or-compile sequence atomic per key: there is no window for a second
//! compile of the same variant.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use log::{debug, info};

use crate::error::RenderError;
use crate::gfx::device::RenderDevice;
use crate::shader::store::ShaderSourceStore;
use crate::shader::{compiler, preprocess, ShaderParams, ShaderProgram};

/// Maps a material's shader name onto the canonical shader file identity.
/// The table is fixed and case-sensitive; unrecognized names fall back to
/// the simple shader.
pub fn shader_file_for_name(shader_name: &str) -> &'static str {
    match shader_name {
        "vr_standard.vfx" => "vr_standard",
        "vr_unlit.vfx" => "vr_unlit",
        "water_dota.vfx" => "water",
        "hero.vfx" => "dota_hero",
        "multiblend.vfx" => "multiblend",
        _ => "simple",
    }
}

/// Uniquely identifies a compiled shader variant: the file identity plus the
/// declared-parameter assignment, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ShaderCacheKey {
    file: &'static str,
    params: Vec<(String, bool)>,
}

fn cache_key(
    file: &'static str,
    declared: &BTreeSet<String>,
    params: &ShaderParams,
) -> ShaderCacheKey {
    // Only names the source actually declares participate; unrelated
    // caller-supplied names must not affect the key.
    let params = declared
        .iter()
        .filter_map(|name| params.get(name).map(|value| (name.clone(), *value)))
        .collect();
    ShaderCacheKey { file, params }
}

/// Process-lifetime cache of compiled shader programs.
#[derive(Debug, Default)]
pub struct ShaderCache {
    programs: HashMap<ShaderCacheKey, Arc<ShaderProgram>>,
    /// Declared parameter names per shader file, learned on first compile.
    declared_params: HashMap<&'static str, BTreeSet<String>>,
}

impl ShaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct compiled variants held.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Returns the program for `(shader_name, params)`, compiling it on the
    /// first request for that variant.
    pub fn get(
        &mut self,
        shader_name: &str,
        params: &ShaderParams,
        store: &dyn ShaderSourceStore,
        device: &mut dyn RenderDevice,
    ) -> Result<Arc<ShaderProgram>, RenderError> {
        let file = shader_file_for_name(shader_name);

        if let Some(declared) = self.declared_params.get(file) {
            let key = cache_key(file, declared, params);
            if let Some(program) = self.programs.get(&key) {
                debug!("shader cache hit for {shader_name} ({file})");
                return Ok(Arc::clone(program));
            }
        }

        let vertex_source = store.load(&format!("{file}.vert.wgsl"))?;
        let fragment_source = store.load(&format!("{file}.frag.wgsl"))?;

        // Parameters are discovered from the top-level stage sources, the
        // same text the overrides apply to.
        let mut declared = preprocess::find_parameters(&vertex_source);
        declared.extend(preprocess::find_parameters(&fragment_source));
        let render_modes = preprocess::render_modes(&declared);

        // The vertex stage gets overrides and include expansion; the
        // fragment stage gets overrides only.
        let vertex_source = preprocess::apply_parameter_overrides(&vertex_source, params);
        let vertex_source = preprocess::resolve_includes(&vertex_source, store)?;
        let fragment_source = preprocess::apply_parameter_overrides(&fragment_source, params);

        let compiled = compiler::compile(
            device,
            shader_name,
            file,
            &vertex_source,
            &fragment_source,
        )?;

        let key = cache_key(file, &declared, params);
        let program = Arc::new(ShaderProgram {
            name: shader_name.to_string(),
            file,
            handle: compiled.handle,
            params: params.clone(),
            declared_params: declared.clone(),
            render_modes,
            vertex_inputs: compiled.vertex_inputs,
        });
        self.declared_params.insert(file, declared);
        self.programs.insert(key, Arc::clone(&program));
        info!("shader {shader_name} ({file}) compiled and linked");

        Ok(program)
    }
}
