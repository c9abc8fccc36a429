//! Shader source unit storage.
//!
//! The preprocessor and cache look up source text by unit name, both for
//! top-level stage sources (`<file>.vert.wgsl` / `<file>.frag.wgsl`) and for
//! `#include` targets. The built-in shader set ships embedded in the binary;
//! `MemoryShaderStore` backs tests and callers that supply their own units.

use std::collections::HashMap;

use crate::error::RenderError;

/// Named shader source lookup.
pub trait ShaderSourceStore {
    /// Loads a unit's full text. A name that cannot be resolved is a fatal
    /// missing-dependency error.
    fn load(&self, name: &str) -> Result<String, RenderError>;
}

static EMBEDDED_SOURCES: &[(&str, &str)] = &[
    (
        "view_transform.wgsl",
        include_str!("shaders/view_transform.wgsl"),
    ),
    ("simple.vert.wgsl", include_str!("shaders/simple.vert.wgsl")),
    ("simple.frag.wgsl", include_str!("shaders/simple.frag.wgsl")),
    (
        "vr_standard.vert.wgsl",
        include_str!("shaders/vr_standard.vert.wgsl"),
    ),
    (
        "vr_standard.frag.wgsl",
        include_str!("shaders/vr_standard.frag.wgsl"),
    ),
    (
        "vr_unlit.vert.wgsl",
        include_str!("shaders/vr_unlit.vert.wgsl"),
    ),
    (
        "vr_unlit.frag.wgsl",
        include_str!("shaders/vr_unlit.frag.wgsl"),
    ),
    ("water.vert.wgsl", include_str!("shaders/water.vert.wgsl")),
    ("water.frag.wgsl", include_str!("shaders/water.frag.wgsl")),
    (
        "dota_hero.vert.wgsl",
        include_str!("shaders/dota_hero.vert.wgsl"),
    ),
    (
        "dota_hero.frag.wgsl",
        include_str!("shaders/dota_hero.frag.wgsl"),
    ),
    (
        "multiblend.vert.wgsl",
        include_str!("shaders/multiblend.vert.wgsl"),
    ),
    (
        "multiblend.frag.wgsl",
        include_str!("shaders/multiblend.frag.wgsl"),
    ),
];

/// Serves the crate's built-in WGSL units.
#[derive(Debug, Default)]
pub struct EmbeddedShaderStore;

impl EmbeddedShaderStore {
    pub fn new() -> Self {
        Self
    }
}

impl ShaderSourceStore for EmbeddedShaderStore {
    fn load(&self, name: &str) -> Result<String, RenderError> {
        EMBEDDED_SOURCES
            .iter()
            .find(|(unit, _)| *unit == name)
            .map(|(_, source)| source.to_string())
            .ok_or_else(|| RenderError::MissingDependency(format!("shader source {name}")))
    }
}

/// Map-backed [`ShaderSourceStore`].
#[derive(Debug, Default)]
pub struct MemoryShaderStore {
    units: HashMap<String, String>,
}

impl MemoryShaderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, source: &str) {
        self.units.insert(name.to_string(), source.to_string());
    }
}

impl ShaderSourceStore for MemoryShaderStore {
    fn load(&self, name: &str) -> Result<String, RenderError> {
        self.units
            .get(name)
            .cloned()
            .ok_or_else(|| RenderError::MissingDependency(format!("shader source {name}")))
    }
}
