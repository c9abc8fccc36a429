//! Material name resolution.
//!
//! Material descriptors live in their own resource files and are loaded by a
//! collaborator outside this crate; the draw-call builder only needs the
//! resolved name and shader file name. `MaterialTable` is a minimal map-backed
//! resolver for callers that preload their materials (and for tests).

use std::collections::HashMap;

use crate::error::RenderError;

/// Resolved material descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    /// Material resource name, also the draw-call sort key.
    pub name: String,
    /// Shader name the material requests, e.g. `vr_standard.vfx`.
    pub shader_name: String,
}

impl Material {
    pub fn new(name: &str, shader_name: &str) -> Self {
        Self {
            name: name.to_string(),
            shader_name: shader_name.to_string(),
        }
    }
}

/// Looks up material descriptors by resource name.
///
/// A name that cannot be resolved is a fatal error for the draw call that
/// references it; there is no silent fallback material at this layer.
pub trait MaterialResolver {
    fn resolve(&self, name: &str) -> Result<Material, RenderError>;
}

/// Map-backed [`MaterialResolver`].
#[derive(Debug, Default)]
pub struct MaterialTable {
    materials: HashMap<String, Material>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a material under its own name.
    pub fn insert(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl MaterialResolver for MaterialTable {
    fn resolve(&self, name: &str) -> Result<Material, RenderError> {
        self.materials
            .get(name)
            .cloned()
            .ok_or_else(|| RenderError::MissingDependency(format!("material {name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_registered_material() {
        let mut table = MaterialTable::new();
        table.insert(Material::new("models/props/crate", "vr_standard.vfx"));

        let material = table.resolve("models/props/crate").unwrap();
        assert_eq!(material.shader_name, "vr_standard.vfx");
    }

    #[test]
    fn test_missing_material_is_fatal() {
        let table = MaterialTable::new();
        let err = table.resolve("models/props/barrel").unwrap_err();
        assert!(matches!(err, RenderError::MissingDependency(_)));
        assert!(err.to_string().contains("models/props/barrel"));
    }
}
