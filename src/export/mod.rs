//! Shading export: assignment resolution and material placement.
//!
//! The entry point is [`ExportContext`]: constructed per assignment object
//! (shading engine), it resolves the set of bound target paths and then
//! materializes and binds a material prim on the stage.

pub mod context;


pub use context::ExportContext;

use std::collections::BTreeMap;

use crate::path::ScenePath;
use crate::shade::tokens;

/// Mapping from native DAG path strings to target scene paths, produced
/// by the geometry export pass that precedes shading export.
pub type DagPathMap = BTreeMap<String, ScenePath>;

/// One resolved assignment: a target path plus the face indices bound to
/// the material there. An empty index set means whole-object binding.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub path: ScenePath,
    pub face_indices: Vec<i32>,
}

/// Resolved assignments in discovery order from the native connection
/// table. No target path appears twice.
pub type AssignmentVec = Vec<Assignment>;

/// Export configuration, passed by value into [`ExportContext::new`].
#[derive(Clone, Debug)]
pub struct ExportConfig {
    /// Native DAG paths under which bindings may be authored. Empty means
    /// the whole document is bindable.
    pub bindable_roots: Vec<String>,
    /// Optional target path that replaces the leading prefix of every
    /// mapped path.
    pub override_root: Option<ScenePath>,
    /// When set, direct bindings are skipped entirely; the caller authors
    /// collection-based bindings elsewhere.
    pub collection_based_bindings: bool,
    /// Author legacy face-grouping records instead of geometry subsets.
    pub legacy_face_sets: bool,
    /// Name of the surface-shader plug on the assignment object.
    pub surface_shader_plug: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            bindable_roots: Vec::new(),
            override_root: None,
            collection_based_bindings: false,
            legacy_face_sets: false,
            surface_shader_plug: tokens::SURFACE_SHADER.to_string(),
        }
    }
}
