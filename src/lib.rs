//! # Shadebridge
//!
//! Material-assignment and shading export bridge between a DCC scene graph
//! and a USD-style stage.
//!
//! The core is the per-shading-engine [`export::ExportContext`]: it resolves
//! which geometry an assignment object is bound to (instancing, per-face
//! components, namespace overrides included), picks a deterministic location
//! for the synthesized material prim, and authors one of three binding
//! encodings per target (direct binding, legacy face group, geometry
//! subset).
//!
//! ## Modules
//!
//! - [`util`] - Errors, name mangling, relative paths
//! - [`path`] - Target-path algebra
//! - [`stage`] - Target document (prims, attributes, relationships)
//! - [`scene`] - Read-only DCC scene-graph oracle
//! - [`shade`] - Shading schema wrappers (Material, Shader, subsets)
//! - [`export`] - Assignment resolution and material placement
//! - [`translate`] - Per-node-type shader writers
//!
//! ## Example
//!
//! ```ignore
//! use shadebridge::prelude::*;
//!
//! let ctx = ExportContext::new(engine, &scene, &dag_path_map, ExportConfig::default());
//! let assignments = ctx.assignments();
//! let material = ctx.make_standard_material_prim(&mut stage, &assignments, "", None);
//! ```

pub mod util;
pub mod path;
pub mod stage;
pub mod scene;
pub mod shade;
pub mod export;
pub mod translate;

// Re-export commonly used types
pub use path::ScenePath;
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::export::{Assignment, DagPathMap, ExportConfig, ExportContext};
    pub use crate::path::ScenePath;
    pub use crate::scene::{AttrValue, NodeId, SceneGraph};
    pub use crate::shade::{Material, Shader};
    pub use crate::stage::{Stage, Value};
    pub use crate::translate::{ShaderWriter, WriterRegistry};
    pub use crate::util::{Error, Result};
}
