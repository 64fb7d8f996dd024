//! Per-attribute shading translators.
//!
//! A [`ShaderWriter`] owns one target shader prim and copies the attribute
//! values of one native shading node onto it. Writers are looked up by
//! native node type through a [`WriterRegistry`] built at export start and
//! passed by value to the export pass.

pub mod file_texture;

use std::collections::HashMap;

use tracing::debug;

use crate::path::ScenePath;
use crate::scene::{NodeId, SceneGraph};
use crate::shade::Shader;
use crate::stage::Stage;
use crate::util::Result;

pub use file_texture::FileTextureWriter;

/// Copies one native shading node's attributes onto a target shader prim.
///
/// Construction (via the registry factory) defines the shader prim and any
/// fixed sub-network; `write` authors the attribute values themselves.
pub trait ShaderWriter {
    /// Author attribute values, at a time sample or at the default when
    /// `time` is `None`. Missing plugs are skipped, never errors.
    fn write(&mut self, scene: &SceneGraph, stage: &mut Stage, time: Option<f64>) -> Result<()>;

    /// Resolve a native output-plug name to its namespaced target attribute
    /// name ("outputs:rgb"), creating the typed output on the shader prim as
    /// a side effect. `None` for names this writer does not map.
    fn shading_attr_name(&mut self, stage: &mut Stage, native_attr: &str) -> Option<String>;

    /// The shader prim this writer authors to.
    fn shader(&self) -> &Shader;
}

/// Factory signature for registry entries.
pub type WriterFactory =
    fn(&SceneGraph, NodeId, &ScenePath, &mut Stage) -> Result<Box<dyn ShaderWriter>>;

/// Native node type name → writer factory.
#[derive(Clone, Default)]
pub struct WriterRegistry {
    factories: HashMap<String, WriterFactory>,
}

impl WriterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in writer registered.
    pub fn with_standard_writers() -> Self {
        let mut registry = Self::new();
        registry.register(FileTextureWriter::NODE_TYPE, |scene, node, path, stage| {
            let writer = FileTextureWriter::new(scene, node, path, stage)?;
            Ok(Box::new(writer) as Box<dyn ShaderWriter>)
        });
        registry
    }

    pub fn register(&mut self, node_type: &str, factory: WriterFactory) {
        self.factories.insert(node_type.to_string(), factory);
    }

    /// Instantiate a writer for a native node, or `None` if its type has no
    /// registered factory.
    pub fn writer_for(
        &self,
        scene: &SceneGraph,
        node: NodeId,
        path: &ScenePath,
        stage: &mut Stage,
    ) -> Option<Result<Box<dyn ShaderWriter>>> {
        let node_type = scene.node_type(node);
        let factory = self.factories.get(node_type)?;
        debug!(node = scene.node_name(node), node_type, shader = %path, "creating shader writer");
        Some(factory(scene, node, path, stage))
    }
}
