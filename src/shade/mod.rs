//! Shading schema wrappers over the stage.
//!
//! Thin typed views in the spirit of schema wrappers elsewhere in the
//! codebase: a wrapper holds the prim handle and path, and authors the
//! attributes and relationships its schema prescribes.

pub mod binding;

use crate::path::ScenePath;
use crate::stage::{types, PrimIndex, Stage, Value};
use crate::util::Result;

/// Well-known names of the shading schema.
pub mod tokens {
    /// Default surface-shader plug name on an assignment object.
    pub const SURFACE_SHADER: &str = "surfaceShader";
    /// Fixed child name of the material-library scope.
    pub const LOOKS: &str = "Looks";

    // Prim type names.
    pub const MATERIAL: &str = "Material";
    pub const SHADER: &str = "Shader";
    pub const SCOPE: &str = "Scope";
    pub const GEOM_SUBSET: &str = "GeomSubset";

    // Subset element kinds and family types.
    pub const FACE: &str = "face";
    pub const PARTITION: &str = "partition";
    pub const MATERIAL_BIND: &str = "materialBind";

    // Attribute / relationship names.
    pub const MATERIAL_BINDING: &str = "material:binding";
    pub const INFO_ID: &str = "info:id";
    pub const ELEMENT_TYPE: &str = "elementType";
    pub const FAMILY_NAME: &str = "familyName";
    pub const INDICES: &str = "indices";
    /// Family-type attribute for the materialBind subset family.
    pub const MATERIAL_BIND_FAMILY_TYPE: &str = "subsetFamily:materialBind:familyType";
}

/// Namespaced input attribute name ("inputs:scale").
pub fn input_attr(name: &str) -> String {
    format!("inputs:{name}")
}

/// Namespaced output attribute name ("outputs:rgb").
pub fn output_attr(name: &str) -> String {
    format!("outputs:{name}")
}

/// A material prim: root of a shading network and binding target source.
#[derive(Clone, Debug)]
pub struct Material {
    prim: PrimIndex,
    path: ScenePath,
}

impl Material {
    /// Define (look-up-or-create) a Material prim at the path.
    pub fn define(stage: &mut Stage, path: &ScenePath) -> Result<Self> {
        let prim = stage.define_prim(path, tokens::MATERIAL)?;
        Ok(Self {
            prim,
            path: path.clone(),
        })
    }

    pub fn prim(&self) -> PrimIndex {
        self.prim
    }

    pub fn path(&self) -> &ScenePath {
        &self.path
    }

    /// Bind this material directly to a prim.
    pub fn bind(&self, stage: &mut Stage, prim: PrimIndex) {
        binding::bind_material(stage, prim, &self.path);
    }
}

/// A shader prim: one node of a shading network.
#[derive(Clone, Debug)]
pub struct Shader {
    prim: PrimIndex,
    path: ScenePath,
}

impl Shader {
    /// Define (look-up-or-create) a Shader prim at the path.
    pub fn define(stage: &mut Stage, path: &ScenePath) -> Result<Self> {
        let prim = stage.define_prim(path, tokens::SHADER)?;
        Ok(Self {
            prim,
            path: path.clone(),
        })
    }

    pub fn prim(&self) -> PrimIndex {
        self.prim
    }

    pub fn path(&self) -> &ScenePath {
        &self.path
    }

    /// Author the shader's `info:id` token.
    pub fn create_id_attr(&self, stage: &mut Stage, id: &str) {
        stage
            .prim_mut(self.prim)
            .create_attribute(tokens::INFO_ID, types::TOKEN)
            .set(Value::Token(id.to_string()));
    }

    /// Create a typed input, authoring a value at a time sample or at the
    /// default when `time` is `None`.
    pub fn set_input(
        &self,
        stage: &mut Stage,
        name: &str,
        type_name: &str,
        value: Value,
        time: Option<f64>,
    ) {
        stage
            .prim_mut(self.prim)
            .create_attribute(&input_attr(name), type_name)
            .set_maybe_timed(time, value);
    }

    /// Create a typed input without a value (connection endpoint).
    pub fn create_input(&self, stage: &mut Stage, name: &str, type_name: &str) {
        stage
            .prim_mut(self.prim)
            .create_attribute(&input_attr(name), type_name);
    }

    /// Create a typed output.
    pub fn create_output(&self, stage: &mut Stage, name: &str, type_name: &str) {
        stage
            .prim_mut(self.prim)
            .create_attribute(&output_attr(name), type_name);
    }

    /// Connect one of this shader's inputs to another shader's output.
    pub fn connect_input(
        &self,
        stage: &mut Stage,
        input: &str,
        type_name: &str,
        source: &Shader,
        output: &str,
    ) {
        stage
            .prim_mut(self.prim)
            .create_attribute(&input_attr(input), type_name)
            .connect(source.path.clone(), &output_attr(output));
    }
}
