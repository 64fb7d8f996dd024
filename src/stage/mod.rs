//! In-memory target document: a path-indexed prim arena.
//!
//! The stage is the write side of the export pass. Prims are owned by the
//! stage and referenced by [`PrimIndex`] (an index into the arena) rather
//! than by pointer, so handles stay valid across later prim creation.
//! Every creation operation is look-up-or-create; re-running an export with
//! identical inputs leaves the document unchanged.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::path::ScenePath;
use crate::util::{Error, Result};

/// Attribute value type names used across the shading schema.
pub mod types {
    pub const BOOL: &str = "bool";
    pub const INT: &str = "int";
    pub const FLOAT: &str = "float";
    pub const DOUBLE: &str = "double";
    pub const STRING: &str = "string";
    pub const TOKEN: &str = "token";
    pub const ASSET: &str = "asset";
    pub const FLOAT2: &str = "float2";
    pub const FLOAT3: &str = "float3";
    pub const FLOAT4: &str = "float4";
    pub const INT_ARRAY: &str = "int[]";
}

/// A typed attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    String(String),
    /// Token value (enumerated name, e.g. "repeat" or "face").
    Token(String),
    /// Asset path value (e.g. a texture file path).
    Asset(String),
    Float2(glam::Vec2),
    Float3(glam::Vec3),
    Float4(glam::Vec4),
    IntArray(Vec<i32>),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "\"{v}\""),
            Value::Token(v) => write!(f, "\"{v}\""),
            Value::Asset(v) => write!(f, "@{v}@"),
            Value::Float2(v) => write!(f, "({}, {})", v.x, v.y),
            Value::Float3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Value::Float4(v) => write!(f, "({}, {}, {}, {})", v.x, v.y, v.z, v.w),
            Value::IntArray(v) => {
                write!(f, "[")?;
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{x}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Source endpoint of an attribute connection: prim path + attribute name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttrSource {
    pub prim: ScenePath,
    pub attr: String,
}

/// An authored attribute: declared type, optional default, time samples,
/// and connection sources.
#[derive(Clone, Debug, Default)]
pub struct Attribute {
    type_name: String,
    default: Option<Value>,
    samples: Vec<(f64, Value)>,
    connections: Vec<AttrSource>,
}

impl Attribute {
    fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            ..Default::default()
        }
    }

    /// Declared value type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Author the default value.
    pub fn set(&mut self, value: Value) {
        self.default = Some(value);
    }

    /// Author a value at a time sample. Re-authoring the same time
    /// replaces the sample.
    pub fn set_at(&mut self, time: f64, value: Value) {
        match self.samples.iter_mut().find(|(t, _)| *t == time) {
            Some((_, v)) => *v = value,
            None => {
                self.samples.push((time, value));
                self.samples.sort_by(|a, b| a.0.total_cmp(&b.0));
            }
        }
    }

    /// Author at a time sample, or at the default when `time` is `None`.
    pub fn set_maybe_timed(&mut self, time: Option<f64>, value: Value) {
        match time {
            Some(t) => self.set_at(t, value),
            None => self.set(value),
        }
    }

    /// Connect this attribute to a source output. Duplicate connections
    /// are dropped.
    pub fn connect(&mut self, prim: ScenePath, attr: &str) {
        let src = AttrSource {
            prim,
            attr: attr.to_string(),
        };
        if !self.connections.contains(&src) {
            self.connections.push(src);
        }
    }

    /// Authored default value, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Value at the given time sample.
    pub fn value_at(&self, time: f64) -> Option<&Value> {
        self.samples
            .iter()
            .find(|(t, _)| *t == time)
            .map(|(_, v)| v)
    }

    /// Value at a time sample, or the default when `time` is `None`.
    pub fn value(&self, time: Option<f64>) -> Option<&Value> {
        match time {
            Some(t) => self.value_at(t),
            None => self.default_value(),
        }
    }

    /// Connection sources.
    pub fn connections(&self) -> &[AttrSource] {
        &self.connections
    }

    /// Whether a default or any time sample has been authored.
    pub fn is_authored(&self) -> bool {
        self.default.is_some() || !self.samples.is_empty()
    }
}

/// Prim specifier: concrete definition or speculative override.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Specifier {
    Def,
    Over,
}

/// A legacy face-grouping record: face indices plus the bound material.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceGroup {
    pub indices: Vec<i32>,
    pub material: ScenePath,
}

/// A prim in the stage.
#[derive(Clone, Debug)]
pub struct Prim {
    path: ScenePath,
    specifier: Specifier,
    type_name: Option<String>,
    instanceable: bool,
    attributes: BTreeMap<String, Attribute>,
    relationships: BTreeMap<String, Vec<ScenePath>>,
    face_groups: Vec<FaceGroup>,
}

impl Prim {
    fn new(path: ScenePath, specifier: Specifier) -> Self {
        Self {
            path,
            specifier,
            type_name: None,
            instanceable: false,
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
            face_groups: Vec::new(),
        }
    }

    pub fn path(&self) -> &ScenePath {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn specifier(&self) -> Specifier {
        self.specifier
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Whether this prim is flagged as an instantiable prototype instance.
    pub fn is_instanceable(&self) -> bool {
        self.instanceable
    }

    pub fn set_instanceable(&mut self, instanceable: bool) {
        self.instanceable = instanceable;
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Look-up-or-create an attribute. An existing attribute keeps its
    /// declared type.
    pub fn create_attribute(&mut self, name: &str, type_name: &str) -> &mut Attribute {
        self.attributes
            .entry(name.to_string())
            .or_insert_with(|| Attribute::new(type_name))
    }

    /// Attribute names in sorted order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(|s| s.as_str())
    }

    /// Look-up-or-create a relationship and add a target. Duplicate
    /// targets are dropped.
    pub fn add_relationship_target(&mut self, name: &str, target: ScenePath) {
        let targets = self.relationships.entry(name.to_string()).or_default();
        if !targets.contains(&target) {
            targets.push(target);
        }
    }

    /// Replace all targets of a relationship.
    pub fn set_relationship_targets(&mut self, name: &str, targets: Vec<ScenePath>) {
        self.relationships.insert(name.to_string(), targets);
    }

    /// Targets of a relationship, if authored.
    pub fn relationship_targets(&self, name: &str) -> Option<&[ScenePath]> {
        self.relationships.get(name).map(|v| v.as_slice())
    }

    /// Relationship names in sorted order.
    pub fn relationship_names(&self) -> impl Iterator<Item = &str> {
        self.relationships.keys().map(|s| s.as_str())
    }

    /// Append a legacy face group. An identical group is not duplicated.
    pub fn append_face_group(&mut self, group: FaceGroup) {
        if !self.face_groups.contains(&group) {
            self.face_groups.push(group);
        }
    }

    /// Legacy face groups authored on this prim.
    pub fn face_groups(&self) -> &[FaceGroup] {
        &self.face_groups
    }
}

/// Stable handle to a prim: an index into the stage's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PrimIndex(usize);

/// The target document.
pub struct Stage {
    prims: Vec<Prim>,
    index: BTreeMap<ScenePath, PrimIndex>,
    root_layer_path: Option<PathBuf>,
}

impl Stage {
    /// Create an empty stage containing only the pseudo-root.
    pub fn new() -> Self {
        let root = Prim::new(ScenePath::root(), Specifier::Def);
        let mut index = BTreeMap::new();
        index.insert(ScenePath::root(), PrimIndex(0));
        Self {
            prims: vec![root],
            index,
            root_layer_path: None,
        }
    }

    /// The pseudo-root prim.
    pub fn pseudo_root(&self) -> PrimIndex {
        PrimIndex(0)
    }

    /// File-system location of the root layer, when the caller intends to
    /// write the document to disk. Used for best-effort relative pathing
    /// of asset references.
    pub fn root_layer_path(&self) -> Option<&PathBuf> {
        self.root_layer_path.as_ref()
    }

    pub fn set_root_layer_path(&mut self, path: impl Into<PathBuf>) {
        self.root_layer_path = Some(path.into());
    }

    /// Look up a prim by path.
    pub fn prim_at(&self, path: &ScenePath) -> Option<PrimIndex> {
        self.index.get(path).copied()
    }

    /// Whether a prim exists at the path.
    pub fn has_prim(&self, path: &ScenePath) -> bool {
        self.index.contains_key(path)
    }

    /// Borrow a prim.
    pub fn prim(&self, idx: PrimIndex) -> &Prim {
        &self.prims[idx.0]
    }

    /// Mutably borrow a prim.
    pub fn prim_mut(&mut self, idx: PrimIndex) -> &mut Prim {
        &mut self.prims[idx.0]
    }

    /// Total number of prims, pseudo-root included.
    pub fn num_prims(&self) -> usize {
        self.prims.len()
    }

    /// Direct children of a prim, in path order.
    pub fn children(&self, idx: PrimIndex) -> Vec<PrimIndex> {
        let parent = self.prims[idx.0].path.clone();
        self.index
            .iter()
            .filter(|(p, _)| p.parent().as_ref() == Some(&parent))
            .map(|(_, i)| *i)
            .collect()
    }

    fn insert(&mut self, path: ScenePath, specifier: Specifier) -> PrimIndex {
        let idx = PrimIndex(self.prims.len());
        self.prims.push(Prim::new(path.clone(), specifier));
        self.index.insert(path, idx);
        idx
    }

    /// Ensure a prim exists at the path, creating speculative overrides for
    /// it and any missing ancestors. Existing prims are returned untouched.
    pub fn override_prim(&mut self, path: &ScenePath) -> PrimIndex {
        if path.is_root() {
            return self.pseudo_root();
        }
        let mut last = self.pseudo_root();
        for prefix in path.prefixes() {
            last = match self.prim_at(&prefix) {
                Some(idx) => idx,
                None => self.insert(prefix, Specifier::Over),
            };
        }
        last
    }

    /// Define a typed prim at the path (look-up-or-create).
    ///
    /// Missing ancestors become overrides. An existing prim is promoted to
    /// a concrete definition and assigned the type; a conflicting existing
    /// type is an error and the stage is left unchanged.
    pub fn define_prim(&mut self, path: &ScenePath, type_name: &str) -> Result<PrimIndex> {
        if path.is_root() {
            return Err(Error::RootNotWritable(type_name.to_string()));
        }
        if let Some(idx) = self.prim_at(path) {
            match self.prims[idx.0].type_name.as_deref() {
                Some(existing) if existing != type_name => {
                    return Err(Error::SchemaMismatch {
                        path: path.to_string(),
                        expected: type_name.to_string(),
                        actual: existing.to_string(),
                    });
                }
                _ => {}
            }
            let prim = &mut self.prims[idx.0];
            prim.specifier = Specifier::Def;
            prim.type_name = Some(type_name.to_string());
            return Ok(idx);
        }
        if let Some(parent) = path.parent() {
            self.override_prim(&parent);
        }
        let idx = self.insert(path.clone(), Specifier::Def);
        self.prims[idx.0].type_name = Some(type_name.to_string());
        Ok(idx)
    }

    /// Dump the document as a usda-flavored text listing. Debug aid only.
    pub fn to_text(&self) -> String {
        let mut out = String::from("#usda 1.0\n");
        for child in self.children(self.pseudo_root()) {
            self.write_prim_text(child, 0, &mut out);
        }
        out
    }

    fn write_prim_text(&self, idx: PrimIndex, depth: usize, out: &mut String) {
        use std::fmt::Write;

        let prim = self.prim(idx);
        let indent = "    ".repeat(depth);
        let spec = match prim.specifier {
            Specifier::Def => "def",
            Specifier::Over => "over",
        };
        let _ = write!(out, "\n{indent}{spec}");
        if let Some(t) = prim.type_name() {
            let _ = write!(out, " {t}");
        }
        let _ = write!(out, " \"{}\"", prim.name());
        if prim.instanceable {
            let _ = write!(out, " (instanceable = true)");
        }
        let _ = writeln!(out, "\n{indent}{{");

        for name in prim.attribute_names() {
            let attr = &prim.attributes[name];
            if let Some(v) = attr.default_value() {
                let _ = writeln!(out, "{indent}    {} {name} = {v}", attr.type_name);
            }
            for (t, v) in &attr.samples {
                let _ = writeln!(out, "{indent}    {} {name}.timeSamples[{t}] = {v}", attr.type_name);
            }
            for src in attr.connections() {
                let _ = writeln!(
                    out,
                    "{indent}    {} {name}.connect = <{}.{}>",
                    attr.type_name, src.prim, src.attr
                );
            }
        }
        for name in prim.relationship_names() {
            let targets = &prim.relationships[name];
            let list: Vec<String> = targets.iter().map(|t| format!("<{t}>")).collect();
            let _ = writeln!(out, "{indent}    rel {name} = [{}]", list.join(", "));
        }
        for group in prim.face_groups() {
            let _ = writeln!(
                out,
                "{indent}    faceGroup {:?} -> <{}>",
                group.indices, group.material
            );
        }

        for child in self.children(idx) {
            self.write_prim_text(child, depth + 1, out);
        }
        let _ = writeln!(out, "{indent}}}");
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> ScenePath {
        ScenePath::parse(s).unwrap()
    }

    #[test]
    fn test_override_prim_creates_ancestors() {
        let mut stage = Stage::new();
        let idx = stage.override_prim(&p("/World/geo/mesh"));
        assert_eq!(stage.prim(idx).path(), &p("/World/geo/mesh"));
        assert!(stage.has_prim(&p("/World")));
        assert!(stage.has_prim(&p("/World/geo")));
        assert_eq!(stage.prim(idx).specifier(), Specifier::Over);
    }

    #[test]
    fn test_override_prim_idempotent() {
        let mut stage = Stage::new();
        let a = stage.override_prim(&p("/World/geo"));
        let before = stage.num_prims();
        let b = stage.override_prim(&p("/World/geo"));
        assert_eq!(a, b);
        assert_eq!(stage.num_prims(), before);
    }

    #[test]
    fn test_define_prim() {
        let mut stage = Stage::new();
        let idx = stage.define_prim(&p("/World/Looks/mat"), "Material").unwrap();
        assert_eq!(stage.prim(idx).type_name(), Some("Material"));
        assert_eq!(stage.prim(idx).specifier(), Specifier::Def);

        // Redefinition finds the same prim.
        let again = stage.define_prim(&p("/World/Looks/mat"), "Material").unwrap();
        assert_eq!(idx, again);

        // Conflicting type is an error.
        assert!(stage.define_prim(&p("/World/Looks/mat"), "Scope").is_err());

        // Defining over an override promotes it.
        stage.override_prim(&p("/World/other"));
        let promoted = stage.define_prim(&p("/World/other"), "Scope").unwrap();
        assert_eq!(stage.prim(promoted).specifier(), Specifier::Def);
    }

    #[test]
    fn test_define_at_root_fails() {
        let mut stage = Stage::new();
        assert!(stage.define_prim(&ScenePath::root(), "Scope").is_err());
    }

    #[test]
    fn test_attributes() {
        let mut stage = Stage::new();
        let idx = stage.define_prim(&p("/World/shader"), "Shader").unwrap();
        let prim = stage.prim_mut(idx);

        let attr = prim.create_attribute("inputs:scale", types::FLOAT4);
        assert!(!attr.is_authored());
        attr.set(Value::Float4(glam::vec4(1.0, 1.0, 1.0, 0.5)));
        assert!(attr.is_authored());

        let attr = prim.create_attribute("inputs:file", types::ASSET);
        attr.set_at(1.0, Value::Asset("tex.png".to_string()));
        attr.set_at(1.0, Value::Asset("tex2.png".to_string()));
        assert_eq!(
            attr.value_at(1.0),
            Some(&Value::Asset("tex2.png".to_string()))
        );
        assert_eq!(attr.default_value(), None);
    }

    #[test]
    fn test_connections_dedup() {
        let mut attr = Attribute::new(types::FLOAT2);
        attr.connect(p("/World/tex/reader"), "outputs:result");
        attr.connect(p("/World/tex/reader"), "outputs:result");
        assert_eq!(attr.connections().len(), 1);
    }

    #[test]
    fn test_relationships_dedup() {
        let mut stage = Stage::new();
        let idx = stage.override_prim(&p("/World/mesh"));
        let prim = stage.prim_mut(idx);
        prim.add_relationship_target("material:binding", p("/World/Looks/mat"));
        prim.add_relationship_target("material:binding", p("/World/Looks/mat"));
        assert_eq!(
            prim.relationship_targets("material:binding").unwrap().len(),
            1
        );
    }

    #[test]
    fn test_children_order() {
        let mut stage = Stage::new();
        stage.override_prim(&p("/World/b"));
        stage.override_prim(&p("/World/a"));
        let world = stage.prim_at(&p("/World")).unwrap();
        let names: Vec<String> = stage
            .children(world)
            .iter()
            .map(|&c| stage.prim(c).name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_to_text_smoke() {
        let mut stage = Stage::new();
        let idx = stage.define_prim(&p("/World/Looks/mat"), "Material").unwrap();
        stage
            .prim_mut(idx)
            .create_attribute("inputs:diffuse", types::FLOAT3)
            .set(Value::Float3(glam::vec3(0.5, 0.5, 0.5)));
        let text = stage.to_text();
        assert!(text.contains("def Material \"mat\""));
        assert!(text.contains("inputs:diffuse"));
    }
}
