//! Read-only DCC scene-graph oracle.
//!
//! Models the slice of a host application's dependency graph that shading
//! export needs: nodes with typed plugs, plug-to-plug connections, array
//! plugs with logical indices, instanced DAG paths, and per-instance
//! "connected sets and members" queries.
//!
//! The graph is built up front (tests and the demo binary use the builder
//! methods) and is never mutated during an export pass. Handles are arena
//! indices; the graph outlives every resolver that borrows it.

use std::collections::HashMap;

/// Handle to a node in the graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Handle to a plug (attribute endpoint) on a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlugId(usize);

/// A typed plug value.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Float3(glam::Vec3),
    String(String),
}

/// A per-face component: the faces of one member of an assignment set,
/// in iteration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceComponent {
    indices: Vec<i32>,
}

impl FaceComponent {
    pub fn new(indices: Vec<i32>) -> Self {
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate face indices in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.indices.iter().copied()
    }
}

/// One DAG path to a node. The instance number is the position of the
/// path in the node's path enumeration.
#[derive(Clone, Debug)]
pub struct DagPath {
    path: String,
    instance: u32,
}

impl DagPath {
    /// Full path string ("|root|geo|meshShape").
    pub fn full_path(&self) -> &str {
        &self.path
    }

    pub fn instance_number(&self) -> u32 {
        self.instance
    }
}

/// One entry of a "connected sets and members" query: the owning set and
/// an optional face component (absent for whole-object membership).
#[derive(Clone, Debug)]
pub struct SetMember {
    pub set: NodeId,
    pub component: Option<FaceComponent>,
}

struct Membership {
    instance: u32,
    set: NodeId,
    component: Option<FaceComponent>,
}

struct Plug {
    node: NodeId,
    /// Attribute name; elements carry their owning array's name.
    name: String,
    /// Owning array for elements; owning element for child arrays.
    parent: Option<PlugId>,
    logical_index: Option<u32>,
    is_array: bool,
    /// Element plugs in physical (creation) order.
    elements: Vec<PlugId>,
    value: Option<AttrValue>,
    authored: bool,
}

struct Node {
    name: String,
    type_name: String,
    plugs: HashMap<String, PlugId>,
    dag_paths: Vec<DagPath>,
    memberships: Vec<Membership>,
}

/// The scene graph arena.
pub struct SceneGraph {
    nodes: Vec<Node>,
    plugs: Vec<Plug>,
    /// Incoming connection per destination plug.
    sources: HashMap<PlugId, PlugId>,
}

/// Borrowed view of a plug with its graph, for connection traversal and
/// array/compound introspection.
#[derive(Clone, Copy)]
pub struct PlugRef<'a> {
    graph: &'a SceneGraph,
    id: PlugId,
}

impl<'a> PlugRef<'a> {
    pub fn id(&self) -> PlugId {
        self.id
    }

    fn raw(&self) -> &'a Plug {
        &self.graph.plugs[self.id.0]
    }

    /// Owning node.
    pub fn node(&self) -> NodeId {
        self.raw().node
    }

    /// Attribute name. Elements report their owning array's name.
    pub fn name(&self) -> &'a str {
        &self.raw().name
    }

    /// Whether this plug is an array (multi) plug.
    pub fn is_array(&self) -> bool {
        self.raw().is_array
    }

    /// Whether this plug is an indexed element of an array.
    pub fn is_element(&self) -> bool {
        self.raw().logical_index.is_some()
    }

    /// Whether this plug is a child of an array element (nested array).
    pub fn is_child(&self) -> bool {
        match self.raw().parent {
            Some(parent) => self.graph.plugs[parent.0].logical_index.is_some(),
            None => false,
        }
    }

    /// The owning array of an element plug.
    pub fn array(&self) -> Option<PlugRef<'a>> {
        if !self.is_element() {
            return None;
        }
        self.raw().parent.map(|p| self.graph.plug_ref(p))
    }

    /// The parent plug (element owning a child array, or array owning an
    /// element).
    pub fn parent(&self) -> Option<PlugRef<'a>> {
        self.raw().parent.map(|p| self.graph.plug_ref(p))
    }

    /// Logical index of an element plug.
    pub fn logical_index(&self) -> Option<u32> {
        self.raw().logical_index
    }

    /// Element plugs in physical order.
    pub fn elements(&self) -> impl Iterator<Item = PlugRef<'a>> + '_ {
        self.raw().elements.iter().map(|&e| self.graph.plug_ref(e))
    }

    /// Elements that have an incoming connection, in physical order.
    pub fn connected_elements(&self) -> Vec<PlugRef<'a>> {
        self.raw()
            .elements
            .iter()
            .filter(|&&e| self.graph.sources.contains_key(&e))
            .map(|&e| self.graph.plug_ref(e))
            .collect()
    }

    /// Follow the incoming connection to the source plug.
    pub fn connected_source(&self) -> Option<PlugRef<'a>> {
        self.graph
            .sources
            .get(&self.id)
            .map(|&src| self.graph.plug_ref(src))
    }

    /// Whether a value has been explicitly authored on this plug, as
    /// opposed to left at its node-type default.
    pub fn is_authored(&self) -> bool {
        self.raw().authored
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.raw().value {
            Some(AttrValue::Bool(v)) => Some(v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self.raw().value {
            Some(AttrValue::Int(v)) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self.raw().value {
            Some(AttrValue::Float(v)) => Some(v),
            Some(AttrValue::Int(v)) => Some(v as f32),
            _ => None,
        }
    }

    pub fn as_float3(&self) -> Option<glam::Vec3> {
        match self.raw().value {
            Some(AttrValue::Float3(v)) => Some(v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&'a str> {
        match &self.raw().value {
            Some(AttrValue::String(v)) => Some(v),
            _ => None,
        }
    }

    /// Component `i` of a compound numeric plug.
    pub fn child_float(&self, i: usize) -> Option<f32> {
        match self.raw().value {
            Some(AttrValue::Float3(v)) if i < 3 => Some(v[i]),
            Some(AttrValue::Float(v)) if i == 0 => Some(v),
            _ => None,
        }
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            plugs: Vec::new(),
            sources: HashMap::new(),
        }
    }

    fn plug_ref(&self, id: PlugId) -> PlugRef<'_> {
        PlugRef { graph: self, id }
    }

    // ------------------------------------------------------------------
    // Builders (used before the export pass; the pass itself is read-only)
    // ------------------------------------------------------------------

    /// Add a node. The name may carry a namespace prefix ("ns:name").
    pub fn add_node(&mut self, name: &str, type_name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            type_name: type_name.to_string(),
            plugs: HashMap::new(),
            dag_paths: Vec::new(),
            memberships: Vec::new(),
        });
        id
    }

    /// Register a DAG path to a node. Paths accumulate in instance-number
    /// order: the first registered path is instance 0.
    pub fn add_dag_path(&mut self, node: NodeId, path: &str) -> u32 {
        let instance = self.nodes[node.0].dag_paths.len() as u32;
        self.nodes[node.0].dag_paths.push(DagPath {
            path: path.to_string(),
            instance,
        });
        instance
    }

    /// Create (or fetch) a simple top-level plug with a value.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: AttrValue, authored: bool) -> PlugId {
        let id = self.top_level_plug(node, name, false);
        let plug = &mut self.plugs[id.0];
        plug.value = Some(value);
        plug.authored = authored;
        id
    }

    /// Create (or fetch) a valueless top-level plug (connection endpoint).
    pub fn add_plug(&mut self, node: NodeId, name: &str) -> PlugId {
        self.top_level_plug(node, name, false)
    }

    fn top_level_plug(&mut self, node: NodeId, name: &str, is_array: bool) -> PlugId {
        if let Some(&id) = self.nodes[node.0].plugs.get(name) {
            return id;
        }
        let id = PlugId(self.plugs.len());
        self.plugs.push(Plug {
            node,
            name: name.to_string(),
            parent: None,
            logical_index: None,
            is_array,
            elements: Vec::new(),
            value: None,
            authored: false,
        });
        self.nodes[node.0].plugs.insert(name.to_string(), id);
        id
    }

    fn element_plug(&mut self, array: PlugId, logical: u32) -> PlugId {
        if let Some(&e) = self.plugs[array.0]
            .elements
            .iter()
            .find(|&&e| self.plugs[e.0].logical_index == Some(logical))
        {
            return e;
        }
        let node = self.plugs[array.0].node;
        let name = self.plugs[array.0].name.clone();
        let id = PlugId(self.plugs.len());
        self.plugs.push(Plug {
            node,
            name,
            parent: Some(array),
            logical_index: Some(logical),
            is_array: false,
            elements: Vec::new(),
            value: None,
            authored: false,
        });
        self.plugs[array.0].elements.push(id);
        id
    }

    fn child_array_plug(&mut self, element: PlugId, name: &str) -> PlugId {
        // One child array per element is enough for set-membership wiring.
        if let Some(existing) = self.plugs[element.0].elements.first() {
            return *existing;
        }
        let node = self.plugs[element.0].node;
        let id = PlugId(self.plugs.len());
        self.plugs.push(Plug {
            node,
            name: name.to_string(),
            parent: Some(element),
            logical_index: None,
            is_array: true,
            elements: Vec::new(),
            value: None,
            authored: false,
        });
        self.plugs[element.0].elements.push(id);
        id
    }

    /// Connect a source plug to a destination plug.
    pub fn connect(&mut self, src: PlugId, dst: PlugId) {
        self.sources.insert(dst, src);
    }

    /// Wire a shape (at a given instance number) into an assignment set,
    /// optionally restricted to a face component.
    ///
    /// Mirrors the host application's wiring: the source plug is the
    /// shape's `instObjGroups[instance]` for whole-object membership, or
    /// `instObjGroups[instance].objectGroups[k]` for a face group, and it
    /// connects into the set's `dagSetMembers` fan-in array.
    pub fn assign_to_set(
        &mut self,
        set: NodeId,
        shape: NodeId,
        instance: u32,
        faces: Option<Vec<i32>>,
    ) {
        // The host keeps a single object group per set and instance:
        // repeated face assignments merge into the existing member.
        if let Some(existing) = self.nodes[shape.0]
            .memberships
            .iter_mut()
            .find(|m| m.set == set && m.instance == instance)
        {
            if let (Some(component), Some(new_faces)) = (&mut existing.component, faces) {
                component.indices.extend(new_faces);
            }
            return;
        }

        let iog = self.top_level_plug(shape, "instObjGroups", true);
        let iog_elem = self.element_plug(iog, instance);

        let src = match &faces {
            Some(_) => {
                let groups = self.child_array_plug(iog_elem, "objectGroups");
                let next = self.plugs[groups.0].elements.len() as u32;
                self.element_plug(groups, next)
            }
            None => iog_elem,
        };

        let dsm = self.top_level_plug(set, "dagSetMembers", true);
        let next = self.plugs[dsm.0].elements.len() as u32;
        let dsm_elem = self.element_plug(dsm, next);
        self.connect(src, dsm_elem);

        self.nodes[shape.0].memberships.push(Membership {
            instance,
            set,
            component: faces.map(FaceComponent::new),
        });
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn node_name(&self, node: NodeId) -> &str {
        &self.nodes[node.0].name
    }

    pub fn node_type(&self, node: NodeId) -> &str {
        &self.nodes[node.0].type_name
    }

    /// Look up a top-level plug by name, with networked resolution.
    pub fn find_plug(&self, node: NodeId, name: &str) -> Option<PlugRef<'_>> {
        self.nodes[node.0]
            .plugs
            .get(name)
            .map(|&id| self.plug_ref(id))
    }

    /// Borrow a plug by id.
    pub fn plug(&self, id: PlugId) -> PlugRef<'_> {
        self.plug_ref(id)
    }

    /// All DAG paths to a node, indexed by instance number.
    pub fn all_paths_to(&self, node: NodeId) -> &[DagPath] {
        &self.nodes[node.0].dag_paths
    }

    /// Assignment sets and member components for a node at one instance,
    /// in connection order.
    pub fn connected_sets_and_members(&self, node: NodeId, instance: u32) -> Vec<SetMember> {
        self.nodes[node.0]
            .memberships
            .iter()
            .filter(|m| m.instance == instance)
            .map(|m| SetMember {
                set: m.set,
                component: m.component.clone(),
            })
            .collect()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_plug_and_values() {
        let mut graph = SceneGraph::new();
        let file = graph.add_node("file1", "file");
        graph.set_attr(file, "wrapU", AttrValue::Bool(true), true);
        graph.set_attr(file, "colorGain", AttrValue::Float3(glam::vec3(0.5, 1.0, 2.0)), true);

        let plug = graph.find_plug(file, "wrapU").unwrap();
        assert_eq!(plug.as_bool(), Some(true));
        assert!(plug.is_authored());

        let gain = graph.find_plug(file, "colorGain").unwrap();
        assert_eq!(gain.child_float(1), Some(1.0));
        assert_eq!(gain.child_float(3), None);

        assert!(graph.find_plug(file, "missing").is_none());
    }

    #[test]
    fn test_connection_traversal() {
        let mut graph = SceneGraph::new();
        let shader = graph.add_node("blinn1", "blinn");
        let engine = graph.add_node("blinn1SG", "shadingEngine");
        let out = graph.add_plug(shader, "outColor");
        let ss = graph.add_plug(engine, "surfaceShader");
        graph.connect(out, ss);

        let src = graph.find_plug(engine, "surfaceShader").unwrap().connected_source().unwrap();
        assert_eq!(src.node(), shader);
        assert_eq!(src.name(), "outColor");
    }

    #[test]
    fn test_whole_object_membership_wiring() {
        let mut graph = SceneGraph::new();
        let mesh = graph.add_node("meshShape", "mesh");
        let engine = graph.add_node("sg", "shadingEngine");
        graph.add_dag_path(mesh, "|root|geo|meshShape");
        graph.assign_to_set(engine, mesh, 0, None);

        let dsm = graph.find_plug(engine, "dagSetMembers").unwrap();
        assert!(dsm.is_array());
        let connected = dsm.connected_elements();
        assert_eq!(connected.len(), 1);

        let src = connected[0].connected_source().unwrap();
        // Whole-object source: instObjGroups[0], not a nested group.
        assert!(src.is_element());
        assert_eq!(src.logical_index(), Some(0));
        assert!(!src.array().unwrap().is_child());
        assert_eq!(src.node(), mesh);

        let members = graph.connected_sets_and_members(mesh, 0);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].set, engine);
        assert!(members[0].component.is_none());
    }

    #[test]
    fn test_face_group_membership_wiring() {
        let mut graph = SceneGraph::new();
        let mesh = graph.add_node("meshShape", "mesh");
        let engine = graph.add_node("sg", "shadingEngine");
        graph.add_dag_path(mesh, "|root|geo|meshShape");
        graph.assign_to_set(engine, mesh, 0, Some(vec![0, 1, 4]));

        let dsm = graph.find_plug(engine, "dagSetMembers").unwrap();
        let src = dsm.connected_elements()[0].connected_source().unwrap();

        // Face-group source: instObjGroups[0].objectGroups[k]; the owning
        // array is itself a child of the instObjGroups element.
        assert!(src.is_element());
        let owning_array = src.array().unwrap();
        assert!(owning_array.is_child());
        let iog_elem = owning_array.parent().unwrap();
        assert_eq!(iog_elem.logical_index(), Some(0));

        let members = graph.connected_sets_and_members(mesh, 0);
        let faces: Vec<i32> = members[0].component.as_ref().unwrap().iter().collect();
        assert_eq!(faces, vec![0, 1, 4]);
    }

    #[test]
    fn test_instance_paths() {
        let mut graph = SceneGraph::new();
        let mesh = graph.add_node("meshShape", "mesh");
        assert_eq!(graph.add_dag_path(mesh, "|a|meshShape"), 0);
        assert_eq!(graph.add_dag_path(mesh, "|b|meshShape"), 1);

        let paths = graph.all_paths_to(mesh);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[1].full_path(), "|b|meshShape");
        assert_eq!(paths[1].instance_number(), 1);
    }
}
