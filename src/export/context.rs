//! Per-assignment-object export context: the assignment resolver and the
//! material placement and binding engine.

use std::collections::BTreeSet;

use tracing::warn;

use crate::path::ScenePath;
use crate::scene::{NodeId, PlugRef, SceneGraph};
use crate::shade::{binding, tokens, Material};
use crate::stage::{PrimIndex, Stage};
use crate::util::{sanitize_name, strip_namespace};

use super::{Assignment, AssignmentVec, DagPathMap, ExportConfig};

/// Export context for one assignment object (shading engine).
///
/// Resolution (`surface_shader`, `assignments`) is read-only over the
/// scene graph. Mutation is confined to `make_standard_material_prim`,
/// which takes the stage explicitly.
pub struct ExportContext<'a> {
    shading_engine: NodeId,
    scene: &'a SceneGraph,
    dag_path_map: &'a DagPathMap,
    config: ExportConfig,
    bindable_roots: BTreeSet<ScenePath>,
}

impl<'a> ExportContext<'a> {
    /// Build a context, eagerly resolving the bindable-root set.
    ///
    /// Never fails: configured roots that have no mapping are skipped. An
    /// explicit root list that entirely fails to map leaves the set empty,
    /// which means nothing binds.
    pub fn new(
        shading_engine: NodeId,
        scene: &'a SceneGraph,
        dag_path_map: &'a DagPathMap,
        config: ExportConfig,
    ) -> Self {
        let mut bindable_roots = BTreeSet::new();
        if config.bindable_roots.is_empty() {
            // No roots specified: '/' encompasses everything.
            bindable_roots.insert(ScenePath::root());
        } else {
            for native_root in &config.bindable_roots {
                let Some(path) = dag_path_map.get(native_root) else {
                    // Geometry with this material bound doesn't exist in
                    // the target document.
                    continue;
                };
                bindable_roots.insert(apply_override_root(path, config.override_root.as_ref()));
            }
        }
        Self {
            shading_engine,
            scene,
            dag_path_map,
            config,
            bindable_roots,
        }
    }

    pub fn shading_engine(&self) -> NodeId {
        self.shading_engine
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Resolved bindable roots.
    pub fn bindable_roots(&self) -> &BTreeSet<ScenePath> {
        &self.bindable_roots
    }

    /// The shading node driving this assignment object's surface-shader
    /// plug, or `None` if the plug is absent or unconnected.
    pub fn surface_shader(&self) -> Option<NodeId> {
        let plug = self
            .scene
            .find_plug(self.shading_engine, &self.config.surface_shader_plug)?;
        plug.connected_source().map(|src| src.node())
    }

    /// Resolve the assignment object's member-set fan-in into target-path
    /// assignments.
    ///
    /// Never mutates the stage. Failures on one connected element skip
    /// that element only.
    pub fn assignments(&self) -> AssignmentVec {
        let mut ret = AssignmentVec::new();

        let Some(dsm) = self.scene.find_plug(self.shading_engine, "dagSetMembers") else {
            return ret;
        };

        let mut seen_bound_paths = BTreeSet::new();
        for dsm_elem in dsm.connected_elements() {
            let Some(mut connected) = dsm_elem.connected_source() else {
                continue;
            };

            // Shader bindings for instances hang off element indices of
            // instObjGroups[x] or instObjGroups[x].objectGroups[y]. The
            // instance number is the index of instObjGroups[x]; the face
            // group (if any) is the index of objectGroups[y].
            if connected.is_element() && connected.array().is_some_and(|a| a.is_child()) {
                // connected is instObjGroups[x].objectGroups[y]; go up two
                // levels to reach instObjGroups[x].
                let Some(elem) = connected.array().and_then(|a| a.parent()) else {
                    continue;
                };
                connected = elem;
            }
            let Some(instance) = connected.logical_index() else {
                continue;
            };

            let all_paths = self.scene.all_paths_to(connected.node());
            let Some(dag_path) = all_paths.get(instance as usize) else {
                warn!(
                    instance,
                    node = self.scene.node_name(connected.node()),
                    paths = all_paths.len(),
                    "instance number out of range for node paths"
                );
                continue;
            };
            debug_assert_eq!(dag_path.instance_number(), instance);

            let Some(target) = self.dag_path_map.get(dag_path.full_path()) else {
                // Geometry with this material bound doesn't exist in the
                // target document.
                continue;
            };
            let target = apply_override_root(target, self.config.override_root.as_ref());

            // Already processed: first occurrence wins.
            if !seen_bound_paths.insert(target.clone()) {
                continue;
            }

            // Skip paths outside every bindable root.
            if !self.bindable_roots.iter().any(|r| target.has_prefix(r)) {
                continue;
            }

            for member in self
                .scene
                .connected_sets_and_members(connected.node(), instance)
            {
                // Only members owned by this assignment object count.
                if member.set != self.shading_engine {
                    continue;
                }
                let face_indices: Vec<i32> = match &member.component {
                    Some(component) => component.iter().collect(),
                    None => Vec::new(),
                };
                ret.push(Assignment {
                    path: target.clone(),
                    face_indices,
                });
            }
        }
        ret
    }

    /// Materialize the material prim and author bindings for every
    /// assignment.
    ///
    /// Returns `None` without touching the stage when no assignment path
    /// resolves to an existing prim (no placement). Bound target paths
    /// are recorded into `bound_paths` when requested.
    pub fn make_standard_material_prim(
        &self,
        stage: &mut Stage,
        assignments: &[Assignment],
        name: &str,
        mut bound_paths: Option<&mut BTreeSet<ScenePath>>,
    ) -> Option<Material> {
        let mut material_name = name.to_string();
        if material_name.is_empty() {
            material_name =
                strip_namespace(self.scene.node_name(self.shading_engine)).to_string();
        }
        let material_name = sanitize_name(&material_name);

        let parent = self.material_parent(stage, assignments)?;
        let material_path = stage.prim(parent).path().append_child(&material_name);
        let material = match Material::define(stage, &material_path) {
            Ok(m) => m,
            Err(err) => {
                warn!(path = %material_path, error = %err, "could not define material prim");
                return None;
            }
        };

        for assignment in assignments {
            let bound = &assignment.path;

            if assignment.face_indices.is_empty() {
                // Whole-object binding. Direct bindings cannot land on an
                // instance proxy; per-face bindings below un-instance the
                // prim instead, since face sets and subsets need a real
                // prim to live on.
                if !self.config.collection_based_bindings {
                    if is_instance_proxy_path(stage, bound) {
                        warn!(
                            path = %bound,
                            "cannot author direct material binding on instance proxy; \
                             try enabling collection-based material binding"
                        );
                    } else {
                        let prim = stage.override_prim(bound);
                        material.bind(stage, prim);
                    }
                }
                if let Some(set) = bound_paths.as_mut() {
                    set.insert(bound.clone());
                }
            } else if self.config.legacy_face_sets {
                let prim = uninstance_prim(stage, bound, "authoring old-style face set");
                binding::append_face_group(
                    stage,
                    prim,
                    assignment.face_indices.clone(),
                    material.path(),
                );
                // Bound-path tracking is intentionally skipped for the
                // legacy encoding.
            } else {
                let prim = uninstance_prim(stage, bound, "authoring per-face materials");
                let subset = match binding::create_material_bind_subset(
                    stage,
                    prim,
                    &material_name,
                    assignment.face_indices.clone(),
                ) {
                    Ok(s) => s,
                    Err(err) => {
                        warn!(path = %bound, error = %err, "could not create material-bind subset");
                        continue;
                    }
                };

                if !self.config.collection_based_bindings {
                    material.bind(stage, subset);
                }
                if let Some(set) = bound_paths.as_mut() {
                    set.insert(stage.prim(subset).path().clone());
                }

                // Re-asserted on every insertion so late additions never
                // leave the family type unset.
                binding::set_material_bind_family_type(stage, prim, tokens::PARTITION);
            }
        }

        Some(material)
    }

    /// Parent location for the material: the common prefix of assignment
    /// paths that exist as prims, snapped up to the top-level ancestor,
    /// with the material-library scope appended.
    fn material_parent(&self, stage: &mut Stage, assignments: &[Assignment]) -> Option<PrimIndex> {
        let mut common: Option<ScenePath> = None;
        for assignment in assignments {
            // Paths that don't resolve to a prim must not skew placement.
            if !stage.has_prim(&assignment.path) {
                continue;
            }
            common = Some(match common {
                None => assignment.path.clone(),
                Some(c) => c.common_prefix(&assignment.path),
            });
        }
        let common = common?;

        if common.is_root() {
            return Some(stage.pseudo_root());
        }

        let mut location = common;
        while !location.is_root_prim_path() {
            location = location.parent()?;
        }
        let looks = location.append_child(tokens::LOOKS);
        match stage.define_prim(&looks, tokens::SCOPE) {
            Ok(idx) => Some(idx),
            Err(err) => {
                warn!(path = %looks, error = %err, "could not define material scope");
                None
            }
        }
    }

    /// Target attribute name for a native plug.
    ///
    /// Array elements become `"<name>_<index>"` when multi-element arrays
    /// are allowed; index 0 shortens to the bare name otherwise, and any
    /// other index is rejected.
    pub fn standard_attr_name(
        &self,
        plug: PlugRef<'_>,
        allow_multi_element_arrays: bool,
    ) -> Option<String> {
        if plug.is_element() {
            let name = plug.array()?.name().to_string();
            let index = plug.logical_index()?;
            if allow_multi_element_arrays {
                Some(format!("{name}_{index}"))
            } else if index == 0 {
                Some(name)
            } else {
                None
            }
        } else {
            Some(plug.name().to_string())
        }
    }
}

fn apply_override_root(path: &ScenePath, override_root: Option<&ScenePath>) -> ScenePath {
    match override_root {
        Some(new_root) => match path.prefixes().first() {
            Some(first) => path.replace_prefix(first, new_root),
            None => path.clone(),
        },
        None => path.clone(),
    }
}

/// Whether `path` would be an instance proxy: some strict ancestor is an
/// instantiable prototype instance. A path that is itself an instance is
/// not a proxy.
fn is_instance_proxy_path(stage: &Stage, path: &ScenePath) -> bool {
    let Some(parent) = path.parent() else {
        return false;
    };
    for prefix in parent.prefixes() {
        if let Some(idx) = stage.prim_at(&prefix) {
            if stage.prim(idx).is_instanceable() {
                return true;
            }
        }
    }
    false
}

/// Ensure a prim exists at `path` and that neither it nor any ancestor is
/// still flagged instantiable.
///
/// Walks every prefix from the root down, clearing the flag on existing
/// prims and stopping at the first prefix that doesn't exist yet; always
/// finishes by ensuring an override prim at the exact path.
fn uninstance_prim(stage: &mut Stage, path: &ScenePath, reason: &str) -> PrimIndex {
    let mut did_uninstance = false;
    for prefix in path.prefixes() {
        match stage.prim_at(&prefix) {
            Some(idx) => {
                if stage.prim(idx).is_instanceable() {
                    stage.prim_mut(idx).set_instanceable(false);
                    did_uninstance = true;
                }
            }
            None => break,
        }
    }

    if did_uninstance {
        warn!(path = %path, reason, "uninstanced prim (and ancestors)");
    }

    stage.override_prim(path)
}
