//! Material-binding authoring: direct bindings, geometry subsets, subset
//! family typing, and the legacy face-grouping encoding.

use tracing::debug;

use crate::path::ScenePath;
use crate::stage::{types, FaceGroup, PrimIndex, Stage, Value};
use crate::util::Result;

use super::tokens;

/// Author a direct material binding on a prim.
///
/// The binding relationship holds a single target; re-binding the same
/// material is a no-op.
pub fn bind_material(stage: &mut Stage, prim: PrimIndex, material: &ScenePath) {
    stage
        .prim_mut(prim)
        .set_relationship_targets(tokens::MATERIAL_BINDING, vec![material.clone()]);
}

/// Create (look-up-or-create) a face-element geometry subset under a prim,
/// in the `materialBind` family.
///
/// The subset is named by the caller and scoped to `face` elements;
/// re-creating it overwrites the index set rather than duplicating the
/// prim.
pub fn create_material_bind_subset(
    stage: &mut Stage,
    prim: PrimIndex,
    name: &str,
    indices: Vec<i32>,
) -> Result<PrimIndex> {
    let path = stage.prim(prim).path().append_child(name);
    let subset = stage.define_prim(&path, tokens::GEOM_SUBSET)?;
    debug!(subset = %path, count = indices.len(), "authoring material-bind subset");

    let p = stage.prim_mut(subset);
    p.create_attribute(tokens::ELEMENT_TYPE, types::TOKEN)
        .set(Value::Token(tokens::FACE.to_string()));
    p.create_attribute(tokens::FAMILY_NAME, types::TOKEN)
        .set(Value::Token(tokens::MATERIAL_BIND.to_string()));
    p.create_attribute(tokens::INDICES, types::INT_ARRAY)
        .set(Value::IntArray(indices));
    Ok(subset)
}

/// Tag the `materialBind` subset family on a prim as a strict partition.
///
/// Must be re-asserted after every subset insertion; a later addition
/// would otherwise leave the family type unset or stale.
pub fn set_material_bind_family_type(stage: &mut Stage, prim: PrimIndex, family_type: &str) {
    stage
        .prim_mut(prim)
        .create_attribute(tokens::MATERIAL_BIND_FAMILY_TYPE, types::TOKEN)
        .set(Value::Token(family_type.to_string()));
}

/// Append a legacy face-grouping record (face indices + material path) to
/// a prim. An identical record is not duplicated.
pub fn append_face_group(
    stage: &mut Stage,
    prim: PrimIndex,
    indices: Vec<i32>,
    material: &ScenePath,
) {
    stage.prim_mut(prim).append_face_group(FaceGroup {
        indices,
        material: material.clone(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> ScenePath {
        ScenePath::parse(s).unwrap()
    }

    #[test]
    fn test_bind_material_single_target() {
        let mut stage = Stage::new();
        let mesh = stage.override_prim(&p("/World/mesh"));
        bind_material(&mut stage, mesh, &p("/World/Looks/a"));
        bind_material(&mut stage, mesh, &p("/World/Looks/b"));
        assert_eq!(
            stage
                .prim(mesh)
                .relationship_targets(tokens::MATERIAL_BINDING),
            Some(&[p("/World/Looks/b")][..])
        );
    }

    #[test]
    fn test_subset_creation_idempotent() {
        let mut stage = Stage::new();
        let mesh = stage.override_prim(&p("/World/mesh"));

        let a = create_material_bind_subset(&mut stage, mesh, "mat", vec![0, 1]).unwrap();
        let before = stage.num_prims();
        let b = create_material_bind_subset(&mut stage, mesh, "mat", vec![0, 1]).unwrap();
        assert_eq!(a, b);
        assert_eq!(stage.num_prims(), before);

        let subset = stage.prim(a);
        assert_eq!(subset.type_name(), Some(tokens::GEOM_SUBSET));
        assert_eq!(
            subset.attribute(tokens::ELEMENT_TYPE).unwrap().default_value(),
            Some(&Value::Token(tokens::FACE.to_string()))
        );
        assert_eq!(
            subset.attribute(tokens::INDICES).unwrap().default_value(),
            Some(&Value::IntArray(vec![0, 1]))
        );
    }

    #[test]
    fn test_family_type() {
        let mut stage = Stage::new();
        let mesh = stage.override_prim(&p("/World/mesh"));
        set_material_bind_family_type(&mut stage, mesh, tokens::PARTITION);
        assert_eq!(
            stage
                .prim(mesh)
                .attribute(tokens::MATERIAL_BIND_FAMILY_TYPE)
                .unwrap()
                .default_value(),
            Some(&Value::Token(tokens::PARTITION.to_string()))
        );
    }

    #[test]
    fn test_face_group_dedup() {
        let mut stage = Stage::new();
        let mesh = stage.override_prim(&p("/World/mesh"));
        append_face_group(&mut stage, mesh, vec![1, 2], &p("/World/Looks/m"));
        append_face_group(&mut stage, mesh, vec![1, 2], &p("/World/Looks/m"));
        append_face_group(&mut stage, mesh, vec![3], &p("/World/Looks/m"));
        assert_eq!(stage.prim(mesh).face_groups().len(), 2);
    }
}
