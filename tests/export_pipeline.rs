//! End-to-end export pass over the public API: assignment resolution,
//! material placement, binding, and texture translation on one stage.

use std::collections::BTreeSet;

use shadebridge::prelude::*;
use shadebridge::shade::tokens;
use shadebridge::stage::types;

fn p(s: &str) -> ScenePath {
    ScenePath::parse(s).unwrap()
}

/// A character asset: one body mesh split between two shading engines,
/// one of them textured, plus a prop mesh reached through two instances.
struct DemoScene {
    scene: SceneGraph,
    map: DagPathMap,
    body_sg: NodeId,
    trim_sg: NodeId,
    prop_sg: NodeId,
    texture: NodeId,
}

fn build_scene() -> DemoScene {
    let mut scene = SceneGraph::new();

    let body = scene.add_node("bodyShape", "mesh");
    scene.add_dag_path(body, "|char|geo|bodyShape");

    let prop = scene.add_node("propShape", "mesh");
    scene.add_dag_path(prop, "|char|propA|propShape");
    scene.add_dag_path(prop, "|char|propB|propShape");

    let body_sg = scene.add_node("skin:bodySG", "shadingEngine");
    let trim_sg = scene.add_node("trimSG", "shadingEngine");
    let prop_sg = scene.add_node("propSG", "shadingEngine");

    scene.assign_to_set(body_sg, body, 0, Some(vec![0, 1, 2, 3]));
    scene.assign_to_set(trim_sg, body, 0, Some(vec![4, 5]));
    scene.assign_to_set(prop_sg, prop, 0, None);
    scene.assign_to_set(prop_sg, prop, 1, None);

    let shader = scene.add_node("skinShader", "blinn");
    let out = scene.add_plug(shader, "outColor");
    let surface = scene.add_plug(body_sg, "surfaceShader");
    scene.connect(out, surface);

    let texture = scene.add_node("skinTex", "file");
    scene.set_attr(
        texture,
        "fileTextureName",
        AttrValue::String("/show/assets/char/tex/skin.png".to_string()),
        true,
    );
    scene.set_attr(
        texture,
        "colorGain",
        AttrValue::Float3(glam::vec3(1.0, 0.9, 0.8)),
        true,
    );
    scene.set_attr(texture, "wrapU", AttrValue::Bool(true), true);
    scene.set_attr(texture, "wrapV", AttrValue::Bool(false), true);

    let mut map = DagPathMap::new();
    map.insert("|char|geo|bodyShape".to_string(), p("/char/geo/bodyShape"));
    map.insert("|char|propA|propShape".to_string(), p("/char/propA/propShape"));
    map.insert("|char|propB|propShape".to_string(), p("/char/propB/propShape"));

    DemoScene {
        scene,
        map,
        body_sg,
        trim_sg,
        prop_sg,
        texture,
    }
}

fn build_stage() -> Stage {
    let mut stage = Stage::new();
    stage.set_root_layer_path("/show/shots/sq01/shot.usda");
    stage.define_prim(&p("/char"), "Xform").unwrap();
    stage.define_prim(&p("/char/geo/bodyShape"), "Mesh").unwrap();
    stage.define_prim(&p("/char/propA/propShape"), "Mesh").unwrap();
    stage.define_prim(&p("/char/propB/propShape"), "Mesh").unwrap();
    stage
}

#[test]
fn test_full_export_pass() {
    let demo = build_scene();
    let mut stage = build_stage();

    let mut bound = BTreeSet::new();
    let mut body_material = None;
    for engine in [demo.body_sg, demo.trim_sg, demo.prop_sg] {
        let ctx = ExportContext::new(engine, &demo.scene, &demo.map, ExportConfig::default());
        let assignments = ctx.assignments();
        let material =
            ctx.make_standard_material_prim(&mut stage, &assignments, "", Some(&mut bound));
        assert!(material.is_some());
        if engine == demo.body_sg {
            body_material = material;
        }
    }

    // Namespace stripped from the engine name; everything under /char/Looks.
    let body_material = body_material.unwrap();
    assert_eq!(body_material.path(), &p("/char/Looks/bodySG"));
    assert!(stage.has_prim(&p("/char/Looks/trimSG")));
    assert!(stage.has_prim(&p("/char/Looks/propSG")));

    // Face-split body: one subset per engine, both partition-tagged.
    let body = stage.prim_at(&p("/char/geo/bodyShape")).unwrap();
    let subsets: Vec<_> = stage
        .children(body)
        .iter()
        .map(|&c| stage.prim(c).name().to_string())
        .collect();
    assert_eq!(subsets, vec!["bodySG", "trimSG"]);
    assert_eq!(
        stage
            .prim(body)
            .attribute(tokens::MATERIAL_BIND_FAMILY_TYPE)
            .unwrap()
            .default_value(),
        Some(&Value::Token("partition".to_string()))
    );

    // Whole-object prop instances: direct bindings on both paths, deduped
    // per path.
    for path in ["/char/propA/propShape", "/char/propB/propShape"] {
        let prim = stage.prim_at(&p(path)).unwrap();
        assert_eq!(
            stage.prim(prim).relationship_targets(tokens::MATERIAL_BINDING),
            Some(&[p("/char/Looks/propSG")][..])
        );
    }

    // Recorded bound paths: two subsets plus two prop shapes.
    let expected: BTreeSet<ScenePath> = [
        "/char/geo/bodyShape/bodySG",
        "/char/geo/bodyShape/trimSG",
        "/char/propA/propShape",
        "/char/propB/propShape",
    ]
    .into_iter()
    .map(p)
    .collect();
    assert_eq!(bound, expected);

    // Surface shader resolves through the connection.
    let ctx = ExportContext::new(
        demo.body_sg,
        &demo.scene,
        &demo.map,
        ExportConfig::default(),
    );
    let shader_node = ctx.surface_shader().unwrap();
    assert_eq!(demo.scene.node_name(shader_node), "skinShader");

    // Texture translation under the body material.
    let registry = WriterRegistry::with_standard_writers();
    let tex_path = body_material.path().append_child("skinTex");
    let mut writer = registry
        .writer_for(&demo.scene, demo.texture, &tex_path, &mut stage)
        .unwrap()
        .unwrap();
    writer.write(&demo.scene, &mut stage, None).unwrap();
    let output = writer.shading_attr_name(&mut stage, "outColor").unwrap();
    assert_eq!(output, "outputs:rgb");

    let tex = stage.prim_at(&tex_path).unwrap();
    let tex = stage.prim(tex);
    assert_eq!(
        tex.attribute("inputs:file").unwrap().default_value(),
        Some(&Value::Asset(
            "../../assets/char/tex/skin.png".to_string()
        ))
    );
    assert_eq!(
        tex.attribute("inputs:wrapT").unwrap().default_value(),
        Some(&Value::Token("black".to_string()))
    );
    assert_eq!(tex.attribute("outputs:rgb").unwrap().type_name(), types::FLOAT3);

    // The text dump reflects the authored structure.
    let text = stage.to_text();
    assert!(text.contains("def Material \"bodySG\""));
    assert!(text.contains("def GeomSubset \"trimSG\""));
    assert!(text.contains("rel material:binding"));
}

#[test]
fn test_export_is_idempotent_across_reruns() {
    let demo = build_scene();
    let mut stage = build_stage();

    let run = |stage: &mut Stage| {
        for engine in [demo.body_sg, demo.trim_sg, demo.prop_sg] {
            let ctx = ExportContext::new(engine, &demo.scene, &demo.map, ExportConfig::default());
            let assignments = ctx.assignments();
            ctx.make_standard_material_prim(stage, &assignments, "", None);
        }
    };

    run(&mut stage);
    let first = stage.to_text();
    let prims = stage.num_prims();

    run(&mut stage);
    assert_eq!(stage.num_prims(), prims);
    assert_eq!(stage.to_text(), first);
}

#[test]
fn test_override_root_relocates_everything() {
    let demo = build_scene();
    let mut stage = Stage::new();
    stage.define_prim(&p("/assets/char/geo/bodyShape"), "Mesh").unwrap();

    let config = ExportConfig {
        override_root: Some(p("/assets/char")),
        ..Default::default()
    };
    let ctx = ExportContext::new(demo.body_sg, &demo.scene, &demo.map, config);
    let assignments = ctx.assignments();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].path, p("/assets/char/geo/bodyShape"));

    let material = ctx
        .make_standard_material_prim(&mut stage, &assignments, "", None)
        .unwrap();
    assert_eq!(material.path(), &p("/assets/Looks/bodySG"));
}
