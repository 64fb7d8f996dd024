//! Shadebridge CLI - demo exporter for the shading bridge.
//!
//! Builds a small in-memory scene (a cube with two per-face material
//! assignments and a file-texture network), runs the export pass, and dumps
//! the resulting stage as text.

use std::env;
use std::process;

use tracing::info;
use tracing_subscriber::EnvFilter;

use shadebridge::prelude::*;
use shadebridge::translate::FileTextureWriter;

const BUILD_DATE: &str = env!("SHADEBRIDGE_BUILD_DATE");
const BUILD_TIME: &str = env!("SHADEBRIDGE_BUILD_TIME");

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut default_filter = "shadebridge=info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => default_filter = "shadebridge=debug",
            "-q" | "--quiet" => default_filter = "shadebridge=error",
            _ => filtered_args.push(arg),
        }
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match filtered_args.first().copied() {
        None | Some("demo") | Some("d") => {
            if let Err(err) = cmd_demo() {
                eprintln!("error: {err}");
                process::exit(1);
            }
        }
        Some("version") => {
            println!(
                "shadebridge {} (built {} {})",
                env!("CARGO_PKG_VERSION"),
                BUILD_DATE,
                BUILD_TIME
            );
        }
        Some("help") | Some("-h") | Some("--help") => print_usage(&args[0]),
        Some(other) => {
            eprintln!("unknown command: {other}");
            print_usage(&args[0]);
            process::exit(1);
        }
    }
}

fn print_usage(prog: &str) {
    println!("Usage: {prog} [-v|-q] [command]");
    println!();
    println!("Commands:");
    println!("  demo, d     Build the sample scene, export it, dump the stage (default)");
    println!("  version     Print version and build info");
    println!("  help        Show this help");
}

/// Build the sample scene and run a full export pass over it.
fn cmd_demo() -> Result<()> {
    let mut scene = SceneGraph::new();

    let mesh = scene.add_node("pCubeShape1", "mesh");
    scene.add_dag_path(mesh, "|pCube1|pCubeShape1");

    // Two shading engines splitting the cube's faces.
    let wood_sg = scene.add_node("woodSG", "shadingEngine");
    let trim_sg = scene.add_node("trimSG", "shadingEngine");
    scene.assign_to_set(wood_sg, mesh, 0, Some(vec![0, 1, 2, 3]));
    scene.assign_to_set(trim_sg, mesh, 0, Some(vec![4, 5]));

    // Surface shader driving woodSG, textured by a file node.
    let wood = scene.add_node("wood", "blinn");
    let out_color = scene.add_plug(wood, "outColor");
    let surface = scene.add_plug(wood_sg, "surfaceShader");
    scene.connect(out_color, surface);

    let wood_tex = scene.add_node("woodTex", "file");
    scene.set_attr(
        wood_tex,
        "fileTextureName",
        AttrValue::String("sourceimages/wood.png".to_string()),
        true,
    );
    scene.set_attr(
        wood_tex,
        "colorGain",
        AttrValue::Float3(glam::vec3(0.9, 0.8, 0.6)),
        true,
    );
    scene.set_attr(wood_tex, "wrapU", AttrValue::Bool(true), true);
    scene.set_attr(wood_tex, "wrapV", AttrValue::Bool(true), true);

    let mut map = DagPathMap::new();
    map.insert(
        "|pCube1|pCubeShape1".to_string(),
        ScenePath::parse("/pCube1/pCubeShape1")?,
    );

    // The stage as the geometry pass would have left it.
    let mut stage = Stage::new();
    stage.set_root_layer_path("shot.usda");
    stage.define_prim(&ScenePath::parse("/pCube1")?, "Xform")?;
    stage.define_prim(&ScenePath::parse("/pCube1/pCubeShape1")?, "Mesh")?;

    let mut wood_material = None;
    for engine in [wood_sg, trim_sg] {
        let ctx = ExportContext::new(engine, &scene, &map, ExportConfig::default());
        let assignments = ctx.assignments();
        info!(
            engine = scene.node_name(engine),
            assignments = assignments.len(),
            "resolved assignments"
        );
        let material = ctx.make_standard_material_prim(&mut stage, &assignments, "", None);
        if let Some(material) = &material {
            info!(material = %material.path(), "authored material");
        }
        if engine == wood_sg {
            wood_material = material;
        }
    }

    // Translate the texture network under the wood material.
    if let Some(material) = &wood_material {
        let registry = WriterRegistry::with_standard_writers();
        let tex_path = material.path().append_child(scene.node_name(wood_tex));
        if let Some(writer) = registry.writer_for(&scene, wood_tex, &tex_path, &mut stage) {
            let mut writer = writer?;
            writer.write(&scene, &mut stage, None)?;
            if let Some(output) = writer.shading_attr_name(&mut stage, "outColor") {
                info!(shader = %tex_path, output, "authored texture shader");
            }
        }
    }

    println!("{}", stage.to_text());
    Ok(())
}
