//! Writer for native file-texture nodes.
//!
//! Authors a `UsdUVTexture` shader fed by a `UsdPrimvarReader_float2`
//! texture-coordinate reader, mapping the native node's gain/offset/wrap
//! attributes onto the texture's scale, bias, fallback and wrap inputs.

use std::path::Path;

use glam::{Vec3, Vec4};

use crate::path::ScenePath;
use crate::scene::{NodeId, SceneGraph};
use crate::shade::{output_attr, Shader};
use crate::stage::{types, Stage, Value};
use crate::util::{make_relative, Result};

use super::ShaderWriter;

const UV_TEXTURE_ID: &str = "UsdUVTexture";
const PRIMVAR_READER_ID: &str = "UsdPrimvarReader_float2";
const PRIMVAR_READER_NAME: &str = "TexCoordReader";

pub struct FileTextureWriter {
    node: NodeId,
    shader: Shader,
}

impl FileTextureWriter {
    /// Native node type this writer handles.
    pub const NODE_TYPE: &'static str = "file";

    /// Define the texture shader and its fixed coordinate-reader
    /// sub-network at `path`.
    pub fn new(
        _scene: &SceneGraph,
        node: NodeId,
        path: &ScenePath,
        stage: &mut Stage,
    ) -> Result<Self> {
        let shader = Shader::define(stage, path)?;
        shader.create_id_attr(stage, UV_TEXTURE_ID);

        let reader = Shader::define(stage, &path.append_child(PRIMVAR_READER_NAME))?;
        reader.create_id_attr(stage, PRIMVAR_READER_ID);
        // TODO: pick the UV set to read when the mesh doesn't use the
        // primary one.
        reader.set_input(
            stage,
            "varname",
            types::TOKEN,
            Value::Token("st".to_string()),
            None,
        );
        reader.create_output(stage, "result", types::FLOAT2);
        shader.connect_input(stage, "st", types::FLOAT2, &reader, "result");

        Ok(Self { node, shader })
    }

    fn authored_float3(&self, scene: &SceneGraph, name: &str) -> Option<Vec3> {
        let plug = scene.find_plug(self.node, name)?;
        if plug.is_authored() {
            plug.as_float3()
        } else {
            None
        }
    }

    fn authored_float(&self, scene: &SceneGraph, name: &str) -> Option<f32> {
        let plug = scene.find_plug(self.node, name)?;
        if plug.is_authored() {
            plug.as_float()
        } else {
            None
        }
    }

    fn authored_bool(&self, scene: &SceneGraph, name: &str) -> Option<bool> {
        let plug = scene.find_plug(self.node, name)?;
        if plug.is_authored() {
            plug.as_bool()
        } else {
            None
        }
    }
}

impl ShaderWriter for FileTextureWriter {
    fn write(&mut self, scene: &SceneGraph, stage: &mut Stage, time: Option<f64>) -> Result<()> {
        let Some(file) = scene
            .find_plug(self.node, "fileTextureName")
            .and_then(|p| p.as_string())
        else {
            return Ok(());
        };
        let mut file = file.to_string();

        // Minimal lexical relativization against the stage's root layer;
        // a proper asset resolver is out of scope.
        if let Some(dir) = stage.root_layer_path().and_then(|p| p.parent()) {
            let dir = dir.to_path_buf();
            file = make_relative(Path::new(&file), &dir)
                .to_string_lossy()
                .into_owned();
        }
        self.shader
            .set_input(stage, "file", types::ASSET, Value::Asset(file), time);

        // colorGain and alphaGain fold into the texture's scale input.
        let mut scale = Vec4::ONE;
        let mut scale_authored = false;
        if let Some(rgb) = self.authored_float3(scene, "colorGain") {
            scale = rgb.extend(scale.w);
            scale_authored = true;
        }
        if let Some(a) = self.authored_float(scene, "alphaGain") {
            scale.w = a;
            scale_authored = true;
        }
        if scale_authored {
            self.shader
                .set_input(stage, "scale", types::FLOAT4, Value::Float4(scale), time);
        }

        // colorOffset and alphaOffset fold into the bias input.
        let mut bias = Vec4::ZERO;
        let mut bias_authored = false;
        if let Some(rgb) = self.authored_float3(scene, "colorOffset") {
            bias = rgb.extend(bias.w);
            bias_authored = true;
        }
        if let Some(a) = self.authored_float(scene, "alphaOffset") {
            bias.w = a;
            bias_authored = true;
        }
        if bias_authored {
            self.shader
                .set_input(stage, "bias", types::FLOAT4, Value::Float4(bias), time);
        }

        // The default color carries no alpha, and its unauthored native
        // value (0.5, 0.5, 0.5) differs from the texture's own fallback,
        // so the fallback input is authored unconditionally.
        let default_color = scene
            .find_plug(self.node, "defaultColor")
            .and_then(|p| p.as_float3())
            .unwrap_or(Vec3::splat(0.5));
        self.shader.set_input(
            stage,
            "fallback",
            types::FLOAT4,
            Value::Float4(default_color.extend(1.0)),
            time,
        );

        for (native, target) in [("wrapU", "wrapS"), ("wrapV", "wrapT")] {
            if let Some(wrap) = self.authored_bool(scene, native) {
                let token = if wrap { "repeat" } else { "black" };
                self.shader.set_input(
                    stage,
                    target,
                    types::TOKEN,
                    Value::Token(token.to_string()),
                    time,
                );
            }
        }

        Ok(())
    }

    fn shading_attr_name(&mut self, stage: &mut Stage, native_attr: &str) -> Option<String> {
        let (name, type_name) = match native_attr {
            "outColor" => ("rgb", types::FLOAT3),
            "outColorR" => ("r", types::FLOAT),
            "outColorG" => ("g", types::FLOAT),
            "outColorB" => ("b", types::FLOAT),
            "outAlpha" | "outTransparency" | "outTransparencyR" | "outTransparencyG"
            | "outTransparencyB" => ("a", types::FLOAT),
            _ => return None,
        };
        self.shader.create_output(stage, name, type_name);
        Some(output_attr(name))
    }

    fn shader(&self) -> &Shader {
        &self.shader
    }
}
