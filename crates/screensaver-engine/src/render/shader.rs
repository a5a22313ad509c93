//! Shader program lifecycle: read, compile, link, bind, set uniforms.
//!
//! Stages are parsed and validated with naga before wgpu ever sees them, so a
//! broken source file produces a [`ShaderError`] instead of a device error.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use glam::Mat4;

use super::uniforms::{UNIFORM_BINDING, UNIFORM_GROUP, UniformBlock, UniformLayout};

/// Bind group holding the box texture (binding 0) and its sampler (binding 1).
pub const TEXTURE_GROUP: u32 = 1;

/// Default box shaders shipped with the engine.
pub const BOX_VERTEX_SHADER: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/box.vert.wgsl");
pub const BOX_FRAGMENT_SHADER: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/box.frag.wgsl");

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Entry point each stage must export.
    pub fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
        }
    }

    fn naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read {stage} shader {}: {source}", .path.display())]
    Read {
        stage: ShaderStage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} shader compilation failed\n{log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("shader program linking failed\n{log}")]
    Link { log: String },
}

// ── compile / link ────────────────────────────────────────────────────────

/// Naga capabilities a stage may use on a device with `features`.
///
/// Capabilities without a mapping here stay off, so a stage needing them is
/// rejected at compile time rather than by the device.
pub fn stage_capabilities(features: wgpu::Features) -> naga::valid::Capabilities {
    use naga::valid::Capabilities as Caps;

    let mut caps = Caps::empty();
    caps.set(Caps::FLOAT64, features.contains(wgpu::Features::SHADER_F64));
    caps.set(Caps::SHADER_FLOAT16, features.contains(wgpu::Features::SHADER_F16));
    caps.set(Caps::SHADER_INT64, features.contains(wgpu::Features::SHADER_INT64));
    caps.set(
        Caps::PRIMITIVE_INDEX,
        features.contains(wgpu::Features::SHADER_PRIMITIVE_INDEX),
    );
    caps.set(Caps::MULTIVIEW, features.contains(wgpu::Features::MULTIVIEW));
    caps.set(Caps::CLIP_DISTANCE, features.contains(wgpu::Features::CLIP_DISTANCES));
    caps
}

/// A parsed and validated stage.
pub struct CompiledStage {
    stage: ShaderStage,
    module: naga::Module,
    uniforms: Option<UniformLayout>,
}

impl CompiledStage {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn uniforms(&self) -> Option<&UniformLayout> {
        self.uniforms.as_ref()
    }
}

/// Parses and validates one WGSL stage against `capabilities`.
pub fn compile_stage(
    stage: ShaderStage,
    source: &str,
    capabilities: naga::valid::Capabilities,
) -> Result<CompiledStage, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        stage,
        log: e.emit_to_string(source),
    })?;

    let mut validator =
        naga::valid::Validator::new(naga::valid::ValidationFlags::all(), capabilities);
    validator.validate(&module).map_err(|e| ShaderError::Compile {
        stage,
        log: e.emit_to_string(source),
    })?;

    let uniforms = UniformLayout::reflect(&module);
    Ok(CompiledStage {
        stage,
        module,
        uniforms,
    })
}

/// Checks that two stages form a program the box pipeline can run with
/// vertices laid out as `vertex_layout`.
///
/// Returns the shared uniform layout.
pub fn link(
    vertex: &CompiledStage,
    fragment: &CompiledStage,
    vertex_layout: &wgpu::VertexBufferLayout<'_>,
) -> Result<UniformLayout, ShaderError> {
    let link_err = |log: String| ShaderError::Link { log };

    let vs = entry_point(vertex, ShaderStage::Vertex).ok_or_else(|| {
        link_err(format!("vertex stage has no `{}` entry point", ShaderStage::Vertex.entry_point()))
    })?;
    let fs = entry_point(fragment, ShaderStage::Fragment).ok_or_else(|| {
        link_err(format!(
            "fragment stage has no `{}` entry point",
            ShaderStage::Fragment.entry_point()
        ))
    })?;

    // vertex inputs must come from the vertex buffer, format for format
    for (loc, input) in argument_varyings(&vertex.module, &vs.function) {
        let Some(attr) = vertex_layout.attributes.iter().find(|a| a.shader_location == loc) else {
            return Err(link_err(format!(
                "vertex input @location({loc}) is not provided by the vertex buffer"
            )));
        };
        if vertex_format_type(attr.format).as_ref() != Some(&input.ty) {
            return Err(link_err(format!(
                "vertex input @location({loc}) is {} but the vertex buffer provides {:?}",
                type_name(&input.ty),
                attr.format
            )));
        }
    }

    // fragment inputs must be written by the vertex stage with the same type
    let vs_outputs = result_varyings(&vertex.module, &vs.function);
    for (loc, input) in argument_varyings(&fragment.module, &fs.function) {
        match vs_outputs.get(&loc) {
            None => {
                return Err(link_err(format!(
                    "fragment input @location({loc}) is not written by the vertex stage"
                )));
            }
            Some(output) if output.ty != input.ty => {
                return Err(link_err(format!(
                    "fragment input @location({loc}) is {} but the vertex stage writes {}",
                    type_name(&input.ty),
                    type_name(&output.ty)
                )));
            }
            Some(output) if output != &input => {
                return Err(link_err(format!(
                    "fragment input @location({loc}) interpolates differently from the vertex output"
                )));
            }
            Some(_) => {}
        }
    }

    let color = naga::TypeInner::Vector {
        size: naga::VectorSize::Quad,
        scalar: naga::Scalar::F32,
    };
    let fs_outputs = result_varyings(&fragment.module, &fs.function);
    if fs_outputs.get(&0).map(|v| &v.ty) != Some(&color) {
        return Err(link_err("fragment stage must write vec4<f32> to @location(0)".to_string()));
    }

    for stage in [vertex, fragment] {
        check_resources(stage).map_err(link_err)?;
    }

    match (&vertex.uniforms, &fragment.uniforms) {
        (Some(v), Some(f)) if v != f => Err(link_err(
            "vertex and fragment stages declare different uniform blocks".to_string(),
        )),
        (Some(layout), _) | (None, Some(layout)) => Ok(layout.clone()),
        (None, None) => Err(link_err(format!(
            "no uniform block at @group({UNIFORM_GROUP}) @binding({UNIFORM_BINDING})"
        ))),
    }
}

fn entry_point(stage: &CompiledStage, expected: ShaderStage) -> Option<&naga::EntryPoint> {
    stage
        .module
        .entry_points
        .iter()
        .find(|ep| ep.name == expected.entry_point() && ep.stage == expected.naga())
}

/// A user-defined stage input or output.
#[derive(Debug, Clone, PartialEq)]
struct Varying {
    ty: naga::TypeInner,
    interpolation: Option<naga::Interpolation>,
    sampling: Option<naga::Sampling>,
}

type Varyings = BTreeMap<u32, Varying>;

fn collect_varyings(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Varyings,
) {
    match binding {
        Some(naga::Binding::Location {
            location,
            interpolation,
            sampling,
            ..
        }) => {
            out.insert(
                *location,
                Varying {
                    ty: module.types[ty].inner.clone(),
                    interpolation: *interpolation,
                    sampling: *sampling,
                },
            );
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for m in members {
                    collect_varyings(module, m.ty, m.binding.as_ref(), out);
                }
            }
        }
    }
}

fn argument_varyings(module: &naga::Module, function: &naga::Function) -> Varyings {
    let mut out = Varyings::new();
    for arg in &function.arguments {
        collect_varyings(module, arg.ty, arg.binding.as_ref(), &mut out);
    }
    out
}

fn result_varyings(module: &naga::Module, function: &naga::Function) -> Varyings {
    let mut out = Varyings::new();
    if let Some(result) = &function.result {
        collect_varyings(module, result.ty, result.binding.as_ref(), &mut out);
    }
    out
}

/// Shader type a float vertex format is read as. Other formats are not
/// accepted by the box pipeline.
fn vertex_format_type(format: wgpu::VertexFormat) -> Option<naga::TypeInner> {
    let scalar = naga::Scalar::F32;
    let vector = |size| naga::TypeInner::Vector { size, scalar };
    Some(match format {
        wgpu::VertexFormat::Float32 => naga::TypeInner::Scalar(scalar),
        wgpu::VertexFormat::Float32x2 => vector(naga::VectorSize::Bi),
        wgpu::VertexFormat::Float32x3 => vector(naga::VectorSize::Tri),
        wgpu::VertexFormat::Float32x4 => vector(naga::VectorSize::Quad),
        _ => return None,
    })
}

fn type_name(ty: &naga::TypeInner) -> String {
    fn scalar_name(s: naga::Scalar) -> String {
        let prefix = match s.kind {
            naga::ScalarKind::Float => "f",
            naga::ScalarKind::Sint => "i",
            naga::ScalarKind::Uint => "u",
            naga::ScalarKind::Bool => return "bool".to_string(),
            _ => return format!("{:?}", s.kind),
        };
        format!("{prefix}{}", u32::from(s.width) * 8)
    }

    match ty {
        naga::TypeInner::Scalar(s) => scalar_name(*s),
        naga::TypeInner::Vector { size, scalar } => {
            format!("vec{}<{}>", *size as u8, scalar_name(*scalar))
        }
        other => format!("{other:?}"),
    }
}

/// Checks every resource binding of `stage` against the box pipeline layout:
/// the uniform block in group 0, a filterable 2D texture and a filtering
/// sampler in group 1 (fragment only).
fn check_resources(stage: &CompiledStage) -> Result<(), String> {
    let fragment = stage.stage == ShaderStage::Fragment;

    for (_, var) in stage.module.global_variables.iter() {
        let Some(b) = &var.binding else { continue };
        let ty = &stage.module.types[var.ty].inner;

        let fits = match (b.group, b.binding) {
            (UNIFORM_GROUP, UNIFORM_BINDING) => var.space == naga::AddressSpace::Uniform,
            (TEXTURE_GROUP, 0) => {
                fragment
                    && matches!(
                        ty,
                        naga::TypeInner::Image {
                            dim: naga::ImageDimension::D2,
                            arrayed: false,
                            class: naga::ImageClass::Sampled {
                                kind: naga::ScalarKind::Float,
                                multi: false,
                            },
                        }
                    )
            }
            (TEXTURE_GROUP, 1) => {
                fragment && matches!(ty, naga::TypeInner::Sampler { comparison: false })
            }
            (group, binding) => {
                return Err(format!(
                    "{} stage declares unsupported resource @group({group}) @binding({binding})",
                    stage.stage
                ));
            }
        };

        if !fits {
            return Err(format!(
                "{} stage resource @group({}) @binding({}) does not match the box pipeline layout",
                stage.stage, b.group, b.binding
            ));
        }
    }
    Ok(())
}

fn read_source(stage: ShaderStage, path: &Path) -> Result<String, ShaderError> {
    std::fs::read_to_string(path).map_err(|source| ShaderError::Read {
        stage,
        path: path.to_path_buf(),
        source,
    })
}

// ── program ───────────────────────────────────────────────────────────────

struct LinkedProgram {
    pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    uniforms: UniformBlock,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
}

/// A linked vertex + fragment program, or nothing.
///
/// The empty state is what a fresh program or a program whose first compile
/// failed looks like; it binds nothing and ignores uniform writes.
#[derive(Default)]
pub struct ShaderProgram {
    linked: Option<LinkedProgram>,
}

impl ShaderProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads both sources and builds the program for vertices laid out as
    /// `vertex_layout`.
    ///
    /// On failure the previous program (or the empty state) is kept.
    pub fn compile(
        &mut self,
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        vertex_layout: &wgpu::VertexBufferLayout<'_>,
        vertex_path: &Path,
        fragment_path: &Path,
    ) -> Result<(), ShaderError> {
        let vertex_src = read_source(ShaderStage::Vertex, vertex_path)?;
        let fragment_src = read_source(ShaderStage::Fragment, fragment_path)?;
        self.compile_sources(device, target_format, vertex_layout, &vertex_src, &fragment_src)?;
        log::info!(
            "shader program linked ({}, {})",
            vertex_path.display(),
            fragment_path.display()
        );
        Ok(())
    }

    /// Builds the program from in-memory sources.
    pub fn compile_sources(
        &mut self,
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        vertex_layout: &wgpu::VertexBufferLayout<'_>,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<(), ShaderError> {
        let caps = stage_capabilities(device.features());
        let vertex = compile_stage(ShaderStage::Vertex, vertex_src, caps)?;
        let fragment = compile_stage(ShaderStage::Fragment, fragment_src, caps)?;
        let layout = link(&vertex, &fragment, vertex_layout)?;

        let linked =
            LinkedProgram::create(device, target_format, vertex_layout, vertex, fragment, layout)?;
        self.linked = Some(linked);
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.linked.is_some()
    }

    /// Layout of the texture bind group, once linked.
    pub fn texture_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.linked.as_ref().map(|p| &p.texture_layout)
    }

    /// Binds the pipeline and the uniform bind group. Returns `false` when
    /// there is nothing to bind.
    pub fn use_program(&self, pass: &mut wgpu::RenderPass<'_>) -> bool {
        let Some(p) = self.linked.as_ref() else { return false };
        pass.set_pipeline(&p.pipeline);
        pass.set_bind_group(UNIFORM_GROUP, &p.uniform_bind_group, &[]);
        true
    }

    pub fn set_uniform_int(&mut self, name: &str, value: i32) {
        if let Some(p) = self.linked.as_mut() {
            p.uniforms.set_int(name, value);
        }
    }

    pub fn set_uniform_float3(&mut self, name: &str, value: [f32; 3]) {
        if let Some(p) = self.linked.as_mut() {
            p.uniforms.set_float3(name, value);
        }
    }

    pub fn set_uniform_float4(&mut self, name: &str, value: [f32; 4]) {
        if let Some(p) = self.linked.as_mut() {
            p.uniforms.set_float4(name, value);
        }
    }

    pub fn set_uniform_mat4(&mut self, name: &str, value: Mat4) {
        if let Some(p) = self.linked.as_mut() {
            p.uniforms.set_mat4(name, value);
        }
    }

    /// Staged uniform values, once linked.
    pub fn uniforms(&self) -> Option<&UniformBlock> {
        self.linked.as_ref().map(|p| &p.uniforms)
    }

    /// Uploads staged uniform values if any changed.
    pub fn flush_uniforms(&mut self, queue: &wgpu::Queue) {
        let Some(p) = self.linked.as_mut() else { return };
        if p.uniforms.take_dirty() {
            queue.write_buffer(&p.uniform_buffer, 0, p.uniforms.bytes());
        }
    }
}

impl LinkedProgram {
    fn create(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        vertex_layout: &wgpu::VertexBufferLayout<'_>,
        vertex: CompiledStage,
        fragment: CompiledStage,
        layout: UniformLayout,
    ) -> Result<Self, ShaderError> {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("screensaver box uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: UNIFORM_BINDING,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(u64::from(layout.size())),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("screensaver box texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("screensaver box pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            immediate_size: 0,
        });

        // Anything the device still rejects is reported here instead of
        // reaching the uncaptured error handler.
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        // Both modules go out of scope once the pipeline exists.
        let vs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("screensaver box vertex shader"),
            source: wgpu::ShaderSource::Naga(Cow::Owned(vertex.module)),
        });
        let fs_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("screensaver box fragment shader"),
            source: wgpu::ShaderSource::Naga(Cow::Owned(fragment.module)),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("screensaver box pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &vs_module,
                entry_point: Some(ShaderStage::Vertex.entry_point()),
                compilation_options: Default::default(),
                buffers: std::slice::from_ref(vertex_layout),
            },

            fragment: Some(wgpu::FragmentState {
                module: &fs_module,
                entry_point: Some(ShaderStage::Fragment.entry_point()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    // box color is straight alpha
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(ShaderError::Link {
                log: err.to_string(),
            });
        }

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("screensaver box ubo"),
            size: u64::from(layout.size()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("screensaver box uniform bind group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: UNIFORM_BINDING,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            pipeline,
            texture_layout,
            uniforms: UniformBlock::new(layout),
            uniform_buffer,
            uniform_bind_group,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessGpu;
    use crate::render::buffers::QuadVertex;

    const TARGET: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// Fragment stage reading its input as vec4 while the box vertex stage
    /// writes vec2 at the same location.
    const WIDENED_FRAGMENT: &str = "
        struct BoxUniforms {
            model: mat4x4<f32>,
            boxColor: vec4<f32>,
            useTexture: i32,
        };
        @group(0) @binding(0) var<uniform> u: BoxUniforms;

        @fragment
        fn fs_main(@location(0) tex_coord: vec4<f32>) -> @location(0) vec4<f32> {
            return tex_coord * u.boxColor;
        }
    ";

    fn box_sources() -> (String, String) {
        (
            std::fs::read_to_string(BOX_VERTEX_SHADER).unwrap(),
            std::fs::read_to_string(BOX_FRAGMENT_SHADER).unwrap(),
        )
    }

    fn caps() -> naga::valid::Capabilities {
        stage_capabilities(wgpu::Features::empty())
    }

    fn compile(stage: ShaderStage, src: &str) -> CompiledStage {
        compile_stage(stage, src, caps()).unwrap()
    }

    fn link_box(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<UniformLayout, ShaderError> {
        link(vertex, fragment, &QuadVertex::layout())
    }

    // ── compile ───────────────────────────────────────────────────────────

    #[test]
    fn shipped_shaders_compile_and_link() {
        let (vs, fs) = box_sources();
        let vertex = compile(ShaderStage::Vertex, &vs);
        let fragment = compile(ShaderStage::Fragment, &fs);
        let layout = link_box(&vertex, &fragment).unwrap();
        assert!(layout.field("model").is_some());
        assert!(layout.field("boxColor").is_some());
        assert!(layout.field("useTexture").is_some());
    }

    #[test]
    fn malformed_fragment_reports_fragment_stage() {
        let err = compile_stage(ShaderStage::Fragment, "@fragment fn fs_main( {", caps())
            .err()
            .unwrap();
        match err {
            ShaderError::Compile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!log.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn type_errors_fail_validation() {
        let src = "@fragment fn fs_main() -> @location(0) vec4<f32> { return 1; }";
        assert!(matches!(
            compile_stage(ShaderStage::Fragment, src, caps()),
            Err(ShaderError::Compile { stage: ShaderStage::Fragment, .. })
        ));
    }

    #[test]
    fn features_missing_on_the_device_fail_validation() {
        let src = "
            @fragment
            fn fs_main(@builtin(position) p: vec4<f32>) -> @location(0) vec4<f32> {
                let x = f64(p.x);
                return vec4<f32>(f32(x));
            }
        ";
        assert!(matches!(
            compile_stage(ShaderStage::Fragment, src, caps()),
            Err(ShaderError::Compile { stage: ShaderStage::Fragment, .. })
        ));

        let with_f64 = stage_capabilities(wgpu::Features::SHADER_F64);
        assert!(with_f64.contains(naga::valid::Capabilities::FLOAT64));
        assert!(compile_stage(ShaderStage::Fragment, src, with_f64).is_ok());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.wgsl");
        let err = read_source(ShaderStage::Vertex, &missing).unwrap_err();
        assert!(matches!(err, ShaderError::Read { stage: ShaderStage::Vertex, .. }));
        assert!(err.to_string().contains("nope.wgsl"));
    }

    // ── link ──────────────────────────────────────────────────────────────

    #[test]
    fn wrong_entry_point_fails_link() {
        let (vs, fs) = box_sources();
        let vertex = compile(ShaderStage::Vertex, &vs);
        let fragment = compile(ShaderStage::Fragment, &fs.replace("fs_main", "main"));
        let err = link_box(&vertex, &fragment).unwrap_err();
        assert!(matches!(&err, ShaderError::Link { log } if log.contains("fs_main")));
    }

    #[test]
    fn mismatched_uniform_blocks_fail_link() {
        let (vs, fs) = box_sources();
        let vertex = compile(ShaderStage::Vertex, &vs);
        let fragment = compile(
            ShaderStage::Fragment,
            &fs.replace("boxColor: vec4<f32>", "boxColor: vec3<f32>")
                .replace("* u.boxColor", "* vec4<f32>(u.boxColor, 1.0)")
                .replace("return u.boxColor", "return vec4<f32>(u.boxColor, 1.0)"),
        );
        assert!(matches!(link_box(&vertex, &fragment), Err(ShaderError::Link { .. })));
    }

    #[test]
    fn unfed_fragment_input_fails_link() {
        let (vs, _) = box_sources();
        let vertex = compile(ShaderStage::Vertex, &vs);
        let fragment = compile(
            ShaderStage::Fragment,
            "@fragment fn fs_main(@location(3) c: vec4<f32>) -> @location(0) vec4<f32> { return c; }",
        );
        let err = link_box(&vertex, &fragment).unwrap_err();
        assert!(matches!(&err, ShaderError::Link { log } if log.contains("@location(3)")));
    }

    #[test]
    fn varying_type_mismatch_fails_link() {
        let (vs, _) = box_sources();
        let vertex = compile(ShaderStage::Vertex, &vs);
        let fragment = compile(ShaderStage::Fragment, WIDENED_FRAGMENT);
        let err = link_box(&vertex, &fragment).unwrap_err();
        assert!(matches!(
            &err,
            ShaderError::Link { log } if log.contains("vec4<f32>") && log.contains("vec2<f32>")
        ));
    }

    #[test]
    fn vertex_input_must_match_buffer_format() {
        let (vs, fs) = box_sources();
        let vertex = compile(
            ShaderStage::Vertex,
            &vs.replace("@location(0) position: vec3<f32>", "@location(0) position: vec4<f32>")
                .replace("vec4<f32>(input.position, 1.0)", "input.position"),
        );
        let fragment = compile(ShaderStage::Fragment, &fs);
        let err = link_box(&vertex, &fragment).unwrap_err();
        assert!(matches!(&err, ShaderError::Link { log } if log.contains("Float32x3")));
    }

    #[test]
    fn wrong_resource_kind_fails_link() {
        let (vs, fs) = box_sources();
        let vertex = compile(ShaderStage::Vertex, &vs);
        let fragment = compile(
            ShaderStage::Fragment,
            &fs.replace("var box_sampler: sampler", "var box_sampler: sampler_comparison")
                .replace(
                    "textureSample(box_texture, box_sampler, input.tex_coord)",
                    "vec4<f32>(1.0)",
                ),
        );
        let err = link_box(&vertex, &fragment).unwrap_err();
        assert!(matches!(&err, ShaderError::Link { log } if log.contains("@binding(1)")));
    }

    // ── program (GPU) ─────────────────────────────────────────────────────

    #[test]
    fn failed_compile_keeps_prior_program() {
        let Some(gpu) = HeadlessGpu::try_new() else { return };
        let (vs, fs) = box_sources();
        let vl = QuadVertex::layout();

        let mut program = ShaderProgram::new();
        assert!(program.compile_sources(gpu.device(), TARGET, &vl, &vs, "fn broken(").is_err());
        assert!(!program.is_valid());

        program.compile_sources(gpu.device(), TARGET, &vl, &vs, &fs).unwrap();
        assert!(program.is_valid());

        program.set_uniform_int("useTexture", 1);
        let err = program
            .compile_sources(gpu.device(), TARGET, &vl, &vs, "fn broken(")
            .unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: ShaderStage::Fragment, .. }));
        assert!(program.is_valid());
        assert_eq!(program.uniforms().and_then(|u| u.int("useTexture")), Some(1));
    }

    #[test]
    fn failed_link_keeps_prior_program() {
        let Some(gpu) = HeadlessGpu::try_new() else { return };
        let (vs, fs) = box_sources();
        let vl = QuadVertex::layout();

        let mut program = ShaderProgram::new();
        program.compile_sources(gpu.device(), TARGET, &vl, &vs, &fs).unwrap();
        program.set_uniform_int("useTexture", 1);

        let err = program
            .compile_sources(gpu.device(), TARGET, &vl, &vs, WIDENED_FRAGMENT)
            .unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }));
        assert!(program.is_valid());
        assert_eq!(program.uniforms().and_then(|u| u.int("useTexture")), Some(1));
    }

    #[test]
    fn device_rejection_becomes_link_error() {
        let Some(gpu) = HeadlessGpu::try_new() else { return };
        let (vs, fs) = box_sources();
        let vertex = compile(ShaderStage::Vertex, &vs);
        let fragment = compile(ShaderStage::Fragment, &fs);
        let layout = link_box(&vertex, &fragment).unwrap();

        // location 1 is missing from this buffer layout
        let attrs = wgpu::vertex_attr_array![0 => Float32x3];
        let short = wgpu::VertexBufferLayout {
            array_stride: 12,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attrs,
        };
        let result = LinkedProgram::create(gpu.device(), TARGET, &short, vertex, fragment, layout);
        assert!(matches!(result, Err(ShaderError::Link { .. })));
    }

    #[test]
    fn compile_from_paths() {
        let Some(gpu) = HeadlessGpu::try_new() else { return };
        let mut program = ShaderProgram::new();
        program
            .compile(
                gpu.device(),
                TARGET,
                &QuadVertex::layout(),
                Path::new(BOX_VERTEX_SHADER),
                Path::new(BOX_FRAGMENT_SHADER),
            )
            .unwrap();
        assert!(program.is_valid());
        assert!(program.texture_layout().is_some());
    }

    #[test]
    fn uniform_writes_on_empty_program_are_ignored() {
        let mut program = ShaderProgram::new();
        program.set_uniform_int("useTexture", 1);
        program.set_uniform_mat4("model", Mat4::IDENTITY);
        assert!(program.uniforms().is_none());
    }
}
