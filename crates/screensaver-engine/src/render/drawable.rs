//! The box: buffers, program and texture behind one draw call.

use std::path::PathBuf;

use glam::{Mat4, Vec3};

use crate::paint::Color;

use super::buffers::{BufferSet, QUAD_INDICES, quad_vertices};
use super::image::DecodedImage;
use super::shader::{BOX_FRAGMENT_SHADER, BOX_VERTEX_SHADER, ShaderProgram, TEXTURE_GROUP};
use super::texture::{
    TextureError, TextureId, TextureInfo, TextureResource, TextureSettings,
    create_fallback_bind_group,
};
use super::{RenderCtx, RenderTarget};

/// Uniform names the box program is driven through.
pub const MODEL_UNIFORM: &str = "model";
pub const BOX_COLOR_UNIFORM: &str = "boxColor";
pub const USE_TEXTURE_UNIFORM: &str = "useTexture";

/// Construction parameters for [`BoxDrawable`].
#[derive(Debug, Clone)]
pub struct BoxDesc {
    /// Half-extent of the quad in NDC.
    pub size: f32,
    pub color: Color,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
}

impl Default for BoxDesc {
    fn default() -> Self {
        Self {
            size: 0.2,
            color: Color::WHITE,
            vertex_shader: PathBuf::from(BOX_VERTEX_SHADER),
            fragment_shader: PathBuf::from(BOX_FRAGMENT_SHADER),
        }
    }
}

/// A single colored, optionally textured quad.
pub struct BoxDrawable {
    buffers: BufferSet,
    shader: ShaderProgram,
    texture: TextureResource,

    /// Bound in the texture slot while no texture is live.
    fallback: Option<wgpu::BindGroup>,

    color: Color,
    position: Vec3,
    size: f32,

    /// Extra transform for the next draw only.
    model: Mat4,

    warned_invalid: bool,
}

impl BoxDrawable {
    /// Allocates and uploads the quad and compiles the program.
    ///
    /// A program that fails to compile is logged; the box then skips its draws.
    pub fn new(ctx: &RenderCtx<'_>, desc: BoxDesc) -> Self {
        let buffers = BufferSet::allocate(ctx.device);
        buffers.upload(ctx.queue, &quad_vertices(desc.size), &QUAD_INDICES);

        let mut shader = ShaderProgram::new();
        if let Err(e) = shader.compile(
            ctx.device,
            ctx.surface_format,
            buffers.layout(),
            &desc.vertex_shader,
            &desc.fragment_shader,
        ) {
            log::error!("{e}");
        }

        let fallback = shader
            .texture_layout()
            .map(|layout| create_fallback_bind_group(ctx.device, ctx.queue, layout));

        Self {
            buffers,
            shader,
            texture: TextureResource::new(),
            fallback,
            color: desc.color,
            position: Vec3::ZERO,
            size: desc.size,
            model: Mat4::IDENTITY,
            warned_invalid: false,
        }
    }

    /// Whether the program linked and draws will produce output.
    pub fn is_drawable(&self) -> bool {
        self.shader.is_valid()
    }

    /// Records the box into `target`, loading what is already there.
    ///
    /// Overwrites the pass pipeline, bind groups and buffers. The per-frame
    /// model transform is reset afterwards.
    pub fn draw(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        if !self.shader.is_valid() {
            if !self.warned_invalid {
                log::warn!("box has no valid shader program; draw skipped");
                self.warned_invalid = true;
            }
            self.model = Mat4::IDENTITY;
            return;
        }

        // Uniforms go through the queue, which executes before this frame's
        // command buffer, so they must be staged before recording.
        let textured = self.texture.has_texture();
        if textured {
            self.shader.set_uniform_int(USE_TEXTURE_UNIFORM, 1);
        }
        self.shader.set_uniform_float4(BOX_COLOR_UNIFORM, self.color.to_array());
        self.shader.set_uniform_mat4(MODEL_UNIFORM, self.model_matrix());
        self.shader.flush_uniforms(ctx.queue);

        {
            let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("screensaver box pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            self.shader.use_program(&mut rpass);

            let texture_group = self
                .texture
                .bind_group()
                .filter(|_| textured)
                .or(self.fallback.as_ref());
            if let Some(group) = texture_group {
                rpass.set_bind_group(TEXTURE_GROUP, group, &[]);
            }

            self.buffers.bind(&mut rpass);
            rpass.draw_indexed(0..self.buffers.index_count(), 0, 0..1);
        }

        self.model = Mat4::IDENTITY;
    }

    /// Matrix uploaded by the next draw: position, then the per-frame
    /// transform.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position) * self.model
    }

    /// Applies a translation to the next draw only.
    pub fn translate(&mut self, delta: Vec3) {
        self.model *= Mat4::from_translation(delta);
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color.clamped();
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    /// Swaps in a new texture. The old one is released first, so a rejected
    /// image leaves the box untextured.
    pub fn replace_texture(
        &mut self,
        ctx: &RenderCtx<'_>,
        image: &DecodedImage,
        settings: TextureSettings,
    ) -> Result<TextureId, TextureError> {
        let Some(layout) = self.shader.texture_layout() else {
            return Err(TextureError::NoProgram);
        };
        let result = self
            .texture
            .replace(ctx.device, ctx.queue, layout, image, settings);
        if result.is_err() {
            self.shader.set_uniform_int(USE_TEXTURE_UNIFORM, 0);
        }
        result
    }

    pub fn delete_texture(&mut self) {
        self.texture.delete();
        self.shader.set_uniform_int(USE_TEXTURE_UNIFORM, 0);
    }

    pub fn has_texture(&self) -> bool {
        self.texture.has_texture()
    }

    pub fn texture_info(&self) -> Option<TextureInfo> {
        self.texture.info()
    }

    pub fn shader(&self) -> &ShaderProgram {
        &self.shader
    }
}
