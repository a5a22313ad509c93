//! Application builder and per-frame orchestration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use screensaver_engine::core::{App as EngineApp, AppControl, FrameCtx};
use screensaver_engine::device::GpuInit;
use screensaver_engine::glam::Vec2;
use screensaver_engine::motion::{MotionConfig, MotionIntegrator, ReflectMode};
use screensaver_engine::paint::Color;
use screensaver_engine::render::RenderCtx;
use screensaver_engine::render::drawable::{BoxDesc, BoxDrawable};
use screensaver_engine::render::image::decode_image;
use screensaver_engine::render::texture::{PixelFormat, TextureSettings};
use screensaver_engine::window::{Runtime, RuntimeConfig};
use screensaver_ui::dialog::NativeFileDialog;
use screensaver_ui::modal::{ModalController, ModalOutcome, TextureTarget};
use screensaver_ui::panel::{ControlPanel, PanelCommands};

/// The window title is refreshed this often (in frames).
const TITLE_INTERVAL: u64 = 6;

// ── Screensaver ───────────────────────────────────────────────────────────

/// Top-level application builder.
///
/// ```rust,ignore
/// Screensaver::new()
///     .title("Screensaver GL")
///     .box_size(0.25)
///     .texture("wall.png")
///     .run()?;
/// ```
pub struct Screensaver {
    title: String,
    width: f64,
    height: f64,
    box_desc: BoxDesc,
    motion: MotionConfig,
    texture: Option<PathBuf>,
    dialog: NativeFileDialog,
    gpu_init: GpuInit,
}

impl Screensaver {
    pub fn new() -> Self {
        Self {
            title: "Screensaver GL".to_string(),
            width: 800.0,
            height: 600.0,
            box_desc: BoxDesc::default(),
            motion: MotionConfig::default(),
            texture: None,
            dialog: NativeFileDialog::new()
                .with_title("Choose a texture")
                .with_image_filter(),
            gpu_init: GpuInit::default(),
        }
    }

    pub fn title(mut self, t: impl Into<String>) -> Self {
        self.title = t.into();
        self
    }

    /// Initial window size in logical pixels.
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Half-extent of the box in NDC.
    pub fn box_size(mut self, size: f32) -> Self {
        self.box_desc.size = size;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.box_desc.color = color;
        self
    }

    /// Speed in NDC units per second.
    pub fn speed(mut self, base_speed: f32) -> Self {
        self.motion.base_speed = base_speed;
        self
    }

    pub fn direction(mut self, direction: Vec2) -> Self {
        self.motion.direction = direction;
        self
    }

    pub fn reflect_mode(mut self, mode: ReflectMode) -> Self {
        self.motion.policy.reflect_mode = mode;
        self
    }

    /// Image loaded as the texture on the first frame.
    pub fn texture(mut self, path: impl Into<PathBuf>) -> Self {
        self.texture = Some(path.into());
        self
    }

    /// Custom vertex and fragment shader files.
    pub fn shaders(mut self, vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        self.box_desc.vertex_shader = vertex.into();
        self.box_desc.fragment_shader = fragment.into();
        self
    }

    /// Opens the window and runs until it is closed or the user quits.
    pub fn run(self) -> anyhow::Result<()> {
        let config = RuntimeConfig::default()
            .with_title(self.title.clone())
            .with_size(self.width, self.height);
        let gpu_init = self.gpu_init.clone();
        Runtime::run(config, gpu_init, AppState::new(self))
    }
}

impl Default for Screensaver {
    fn default() -> Self {
        Self::new()
    }
}

// ── AppState ──────────────────────────────────────────────────────────────

/// Everything the running app owns.
struct AppState {
    title: String,
    box_desc: BoxDesc,
    initial_texture: Option<PathBuf>,

    /// Created on the first frame, once a device exists.
    drawable: Option<BoxDrawable>,
    motion: MotionIntegrator,
    modal: ModalController,
    panel: ControlPanel,
    paused: bool,
}

impl AppState {
    fn new(cfg: Screensaver) -> Self {
        Self {
            title: cfg.title,
            panel: ControlPanel::new(cfg.box_desc.color),
            box_desc: cfg.box_desc,
            initial_texture: cfg.texture,
            drawable: None,
            motion: MotionIntegrator::new(cfg.motion),
            modal: ModalController::new(Arc::new(cfg.dialog)),
            paused: false,
        }
    }

    fn init_drawable(&mut self, rctx: &RenderCtx<'_>) {
        let mut drawable = BoxDrawable::new(rctx, self.box_desc.clone());
        if let Some(path) = self.initial_texture.take() {
            let mut target = BoxTarget {
                drawable: &mut drawable,
                ctx: rctx,
            };
            target.apply_texture(&path, self.panel.settings());
        }
        self.drawable = Some(drawable);
    }
}

impl EngineApp for AppState {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.drawable.is_none() {
            self.init_drawable(&ctx.render_ctx());
        }
        let Some(drawable) = self.drawable.as_mut() else {
            return AppControl::Continue;
        };

        let commands = self.panel.read(ctx.input_frame, self.modal.active().is_some());
        if commands.quit {
            log::info!("quit requested");
            return AppControl::Exit;
        }

        // ── modal ─────────────────────────────────────────────────────────
        if let Some(outcome) = self.modal.poll() {
            log::info!("{outcome}");
        }
        if commands.open_texture {
            self.modal.request_change(self.panel.settings());
        }
        if commands.delete_texture {
            self.modal.request_delete();
        }
        if let Some(settings) = self.modal.settings_mut() {
            *settings = self.panel.settings();
        }
        if commands.confirm || commands.cancel {
            let rctx = ctx.render_ctx();
            let mut target = BoxTarget {
                drawable: &mut *drawable,
                ctx: &rctx,
            };
            let outcome = if commands.confirm {
                self.modal.confirm(&mut target)
            } else {
                self.modal.cancel()
            };
            if outcome != ModalOutcome::Ignored {
                log::info!("{outcome}");
            }
        }

        // ── motion ────────────────────────────────────────────────────────
        if commands.toggle_pause {
            self.paused = !self.paused;
            log::info!("motion {}", if self.paused { "paused" } else { "resumed" });
        }
        if !self.paused {
            let outcome = self.motion.step(ctx.time.dt);
            if outcome.any() {
                log::trace!("boundary: {outcome:?}");
            }
        }

        let position = self.motion.position();
        if commands.log_position {
            log::info!("box position: ({:.3}, {:.3})", position.x, position.y);
        }

        if ctx.time.frame_index % TITLE_INTERVAL == 0 || commands != PanelCommands::default() {
            let prompt = self.modal.prompt();
            let line = self
                .panel
                .status_line(&self.title, position, self.paused, prompt.as_deref());
            ctx.runtime.set_title(line);
        }

        // ── draw ──────────────────────────────────────────────────────────
        drawable.set_color(self.panel.color());
        drawable.set_position(position);
        ctx.render(Color::BACKDROP, |rctx, target| drawable.draw(rctx, target))
    }

    fn on_exit(&mut self) {
        if let Some(drawable) = self.drawable.as_mut() {
            drawable.delete_texture();
        }
        log::info!("screensaver stopped");
    }
}

// ── texture target ────────────────────────────────────────────────────────

/// Lets the modals act on the box texture.
///
/// The image is decoded before the old texture is touched, so an unreadable
/// file leaves the box as it was.
struct BoxTarget<'a, 'r> {
    drawable: &'a mut BoxDrawable,
    ctx: &'a RenderCtx<'r>,
}

impl TextureTarget for BoxTarget<'_, '_> {
    fn apply_texture(&mut self, path: &Path, settings: TextureSettings) -> bool {
        let channels = match settings.format {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        };
        let image = match decode_image(path, channels) {
            Ok(image) => image,
            Err(e) => {
                log::error!("{e}");
                return false;
            }
        };

        match self.drawable.replace_texture(self.ctx, &image, settings) {
            Ok(_) => true,
            Err(e) => {
                log::error!("failed to apply {}: {e}", path.display());
                false
            }
        }
    }

    fn delete_texture(&mut self) {
        self.drawable.delete_texture();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use screensaver_engine::device::HeadlessGpu;
    use screensaver_engine::render::image::DecodedImage;

    // ── builder ───────────────────────────────────────────────────────────

    #[test]
    fn builder_collects_settings() {
        let app = Screensaver::new()
            .title("t")
            .size(320.0, 240.0)
            .box_size(0.1)
            .speed(2.0)
            .reflect_mode(ReflectMode::Inward)
            .texture("wall.png");
        assert_eq!(app.title, "t");
        assert_eq!((app.width, app.height), (320.0, 240.0));
        assert_eq!(app.box_desc.size, 0.1);
        assert_eq!(app.motion.base_speed, 2.0);
        assert_eq!(app.motion.policy.reflect_mode, ReflectMode::Inward);
        assert_eq!(app.texture.as_deref(), Some(Path::new("wall.png")));
    }

    #[test]
    fn app_state_starts_idle_at_origin() {
        let state = AppState::new(Screensaver::new().color(Color::new(1.0, 0.0, 0.0, 1.0)));
        assert!(state.drawable.is_none());
        assert_eq!(state.motion.position(), screensaver_engine::glam::Vec3::ZERO);
        assert_eq!(state.modal.active(), None);
        assert_eq!(state.panel.color(), Color::new(1.0, 0.0, 0.0, 1.0));
    }

    // ── texture target (GPU) ──────────────────────────────────────────────

    #[test]
    fn unreadable_file_keeps_current_texture() {
        let Some(gpu) = HeadlessGpu::try_new() else { return };
        let rctx = RenderCtx::new(gpu.device(), gpu.queue(), wgpu_format());
        let mut drawable = BoxDrawable::new(&rctx, BoxDesc::default());
        drawable
            .replace_texture(&rctx, &DecodedImage::solid(2, 2, [9; 4]), TextureSettings::default())
            .unwrap();
        let before = drawable.texture_info().map(|i| i.id);

        let dir = tempfile::tempdir().unwrap();
        let mut target = BoxTarget {
            drawable: &mut drawable,
            ctx: &rctx,
        };
        assert!(!target.apply_texture(&dir.path().join("missing.png"), TextureSettings::default()));
        assert_eq!(drawable.texture_info().map(|i| i.id), before);
    }

    #[test]
    fn delete_goes_through_to_drawable() {
        let Some(gpu) = HeadlessGpu::try_new() else { return };
        let rctx = RenderCtx::new(gpu.device(), gpu.queue(), wgpu_format());
        let mut drawable = BoxDrawable::new(&rctx, BoxDesc::default());
        drawable
            .replace_texture(&rctx, &DecodedImage::solid(1, 1, [0; 4]), TextureSettings::default())
            .unwrap();

        BoxTarget {
            drawable: &mut drawable,
            ctx: &rctx,
        }
        .delete_texture();
        assert!(!drawable.has_texture());
    }

    fn wgpu_format() -> screensaver_engine::render::TextureFormat {
        screensaver_engine::render::TextureFormat::Rgba8UnormSrgb
    }
}
