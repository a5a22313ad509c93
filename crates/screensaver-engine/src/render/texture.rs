//! The box texture: GPU upload, mip chain, sampler settings.

use std::fmt;

use ::image::RgbaImage;
use ::image::imageops::{self, FilterType};

use super::image::DecodedImage;

// ── sampler settings ──────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum WrapMode {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

impl WrapMode {
    pub fn next(self) -> Self {
        match self {
            WrapMode::Repeat => WrapMode::MirroredRepeat,
            WrapMode::MirroredRepeat => WrapMode::ClampToEdge,
            WrapMode::ClampToEdge => WrapMode::Repeat,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WrapMode::Repeat => "repeat",
            WrapMode::MirroredRepeat => "mirrored",
            WrapMode::ClampToEdge => "clamp",
        }
    }

    fn address_mode(self) -> wgpu::AddressMode {
        match self {
            WrapMode::Repeat => wgpu::AddressMode::Repeat,
            WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
            WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        }
    }
}

/// Minification filter. The `*Mipmap*` variants sample the mip chain; the
/// plain ones only read the base level.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    #[default]
    LinearMipmapLinear,
}

impl MinFilter {
    pub fn next(self) -> Self {
        match self {
            MinFilter::Nearest => MinFilter::Linear,
            MinFilter::Linear => MinFilter::NearestMipmapNearest,
            MinFilter::NearestMipmapNearest => MinFilter::LinearMipmapNearest,
            MinFilter::LinearMipmapNearest => MinFilter::NearestMipmapLinear,
            MinFilter::NearestMipmapLinear => MinFilter::LinearMipmapLinear,
            MinFilter::LinearMipmapLinear => MinFilter::Nearest,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MinFilter::Nearest => "nearest",
            MinFilter::Linear => "linear",
            MinFilter::NearestMipmapNearest => "nearest/mip-nearest",
            MinFilter::LinearMipmapNearest => "linear/mip-nearest",
            MinFilter::NearestMipmapLinear => "nearest/mip-linear",
            MinFilter::LinearMipmapLinear => "linear/mip-linear",
        }
    }

    pub fn uses_mipmaps(self) -> bool {
        !matches!(self, MinFilter::Nearest | MinFilter::Linear)
    }

    /// Texel filter and mip filter.
    fn filters(self) -> (wgpu::FilterMode, wgpu::MipmapFilterMode) {
        use wgpu::{FilterMode as F, MipmapFilterMode as M};

        match self {
            MinFilter::Nearest | MinFilter::NearestMipmapNearest => (F::Nearest, M::Nearest),
            MinFilter::Linear | MinFilter::LinearMipmapNearest => (F::Linear, M::Nearest),
            MinFilter::NearestMipmapLinear => (F::Nearest, M::Linear),
            MinFilter::LinearMipmapLinear => (F::Linear, M::Linear),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum MagFilter {
    Nearest,
    #[default]
    Linear,
}

impl MagFilter {
    pub fn next(self) -> Self {
        match self {
            MagFilter::Nearest => MagFilter::Linear,
            MagFilter::Linear => MagFilter::Nearest,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MagFilter::Nearest => "nearest",
            MagFilter::Linear => "linear",
        }
    }

    fn filter(self) -> wgpu::FilterMode {
        match self {
            MagFilter::Nearest => wgpu::FilterMode::Nearest,
            MagFilter::Linear => wgpu::FilterMode::Linear,
        }
    }
}

/// How source pixels are interpreted on upload.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum PixelFormat {
    /// Alpha is ignored; the texture is opaque.
    Rgb,
    #[default]
    Rgba,
}

impl PixelFormat {
    pub fn next(self) -> Self {
        match self {
            PixelFormat::Rgb => PixelFormat::Rgba,
            PixelFormat::Rgba => PixelFormat::Rgb,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PixelFormat::Rgb => "RGB",
            PixelFormat::Rgba => "RGBA",
        }
    }
}

/// Sampler and upload choices for one texture.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct TextureSettings {
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    pub format: PixelFormat,
}

impl fmt::Display for TextureSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wrap {}/{} min {} mag {} {}",
            self.wrap_s.label(),
            self.wrap_t.label(),
            self.min_filter.label(),
            self.mag_filter.label(),
            self.format.label()
        )
    }
}

// ── texture resource ──────────────────────────────────────────────────────

/// Identifies one uploaded texture. Never reused within a resource.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TextureId(u64);

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Description of the live texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureInfo {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub mip_levels: u32,
    pub settings: TextureSettings,
}

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("image has no pixel data")]
    EmptyImage,

    #[error("pixel buffer holds {actual} bytes, {width}x{height} RGBA needs {expected}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("{width}x{height} exceeds the device limit of {max} texels per side")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error("no shader program to bind the texture against")]
    NoProgram,
}

struct GpuTexture {
    info: TextureInfo,
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// At most one GPU texture with its sampler and bind group.
#[derive(Default)]
pub struct TextureResource {
    current: Option<GpuTexture>,
    next_id: u64,
}

impl TextureResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_texture(&self) -> bool {
        self.current.is_some()
    }

    pub fn info(&self) -> Option<TextureInfo> {
        self.current.as_ref().map(|t| t.info)
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.current.as_ref().map(|t| &t.bind_group)
    }

    /// Uploads `image` and builds its sampler and bind group.
    ///
    /// A rejected image leaves the current texture untouched. A texture that
    /// is already live is released once the new one is in place.
    pub fn create(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        image: &DecodedImage,
        settings: TextureSettings,
    ) -> Result<TextureId, TextureError> {
        if let Err(e) = validate(image, device.limits().max_texture_dimension_2d) {
            log::error!("texture rejected: {e}");
            return Err(e);
        }

        let id = TextureId(self.next_id);
        self.next_id += 1;

        let levels = mip_chain(image, settings.format);
        let mip_levels = levels.len() as u32;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("screensaver box texture"),
            size: wgpu::Extent3d {
                width: image.width,
                height: image.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: mip_levels,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level, pixels) in levels.iter().enumerate() {
            write_level(queue, &texture, level as u32, pixels);
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_sampler(device, settings);
        let bind_group = create_bind_group(device, layout, &view, &sampler);

        let info = TextureInfo {
            id,
            width: image.width,
            height: image.height,
            channels: image.channels,
            mip_levels,
            settings,
        };

        if let Some(old) = self.current.replace(GpuTexture {
            info,
            texture,
            bind_group,
        }) {
            log::debug!("texture {} superseded by {id}", old.info.id);
            old.texture.destroy();
        }

        log::info!(
            "texture {id} created ({}x{}, {mip_levels} mip levels, {settings})",
            image.width,
            image.height
        );
        Ok(id)
    }

    /// Deletes the current texture, then creates a new one.
    ///
    /// If creation fails the resource is left without a texture.
    pub fn replace(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        image: &DecodedImage,
        settings: TextureSettings,
    ) -> Result<TextureId, TextureError> {
        self.delete();
        self.create(device, queue, layout, image, settings)
    }

    /// Releases the GPU texture. Returns the id that was released.
    pub fn delete(&mut self) -> Option<TextureId> {
        let old = self.current.take()?;
        old.texture.destroy();
        log::debug!("texture {} released", old.info.id);
        Some(old.info.id)
    }
}

/// A 1x1 opaque white texture for draws without a texture.
///
/// The pipeline layout always has a texture slot, so something must be bound.
pub fn create_fallback_bind_group(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::BindGroup {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("screensaver fallback texture"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let white = RgbaImage::from_pixel(1, 1, ::image::Rgba([255; 4]));
    write_level(queue, &texture, 0, &white);

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = create_sampler(device, TextureSettings::default());
    create_bind_group(device, layout, &view, &sampler)
}

// ── helpers ───────────────────────────────────────────────────────────────

fn validate(image: &DecodedImage, max_dimension: u32) -> Result<(), TextureError> {
    if image.is_empty() {
        return Err(TextureError::EmptyImage);
    }
    let expected = DecodedImage::rgba_len(image.width, image.height);
    if image.pixels.len() != expected {
        return Err(TextureError::SizeMismatch {
            width: image.width,
            height: image.height,
            expected,
            actual: image.pixels.len(),
        });
    }
    if image.width > max_dimension || image.height > max_dimension {
        return Err(TextureError::TooLarge {
            width: image.width,
            height: image.height,
            max: max_dimension,
        });
    }
    Ok(())
}

/// Number of levels in a full mip chain down to 1x1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Base level plus every downsampled level.
///
/// Expects a validated image.
fn mip_chain(image: &DecodedImage, format: PixelFormat) -> Vec<RgbaImage> {
    let mut pixels = image.pixels.clone();
    if format == PixelFormat::Rgb {
        for texel in pixels.chunks_exact_mut(4) {
            texel[3] = u8::MAX;
        }
    }

    let Some(base) = RgbaImage::from_raw(image.width, image.height, pixels) else {
        return Vec::new();
    };

    let count = mip_level_count(image.width, image.height);
    let mut levels = Vec::with_capacity(count as usize);
    levels.push(base);
    for _ in 1..count {
        let Some(prev) = levels.last() else { break };
        let w = (prev.width() / 2).max(1);
        let h = (prev.height() / 2).max(1);
        let next = imageops::resize(prev, w, h, FilterType::Triangle);
        levels.push(next);
    }
    levels
}

fn write_level(queue: &wgpu::Queue, texture: &wgpu::Texture, level: u32, pixels: &RgbaImage) {
    let (width, height) = pixels.dimensions();
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: level,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

fn create_sampler(device: &wgpu::Device, settings: TextureSettings) -> wgpu::Sampler {
    let (min_filter, mipmap_filter) = settings.min_filter.filters();
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("screensaver box sampler"),
        address_mode_u: settings.wrap_s.address_mode(),
        address_mode_v: settings.wrap_t.address_mode(),
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: settings.mag_filter.filter(),
        min_filter,
        mipmap_filter,
        // non-mipmapped filters read the base level only
        lod_max_clamp: if settings.min_filter.uses_mipmaps() { 32.0 } else { 0.0 },
        ..Default::default()
    })
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("screensaver box texture bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessGpu;
    use crate::render::shader::ShaderProgram;

    // ── settings ──────────────────────────────────────────────────────────

    #[test]
    fn wrap_mode_cycles_through_all() {
        let mut m = WrapMode::default();
        let mut seen = vec![m];
        for _ in 0..2 {
            m = m.next();
            seen.push(m);
        }
        assert_eq!(seen, [WrapMode::Repeat, WrapMode::MirroredRepeat, WrapMode::ClampToEdge]);
        assert_eq!(m.next(), WrapMode::Repeat);
    }

    #[test]
    fn min_filter_cycle_has_six_steps() {
        let start = MinFilter::default();
        let mut m = start.next();
        let mut steps = 1;
        while m != start {
            m = m.next();
            steps += 1;
        }
        assert_eq!(steps, 6);
    }

    #[test]
    fn min_filter_maps_to_wgpu_pairs() {
        assert_eq!(
            MinFilter::NearestMipmapLinear.filters(),
            (wgpu::FilterMode::Nearest, wgpu::MipmapFilterMode::Linear)
        );
        assert_eq!(
            MinFilter::LinearMipmapNearest.filters(),
            (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Nearest)
        );
        assert!(!MinFilter::Linear.uses_mipmaps());
        assert!(MinFilter::NearestMipmapNearest.uses_mipmaps());
    }

    #[test]
    fn settings_display_lists_every_choice() {
        let s = TextureSettings {
            wrap_s: WrapMode::ClampToEdge,
            format: PixelFormat::Rgb,
            ..Default::default()
        };
        assert_eq!(s.to_string(), "wrap clamp/repeat min linear/mip-linear mag linear RGB");
    }

    // ── validation / mips ─────────────────────────────────────────────────

    #[test]
    fn empty_image_is_rejected() {
        let img = DecodedImage::from_rgba(0, 0, Vec::new());
        assert!(matches!(validate(&img, 8192), Err(TextureError::EmptyImage)));
    }

    #[test]
    fn short_buffer_is_rejected() {
        let img = DecodedImage::from_rgba(2, 2, vec![0; 12]);
        assert!(matches!(
            validate(&img, 8192),
            Err(TextureError::SizeMismatch { expected: 16, actual: 12, .. })
        ));
    }

    #[test]
    fn oversized_image_is_rejected() {
        let img = DecodedImage::solid(4, 1, [0; 4]);
        assert!(matches!(validate(&img, 2), Err(TextureError::TooLarge { max: 2, .. })));
    }

    #[test]
    fn mip_count_reaches_one_texel() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(300, 20), 9);
    }

    #[test]
    fn mip_chain_halves_each_level() {
        let img = DecodedImage::solid(8, 2, [10, 20, 30, 40]);
        let levels = mip_chain(&img, PixelFormat::Rgba);
        let dims: Vec<(u32, u32)> = levels.iter().map(|l| l.dimensions()).collect();
        assert_eq!(dims, [(8, 2), (4, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn rgb_format_forces_opaque_alpha() {
        let img = DecodedImage::solid(2, 2, [10, 20, 30, 40]);
        let levels = mip_chain(&img, PixelFormat::Rgb);
        assert!(levels[0].pixels().all(|p| p.0[3] == 255));
        let kept = mip_chain(&img, PixelFormat::Rgba);
        assert!(kept[0].pixels().all(|p| p.0[3] == 40));
    }

    // ── resource (GPU) ────────────────────────────────────────────────────

    fn gpu_with_layout() -> Option<(HeadlessGpu, ShaderProgram)> {
        let gpu = HeadlessGpu::try_new()?;
        let mut program = ShaderProgram::new();
        program
            .compile(
                gpu.device(),
                wgpu::TextureFormat::Rgba8UnormSrgb,
                &crate::render::buffers::QuadVertex::layout(),
                std::path::Path::new(crate::render::shader::BOX_VERTEX_SHADER),
                std::path::Path::new(crate::render::shader::BOX_FRAGMENT_SHADER),
            )
            .ok()?;
        Some((gpu, program))
    }

    #[test]
    fn create_replace_delete_lifecycle() {
        let Some((gpu, program)) = gpu_with_layout() else { return };
        let Some(layout) = program.texture_layout() else { return };
        let (device, queue) = (gpu.device(), gpu.queue());
        let img = DecodedImage::solid(4, 4, [255, 0, 0, 255]);

        let mut tex = TextureResource::new();
        assert!(!tex.has_texture());

        let first = tex.create(device, queue, layout, &img, TextureSettings::default()).unwrap();
        assert!(tex.has_texture());
        assert_eq!(tex.info().map(|i| i.mip_levels), Some(3));

        let second = tex.replace(device, queue, layout, &img, TextureSettings::default()).unwrap();
        assert_ne!(first, second);
        assert_eq!(tex.info().map(|i| i.id), Some(second));

        assert_eq!(tex.delete(), Some(second));
        assert!(!tex.has_texture());
        assert_eq!(tex.delete(), None);
    }

    #[test]
    fn rejected_create_keeps_current_texture() {
        let Some((gpu, program)) = gpu_with_layout() else { return };
        let Some(layout) = program.texture_layout() else { return };
        let (device, queue) = (gpu.device(), gpu.queue());

        let mut tex = TextureResource::new();
        let id = tex
            .create(device, queue, layout, &DecodedImage::solid(2, 2, [0; 4]), Default::default())
            .unwrap();

        let empty = DecodedImage::from_rgba(0, 0, Vec::new());
        assert!(tex.create(device, queue, layout, &empty, Default::default()).is_err());
        assert_eq!(tex.info().map(|i| i.id), Some(id));
    }

    #[test]
    fn failed_replace_leaves_no_texture() {
        let Some((gpu, program)) = gpu_with_layout() else { return };
        let Some(layout) = program.texture_layout() else { return };
        let (device, queue) = (gpu.device(), gpu.queue());

        let mut tex = TextureResource::new();
        tex.create(device, queue, layout, &DecodedImage::solid(2, 2, [0; 4]), Default::default())
            .unwrap();

        let empty = DecodedImage::from_rgba(0, 0, Vec::new());
        assert!(tex.replace(device, queue, layout, &empty, Default::default()).is_err());
        assert!(!tex.has_texture());
    }
}
