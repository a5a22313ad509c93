//! Image decoding for box textures.

use std::path::{Path, PathBuf};

use ::image::DynamicImage;

/// Decoded pixels, ready for upload.
///
/// `pixels` is always tightly packed RGBA8 with the bottom row first, so
/// texture coordinate `(0, 0)` addresses the bottom-left of the picture.
/// `channels` records how many channels the data carried after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl DecodedImage {
    /// Wraps already-decoded RGBA8 pixels.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            pixels,
            width,
            height,
            channels: 4,
        }
    }

    /// A single-color image.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba.repeat(width as usize * height as usize);
        Self::from_rgba(width, height, pixels)
    }

    /// Byte length of tightly packed RGBA8 pixels at `width` x `height`.
    pub fn rgba_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    #[error("{} decoded to an empty image", .path.display())]
    Empty { path: PathBuf },

    #[error("unsupported channel count {0} (expected 0..=4)")]
    Channels(u8),
}

/// Loads and decodes the image at `path`.
///
/// `desired_channels` of 0 keeps the source channel count; 1..=4 converts
/// (grey, grey+alpha, RGB, RGBA) before expanding to RGBA8. Missing channels
/// expand the usual way: grey replicates, alpha is opaque.
pub fn decode_image(path: &Path, desired_channels: u8) -> Result<DecodedImage, ImageError> {
    if desired_channels > 4 {
        return Err(ImageError::Channels(desired_channels));
    }

    let img = ::image::open(path).map_err(|source| ImageError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let channels = match desired_channels {
        0 => img.color().channel_count(),
        n => n,
    };

    let mut rgba = match channels {
        1 => DynamicImage::ImageLuma8(img.to_luma8()).to_rgba8(),
        2 => DynamicImage::ImageLumaA8(img.to_luma_alpha8()).to_rgba8(),
        3 => DynamicImage::ImageRgb8(img.to_rgb8()).to_rgba8(),
        _ => img.to_rgba8(),
    };

    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageError::Empty {
            path: path.to_path_buf(),
        });
    }

    ::image::imageops::flip_vertical_in_place(&mut rgba);
    log::debug!("decoded {} ({width}x{height}, {channels} channels)", path.display());

    Ok(DecodedImage {
        pixels: rgba.into_raw(),
        width,
        height,
        channels,
    })
}
