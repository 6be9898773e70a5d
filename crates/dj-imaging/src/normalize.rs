// crates/dj-imaging/src/normalize.rs

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageError, Rgba, RgbaImage};
use log::debug;
use thiserror::Error;

pub const JPEG_QUALITY: u8 = 90;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to decode source image: {0}")]
    Decode(#[source] ImageError),

    #[error("failed to encode JPEG: {0}")]
    Encode(#[source] ImageError),

    #[error("source image has no pixels")]
    EmptySource,

    #[error("target size must be non-zero, got {0}x{1}")]
    EmptyTarget(u32, u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn square(side: u32) -> Self {
        Self::new(side, side)
    }
}

/// Decodes `source`, fits it to `target` with [`cover`] and re-encodes it
/// as a JPEG at [`JPEG_QUALITY`].
pub fn normalize(source: &[u8], target: TargetSize) -> Result<Vec<u8>> {
    if target.width == 0 || target.height == 0 {
        return Err(Error::EmptyTarget(target.width, target.height));
    }

    let img = image::load_from_memory(source).map_err(Error::Decode)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(Error::EmptySource);
    }

    debug!(
        "Normalizing {}x{} image to {}x{}",
        img.width(), img.height(), target.width, target.height
    );

    let canvas = cover(&img, target);
    encode_jpeg(canvas)
}

/// Scales `img` uniformly so it covers the whole target box, centers it
/// on a white canvas and crops whatever falls outside.
///
/// The crop is taken in source pixels before resizing, so the only buffer
/// ever allocated at target scale is the target itself.
pub fn cover(img: &DynamicImage, target: TargetSize) -> RgbaImage {
    let (src_w, src_h) = img.dimensions();
    let (x, y, crop_w, crop_h) = crop_window(src_w, src_h, target);

    let scaled = img
        .crop_imm(x, y, crop_w, crop_h)
        .resize_exact(target.width, target.height, FilterType::CatmullRom)
        .to_rgba8();

    let mut canvas = RgbaImage::from_pixel(target.width, target.height, BACKGROUND);
    imageops::overlay(&mut canvas, &scaled, 0, 0);

    canvas
}

/// Centered region of the source, in source pixels, that covers `target`
/// once scaled. Never empty and never larger than the source.
fn crop_window(src_w: u32, src_h: u32, target: TargetSize) -> (u32, u32, u32, u32) {
    let scale = f64::max(
        target.width as f64 / src_w as f64,
        target.height as f64 / src_h as f64,
    );

    let crop_w = ((target.width as f64 / scale).round() as u32).clamp(1, src_w);
    let crop_h = ((target.height as f64 / scale).round() as u32).clamp(1, src_h);

    ((src_w - crop_w) / 2, (src_h - crop_h) / 2, crop_w, crop_h)
}

fn encode_jpeg(canvas: RgbaImage) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(Error::Encode)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use image::{ImageFormat, Rgb, RgbImage};

    fn png(width: u32, height: u32, pixel: impl Fn(u32, u32) -> Rgba<u8>) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, pixel);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        png(width, height, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255]))
    }

    #[test]
    fn test_output_is_jpeg_of_target_size() {
        for (w, h) in [(300, 150), (150, 300), (64, 64), (7, 1000)] {
            let out = normalize(&gradient(w, h), TargetSize::square(128)).unwrap();
            assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
            let decoded = image::load_from_memory(&out).unwrap();
            assert_eq!(decoded.dimensions(), (128, 128), "source {w}x{h}");
        }
    }

    #[test]
    fn test_non_square_target() {
        let out = normalize(&gradient(100, 100), TargetSize::new(96, 48)).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (96, 48));
    }

    #[test]
    fn test_deterministic() {
        let source = gradient(320, 200);
        let a = normalize(&source, TargetSize::square(64)).unwrap();
        let b = normalize(&source, TargetSize::square(64)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cover_crops_center() {
        // Left third red, middle third green, right third blue.
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(300, 100, |x, _| match x {
            0..100 => Rgb([255, 0, 0]),
            100..200 => Rgb([0, 255, 0]),
            _ => Rgb([0, 0, 255]),
        }));
        let canvas = cover(&img, TargetSize::square(100));
        assert_eq!(canvas.dimensions(), (100, 100));
        assert_eq!(canvas.get_pixel(50, 50), &Rgba([0, 255, 0, 255]));
        assert_eq!(canvas.get_pixel(2, 2), &Rgba([0, 255, 0, 255]));
        assert_eq!(canvas.get_pixel(97, 97), &Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_transparency_lands_on_white() {
        let source = png(20, 20, |_, _| Rgba([0, 0, 0, 0]));
        let canvas = cover(&image::load_from_memory(&source).unwrap(), TargetSize::square(10));
        assert!(canvas.pixels().all(|p| p.0[0] == 255 && p.0[1] == 255 && p.0[2] == 255));
    }

    #[test]
    fn test_extreme_aspect_ratios() {
        for (w, h) in [(1, 4000), (4000, 1)] {
            let source = png(w, h, |_, _| Rgba([90, 90, 90, 255]));
            let out = normalize(&source, TargetSize::square(1024)).unwrap();
            let decoded = image::load_from_memory(&out).unwrap();
            assert_eq!(decoded.dimensions(), (1024, 1024), "source {w}x{h}");
        }
    }

    #[test]
    fn test_crop_window_stays_in_source() {
        assert_eq!(crop_window(1, 4000, TargetSize::square(1024)), (0, 1999, 1, 1));
        assert_eq!(crop_window(4000, 1, TargetSize::square(1024)), (1999, 0, 1, 1));
        assert_eq!(crop_window(300, 100, TargetSize::square(100)), (100, 0, 100, 100));
        assert_eq!(crop_window(2048, 1024, TargetSize::square(1024)), (512, 0, 1024, 1024));
        assert_eq!(crop_window(64, 64, TargetSize::new(128, 64)), (0, 16, 64, 32));
    }

    #[test]
    fn test_undecodable_source() {
        let err = normalize(b"definitely not an image", TargetSize::square(64)).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_zero_target() {
        let err = normalize(&gradient(10, 10), TargetSize::new(0, 10)).unwrap_err();
        assert!(matches!(err, Error::EmptyTarget(0, 10)));
    }
}
