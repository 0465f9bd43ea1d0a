use std::io::Cursor;
use std::sync::{Arc, OnceLock};

use anyhow::Context;

use crate::{
    assets::PixelBuffer,
    foundation::core::AssetLocation,
    foundation::error::{SynthError, SynthResult},
};

pub const MISSING_TEXTURE_SIZE: u32 = 16;

pub fn decode_image(bytes: &[u8]) -> SynthResult<image::DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| SynthError::decode(e.to_string()))
}

/// Pack-relative path of the PNG backing a texture location: `textures/<ns>/<path>.png`.
pub fn texture_resource_path(location: &AssetLocation) -> String {
    format!("textures/{}/{}.png", location.namespace, location.path)
}

pub fn extract_rgba8(image: &image::DynamicImage) -> Vec<u8> {
    image.to_rgba8().into_raw()
}

/// Magenta/black checkerboard standing in for textures that failed to decode.
///
/// The same `Arc` is returned on every call so downstream code never allocates per miss.
pub fn missing_texture() -> Arc<image::DynamicImage> {
    static MISSING: OnceLock<Arc<image::DynamicImage>> = OnceLock::new();
    MISSING
        .get_or_init(|| {
            let half = MISSING_TEXTURE_SIZE / 2;
            let img = image::RgbaImage::from_fn(MISSING_TEXTURE_SIZE, MISSING_TEXTURE_SIZE, |x, y| {
                if (x < half) == (y < half) {
                    image::Rgba([248, 0, 248, 255])
                } else {
                    image::Rgba([0, 0, 0, 255])
                }
            });
            Arc::new(image::DynamicImage::ImageRgba8(img))
        })
        .clone()
}

pub fn encode_png(buffer: &PixelBuffer) -> SynthResult<Vec<u8>> {
    let img = buffer.clone().into_image()?;
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(img: image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decode_png_keeps_straight_alpha() {
        let img = image::RgbaImage::from_raw(1, 1, vec![100u8, 50u8, 200u8, 128u8]).unwrap();
        let decoded = decode_image(&png_bytes(img)).unwrap();
        assert_eq!(decoded.width(), 1);
        assert_eq!(extract_rgba8(&decoded), vec![100, 50, 200, 128]);
    }

    #[test]
    fn decode_garbage_is_decode_error() {
        let err = decode_image(b"not a png").unwrap_err();
        assert!(matches!(err, SynthError::Decode(_)));
    }

    #[test]
    fn missing_texture_is_shared_checkerboard() {
        let a = missing_texture();
        let b = missing_texture();
        assert!(Arc::ptr_eq(&a, &b));
        let rgba = a.to_rgba8();
        assert_eq!(rgba.dimensions(), (16, 16));
        assert_eq!(rgba.get_pixel(0, 0).0, [248, 0, 248, 255]);
        assert_eq!(rgba.get_pixel(15, 0).0, [0, 0, 0, 255]);
        assert_eq!(rgba.get_pixel(15, 15).0, [248, 0, 248, 255]);
    }

    #[test]
    fn texture_path_layout() {
        let loc = AssetLocation::parse("chisel:blocks/marble/raw").unwrap();
        assert_eq!(texture_resource_path(&loc), "textures/chisel/blocks/marble/raw.png");
    }

    #[test]
    fn png_encode_then_decode_preserves_pixels() {
        let buffer = PixelBuffer::new(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let decoded = decode_image(&encode_png(&buffer).unwrap()).unwrap();
        assert_eq!(extract_rgba8(&decoded), buffer.rgba8);
    }
}
