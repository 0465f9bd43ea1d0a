pub mod cache;
pub mod decode;

use std::sync::Arc;

use crate::foundation::error::{SynthError, SynthResult};

/// Token issued by the image cache for every decode.
///
/// Two decodes of identical bytes get different handles; a cache clear bumps the generation so
/// handles from an earlier rebuild never alias entries of the current one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageHandle {
    pub generation: u32,
    pub serial: u64,
}

#[derive(Clone, Debug)]
pub struct SourceImage {
    pub handle: ImageHandle,
    pub image: Arc<image::DynamicImage>,
}

impl SourceImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, rgba8: Vec<u8>) -> SynthResult<Self> {
        let expected = rgba_len(width, height)?;
        if rgba8.len() != expected {
            return Err(SynthError::validation(format!(
                "pixel buffer of {width}x{height} needs {expected} bytes, got {}",
                rgba8.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8,
        })
    }

    pub fn view(&self) -> PixelView<'_> {
        PixelView {
            width: self.width,
            height: self.height,
            rgba8: &self.rgba8,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.view().pixel(x, y)
    }

    pub fn into_image(self) -> SynthResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.rgba8)
            .ok_or_else(|| SynthError::validation("pixel buffer does not match its dimensions"))
    }
}

/// Borrowed straight-alpha RGBA8 pixels. The default view is empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct PixelView<'a> {
    width: u32,
    height: u32,
    rgba8: &'a [u8],
}

impl<'a> PixelView<'a> {
    pub fn new(width: u32, height: u32, rgba8: &'a [u8]) -> SynthResult<Self> {
        let expected = rgba_len(width, height)?;
        if rgba8.len() != expected {
            return Err(SynthError::validation(format!(
                "pixel view of {width}x{height} needs {expected} bytes, got {}",
                rgba8.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.rgba8
    }

    /// Pixel at `(x, y)`; out-of-range coordinates read as transparent black.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width {
            return [0; 4];
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        match self.rgba8.get(idx..idx + 4) {
            Some(p) => [p[0], p[1], p[2], p[3]],
            None => [0; 4],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

fn rgba_len(width: u32, height: u32) -> SynthResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| SynthError::validation("pixel buffer size overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_rejects_short_pixel_data() {
        assert!(PixelView::new(4, 4, &[0; 4]).is_err());
        assert!(PixelView::new(1, 1, &[1, 2, 3, 4]).is_ok());
    }

    #[test]
    fn pixel_reads_outside_the_data_are_transparent() {
        let short = PixelBuffer {
            width: 4,
            height: 4,
            rgba8: vec![9; 4],
        };
        assert_eq!(short.pixel(0, 0), [9, 9, 9, 9]);
        assert_eq!(short.pixel(3, 3), [0; 4]);
        assert_eq!(short.pixel(7, 0), [0; 4]);

        let out = crate::composite::composite(
            short.view(),
            short.view(),
            PixelView::default(),
            PixelView::default(),
            crate::composite::BlendMode::AlphaOver,
        );
        assert_eq!((out.width, out.height), (4, 4));
        assert_eq!(out.pixel(3, 3), [0; 4]);
    }
}
