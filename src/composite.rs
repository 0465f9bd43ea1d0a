//! Per-pixel blending of a through-slot image with the `from`, overlay and based-upon images.
//!
//! Every mode keeps the *shape* of the target: output alpha equals target alpha exactly, and a
//! fully transparent target pixel is emitted as `[0, 0, 0, 0]`. Color comes from the other three
//! sources. Sources are sampled nearest-neighbour onto the target grid, so they may have any size.

use crate::{
    assets::{PixelBuffer, PixelView},
    foundation::math::{luma_u8, mul_div255_u8, nearest_index, scale_sat_u8},
};

type PremulRgba8 = [u8; 4];

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Target luma relative to the based-upon mean luma, applied to the mean color of `from`.
    #[default]
    LuminanceTransfer,
    /// [`BlendMode::LuminanceTransfer`], then multiplied by the overlay color where the overlay
    /// is opaque.
    MultiplyMask,
    /// `from` pixels scaled by the target's relative luma, with the overlay composited on top.
    AlphaOver,
}

impl BlendMode {
    pub fn from_index(i: u8) -> Option<Self> {
        match i {
            0 => Some(Self::LuminanceTransfer),
            1 => Some(Self::MultiplyMask),
            2 => Some(Self::AlphaOver),
            _ => None,
        }
    }
}

/// Blend `from`, `overlay` and `based_upon` into a new buffer shaped like `target`.
///
/// Pure and O(W·H) in the target size (plus one pass over `from` and `based_upon` for their means).
pub fn composite(
    target: PixelView<'_>,
    from: PixelView<'_>,
    overlay: PixelView<'_>,
    based_upon: PixelView<'_>,
    mode: BlendMode,
) -> PixelBuffer {
    let (w, h) = (target.width(), target.height());
    let mut out = vec![0u8; (w as usize) * (h as usize) * 4];

    let palette = mean_rgb(from);
    let base_luma = u32::from(mean_luma(based_upon));

    for y in 0..h {
        for x in 0..w {
            let t = target.pixel(x, y);
            let idx = ((y as usize) * (w as usize) + (x as usize)) * 4;
            if t[3] == 0 {
                continue;
            }
            let t_luma = u32::from(luma_u8([t[0], t[1], t[2]]));

            let rgb = match mode {
                BlendMode::LuminanceTransfer => relight(palette, t_luma, base_luma),
                BlendMode::MultiplyMask => {
                    let lit = relight(palette, t_luma, base_luma);
                    multiply_masked(lit, sample(overlay, x, y, w, h))
                }
                BlendMode::AlphaOver => {
                    let f = sample(from, x, y, w, h);
                    let lit = relight([f[0], f[1], f[2]], t_luma, base_luma);
                    let o = premultiply(sample(overlay, x, y, w, h));
                    overlay_onto(lit, o)
                }
            };

            out[idx..idx + 3].copy_from_slice(&rgb);
            out[idx + 3] = t[3];
        }
    }

    PixelBuffer {
        width: w,
        height: h,
        rgba8: out,
    }
}

/// Premultiplied `overlay` on top of an opaque `base` color.
fn overlay_onto(base: [u8; 3], overlay: PremulRgba8) -> [u8; 3] {
    let inv = 255 - u16::from(overlay[3]);
    let mut out = [0u8; 3];
    for i in 0..3 {
        out[i] = add_sat_u8(overlay[i], mul_div255_u8(u16::from(base[i]), inv));
    }
    out
}

fn relight(rgb: [u8; 3], luma: u32, base_luma: u32) -> [u8; 3] {
    [
        scale_sat_u8(rgb[0], luma, base_luma),
        scale_sat_u8(rgb[1], luma, base_luma),
        scale_sat_u8(rgb[2], luma, base_luma),
    ]
}

fn multiply_masked(rgb: [u8; 3], mask: [u8; 4]) -> [u8; 3] {
    let a = u16::from(mask[3]);
    if a == 0 {
        return rgb;
    }
    let inv = 255 - a;
    let mut out = [0u8; 3];
    for i in 0..3 {
        let mul = mul_div255_u8(u16::from(rgb[i]), u16::from(mask[i]));
        out[i] = add_sat_u8(
            mul_div255_u8(u16::from(mul), a),
            mul_div255_u8(u16::from(rgb[i]), inv),
        );
    }
    out
}

fn premultiply(px: [u8; 4]) -> PremulRgba8 {
    let a = u16::from(px[3]);
    [
        mul_div255_u8(u16::from(px[0]), a),
        mul_div255_u8(u16::from(px[1]), a),
        mul_div255_u8(u16::from(px[2]), a),
        px[3],
    ]
}

fn sample(src: PixelView<'_>, x: u32, y: u32, w: u32, h: u32) -> [u8; 4] {
    if src.is_empty() {
        return [0, 0, 0, 0];
    }
    src.pixel(
        nearest_index(x, w, src.width()),
        nearest_index(y, h, src.height()),
    )
}

/// Mean color of the non-transparent pixels (all pixels if none are opaque, white if empty).
fn mean_rgb(src: PixelView<'_>) -> [u8; 3] {
    let mut acc = [0u64; 3];
    let mut n = 0u64;
    let mut all = [0u64; 3];
    let mut total = 0u64;
    for px in src.as_bytes().chunks_exact(4) {
        for i in 0..3 {
            all[i] += u64::from(px[i]);
        }
        total += 1;
        if px[3] > 0 {
            for i in 0..3 {
                acc[i] += u64::from(px[i]);
            }
            n += 1;
        }
    }
    let (acc, n) = if n > 0 { (acc, n) } else { (all, total) };
    if n == 0 {
        return [255, 255, 255];
    }
    [
        ((acc[0] + n / 2) / n) as u8,
        ((acc[1] + n / 2) / n) as u8,
        ((acc[2] + n / 2) / n) as u8,
    ]
}

fn mean_luma(src: PixelView<'_>) -> u8 {
    luma_u8(mean_rgb(src))
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}
