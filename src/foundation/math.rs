pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Rec. 601 luma of a straight-alpha RGB triple, in `0..=255`.
pub(crate) fn luma_u8(rgb: [u8; 3]) -> u8 {
    let l = 299 * u32::from(rgb[0]) + 587 * u32::from(rgb[1]) + 114 * u32::from(rgb[2]);
    ((l + 500) / 1000) as u8
}

/// Scale `c` by `num / den` and saturate to `u8`. `den == 0` yields `c` unchanged.
pub(crate) fn scale_sat_u8(c: u8, num: u32, den: u32) -> u8 {
    if den == 0 {
        return c;
    }
    let v = (u32::from(c) * num + den / 2) / den;
    v.min(255) as u8
}

/// Map a destination coordinate onto a source axis of a different length (nearest neighbour).
pub(crate) fn nearest_index(dst: u32, dst_len: u32, src_len: u32) -> u32 {
    if dst_len == 0 || src_len == 0 {
        return 0;
    }
    let v = (u64::from(dst) * u64::from(src_len)) / u64::from(dst_len);
    (v as u32).min(src_len - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div255_identity_and_zero() {
        assert_eq!(mul_div255_u8(200, 255), 200);
        assert_eq!(mul_div255_u8(200, 0), 0);
        assert_eq!(mul_div255_u8(255, 128), 128);
    }

    #[test]
    fn luma_extremes() {
        assert_eq!(luma_u8([0, 0, 0]), 0);
        assert_eq!(luma_u8([255, 255, 255]), 255);
        assert!(luma_u8([0, 255, 0]) > luma_u8([255, 0, 0]));
    }

    #[test]
    fn scale_saturates() {
        assert_eq!(scale_sat_u8(200, 2, 1), 255);
        assert_eq!(scale_sat_u8(100, 1, 2), 50);
        assert_eq!(scale_sat_u8(42, 9, 0), 42);
    }

    #[test]
    fn nearest_index_scales_both_ways() {
        assert_eq!(nearest_index(15, 16, 16), 15);
        assert_eq!(nearest_index(15, 16, 8), 7);
        assert_eq!(nearest_index(3, 4, 16), 12);
        assert_eq!(nearest_index(0, 16, 1), 0);
    }
}
