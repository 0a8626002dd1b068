use nalgebra::{Vector3, Vector4};
use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::{thread_rng, Rng};
use std::ops::RangeBounds;

pub fn random_vec<T: SampleUniform, R: RangeBounds<T> + SampleRange<T> + Clone>(
    range: R,
) -> Vector3<T> {
    let mut rng = thread_rng();
    Vector3::new(
        rng.gen_range(range.clone()),
        rng.gen_range(range.clone()),
        rng.gen_range(range),
    )
}

/// Packs a clamped RGBA color into one `u32`, R in the low byte. The byte
/// order matches an `Rgba8` texture on a little-endian host.
pub fn pack_rgba(color: &Vector4<f32>) -> u32 {
    let r = (color.x * 255.0) as u32;
    let g = (color.y * 255.0) as u32;
    let b = (color.z * 255.0) as u32;
    let a = (color.w * 255.0) as u32;
    (a << 24) | (b << 16) | (g << 8) | r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn red_packs_to_known_literal() {
        assert_eq!(pack_rgba(&Vector4::new(1.0, 0.0, 0.0, 1.0)), 0xFF00_00FF);
    }

    #[test]
    fn channel_order_is_abgr_high_to_low() {
        assert_eq!(pack_rgba(&Vector4::new(0.0, 1.0, 0.0, 0.0)), 0x0000_FF00);
        assert_eq!(pack_rgba(&Vector4::new(0.0, 0.0, 1.0, 0.0)), 0x00FF_0000);
        assert_eq!(pack_rgba(&Vector4::new(0.0, 0.0, 0.0, 1.0)), 0xFF00_0000);
    }

    #[test]
    fn packed_bytes_match_texture_layout() {
        let packed = pack_rgba(&Vector4::new(1.0, 0.5, 0.0, 1.0));
        let bytes = packed.to_le_bytes();
        assert_eq!(bytes[0], 255);
        assert_eq!(bytes[1], 127);
        assert_eq!(bytes[2], 0);
        assert_eq!(bytes[3], 255);
    }
}
