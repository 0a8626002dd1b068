//! Deterministic per-pixel random stream.
//!
//! The integrator seeds this with `pixel_index * frame_index` so that every
//! pixel draws an independent sequence each frame and the accumulated noise
//! averages down instead of correlating.

use nalgebra::Vector3;

/// PCG-style avalanche hash. Advances `seed` in place and returns the new
/// value.
pub fn next_u32(seed: &mut u32) -> u32 {
    let state = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    *seed = (word >> 22) ^ word;
    *seed
}

/// Uniform value in the unit interval, the hash divided by the largest
/// representable 32-bit value.
pub fn next_f32(seed: &mut u32) -> f32 {
    next_u32(seed) as f32 / u32::MAX as f32
}

/// Draws three uniform components in `[-1, 1)` and normalizes them. The name
/// is historical: the result lies on the unit sphere's surface, and the
/// integrator's scatter lobe depends on exactly that.
pub fn in_unit_sphere(seed: &mut u32) -> Vector3<f32> {
    Vector3::new(
        next_f32(seed) * 2.0 - 1.0,
        next_f32(seed) * 2.0 - 1.0,
        next_f32(seed) * 2.0 - 1.0,
    )
    .normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_yields_same_stream() {
        let mut a = 0xDEAD_BEEF;
        let mut b = 0xDEAD_BEEF;
        for _ in 0..64 {
            assert_eq!(next_u32(&mut a), next_u32(&mut b));
        }
    }

    #[test]
    fn call_advances_the_seed() {
        let mut seed = 7;
        let first = next_u32(&mut seed);
        assert_eq!(seed, first);
        let second = next_u32(&mut seed);
        assert_ne!(first, second);
    }

    #[test]
    fn floats_stay_in_unit_interval() {
        let mut seed = 1;
        for _ in 0..1024 {
            let value = next_f32(&mut seed);
            assert!((0.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn unit_sphere_samples_have_unit_length() {
        let mut seed = 42;
        for _ in 0..256 {
            let sample = in_unit_sphere(&mut seed);
            assert!((sample.magnitude() - 1.0).abs() < 1e-5);
        }
    }
}
