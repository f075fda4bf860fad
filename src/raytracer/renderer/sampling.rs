use glam::Vec3;
use std::f32::consts::PI;

pub fn sample_cosine_hemisphere(u1: f32, u2: f32) -> Vec3 {
    let r = u1.sqrt();
    let phi = 2.0 * PI * u2;
    Vec3::new(r * phi.cos(), r * phi.sin(), (1.0 - u1).max(0.0).sqrt())
}

pub fn build_basis(n: Vec3) -> (Vec3, Vec3, Vec3) {
    let up = if n.y.abs() < 0.999 { Vec3::Y } else { Vec3::X };
    let t = up.cross(n).normalize();
    let b = n.cross(t);
    (t, b, n)
}

pub fn to_world(local: Vec3, t: Vec3, b: Vec3, n: Vec3) -> Vec3 {
    t * local.x + b * local.y + n * local.z
}

/// Zero out non-finite estimates and rescale anything whose largest channel
/// reaches `clamp`, preserving chromaticity.
pub fn clamp_radiance(radiance: Vec3, clamp: f32) -> Vec3 {
    if !radiance.is_finite() {
        return Vec3::ZERO;
    }

    let max_component = radiance.max_element();
    if max_component >= clamp {
        radiance * (clamp / max_component)
    } else {
        radiance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_rescales_preserving_hue() {
        let clamped = clamp_radiance(Vec3::new(100.0, 0.0, 0.0), 10.0);
        assert_eq!(clamped, Vec3::new(10.0, 0.0, 0.0));

        let clamped = clamp_radiance(Vec3::new(40.0, 20.0, 0.0), 10.0);
        assert_eq!(clamped, Vec3::new(10.0, 5.0, 0.0));
    }

    #[test]
    fn clamp_passes_small_values() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(clamp_radiance(v, 10.0), v);
    }

    #[test]
    fn clamp_zeroes_non_finite() {
        assert_eq!(
            clamp_radiance(Vec3::new(f32::NAN, 1.0, 1.0), 10.0),
            Vec3::ZERO
        );
        assert_eq!(
            clamp_radiance(Vec3::new(f32::INFINITY, 1.0, 1.0), 10.0),
            Vec3::ZERO
        );
    }

    #[test]
    fn cosine_samples_stay_in_upper_hemisphere() {
        for i in 0..32 {
            let u1 = i as f32 / 32.0;
            let u2 = (i as f32 * 0.37).fract();
            let d = sample_cosine_hemisphere(u1, u2);
            assert!(d.z >= 0.0);
            assert!((d.length() - 1.0).abs() < 1e-4);
        }
    }
}
