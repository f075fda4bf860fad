use super::sampling::{build_basis, sample_cosine_hemisphere, to_world};
use super::{SampleResult, Sampler, SceneAccess};
use crate::raytracer::ray::{Ray, RAY_EPSILON};
use crate::raytracer::rng::Rng;
use glam::Vec3;

/// Diffuse path sampler: Lambertian surfaces, cosine-weighted bounces, sky
/// termination. Enough light transport to give the adaptive loop real noise
/// to chew on without dragging in a material system.
pub struct PathSampler<const MAX_BOUNCES: u32>;

impl<const MAX_BOUNCES: u32> PathSampler<MAX_BOUNCES> {
    pub fn new() -> Self {
        Self
    }
}

impl<const MAX_BOUNCES: u32> Default for PathSampler<MAX_BOUNCES> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const MAX_BOUNCES: u32> Sampler for PathSampler<MAX_BOUNCES> {
    fn sample<S: SceneAccess>(&self, ray: &Ray, scene: &S, rng: &mut Rng) -> SampleResult {
        let mut radiance = Vec3::ZERO;
        let mut throughput = Vec3::ONE;
        let mut ray = *ray;
        let mut primary_hit = false;

        for bounce in 0..=MAX_BOUNCES {
            let Some(hit) = scene.hit(&ray) else {
                radiance += throughput * scene.sample_sky(ray.direction);
                break;
            };
            if bounce == 0 {
                primary_hit = true;
            }

            radiance += throughput * hit.emission;
            throughput *= hit.albedo;

            // cosine-weighted bounce; the cosine and the pdf cancel
            let (u1, u2) = rng.next_2d();
            let (t, b, n) = build_basis(hit.normal);
            let direction = to_world(sample_cosine_hemisphere(u1, u2), t, b, n);
            ray = Ray::new(hit.point + hit.normal * RAY_EPSILON, direction);

            // russian roulette after a few bounces
            if bounce >= 3 {
                let p = throughput.max_element().clamp(0.05, 0.95);
                if rng.next_f32() > p {
                    break;
                }
                throughput /= p;
            }
        }

        SampleResult {
            radiance,
            hit: primary_hit,
        }
    }
}
