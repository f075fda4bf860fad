use super::{SampleResult, Sampler, SceneAccess};
use crate::raytracer::ray::Ray;
use crate::raytracer::rng::Rng;

/// Head-light shading: albedo scaled by the facing ratio, no bounces.
/// Deterministic per ray, which makes it the reference sampler for tests.
pub struct EyelightSampler;

impl Sampler for EyelightSampler {
    fn sample<S: SceneAccess>(&self, ray: &Ray, scene: &S, _rng: &mut Rng) -> SampleResult {
        match scene.hit(ray) {
            Some(hit) => {
                let facing = hit.normal.dot(-ray.direction).max(0.0);
                SampleResult {
                    radiance: hit.emission + hit.albedo * facing,
                    hit: true,
                }
            }
            None => SampleResult::miss(scene.sample_sky(ray.direction)),
        }
    }
}
