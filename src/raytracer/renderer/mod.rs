mod eyelight;
mod pathtracer;
pub mod sampling;

use crate::raytracer::ray::{HitData, Ray};
use crate::raytracer::rng::Rng;
use glam::Vec3;

pub use eyelight::EyelightSampler;
pub use pathtracer::PathSampler;

/// One Monte-Carlo estimate for a camera ray: a radiance triple and whether
/// the primary ray intersected geometry. Environment lookups on a miss are
/// reported with `hit = false`; the sampler adapter decides how to count them.
#[derive(Clone, Copy)]
pub struct SampleResult {
    pub radiance: Vec3,
    pub hit: bool,
}

impl SampleResult {
    pub fn miss(radiance: Vec3) -> Self {
        Self {
            radiance,
            hit: false,
        }
    }
}

pub trait SceneAccess {
    fn hit(&self, ray: &Ray) -> Option<HitData>;
    fn sample_sky(&self, direction: Vec3) -> Vec3;
    fn has_environments(&self) -> bool;
}

pub trait Sampler {
    fn sample<S: SceneAccess>(&self, ray: &Ray, scene: &S, rng: &mut Rng) -> SampleResult;
}

/// Built-in sampler tags. The demo binary resolves a tag to a concrete
/// sampler once, before rendering starts; the controller itself is generic
/// and monomorphizes over the chosen type.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TraceMode {
    Path,
    Eyelight,
}

impl TraceMode {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "path" => Some(TraceMode::Path),
            "eyelight" => Some(TraceMode::Eyelight),
            _ => None,
        }
    }
}
