mod adaptive;
mod dispatch;
mod sample;
mod spread;

pub use adaptive::{
    check_end, trace_image, trace_start, trace_stop, BatchCallback, ProgressCallback, RenderTask,
};
pub use dispatch::parallel_for;
pub use sample::{sample_pixel, trace_by_budget, trace_until_quality};
pub use spread::{build_sample_spread, SpreadEntry};

#[cfg(test)]
pub(crate) mod testing {
    use crate::raytracer::camera::Camera;
    use crate::raytracer::framebuffer::RenderState;
    use crate::raytracer::params::AdaptiveParams;
    use crate::raytracer::ray::{HitData, Ray};
    use crate::raytracer::renderer::{SampleResult, Sampler, SceneAccess};
    use crate::raytracer::rng::Rng;
    use glam::Vec3;

    /// Geometry-free scene; only the environment flag matters to the
    /// sampler adapter.
    pub struct EmptyScene {
        environments: bool,
    }

    impl EmptyScene {
        pub fn new(environments: bool) -> Self {
            Self { environments }
        }
    }

    impl SceneAccess for EmptyScene {
        fn hit(&self, _ray: &Ray) -> Option<HitData> {
            None
        }

        fn sample_sky(&self, _direction: Vec3) -> Vec3 {
            Vec3::ZERO
        }

        fn has_environments(&self) -> bool {
            self.environments
        }
    }

    /// Always returns the same estimate.
    pub struct ConstSampler {
        radiance: Vec3,
        hit: bool,
    }

    impl ConstSampler {
        pub fn hit(radiance: Vec3) -> Self {
            Self {
                radiance,
                hit: true,
            }
        }

        pub fn miss(radiance: Vec3) -> Self {
            Self {
                radiance,
                hit: false,
            }
        }
    }

    impl Sampler for ConstSampler {
        fn sample<S: SceneAccess>(&self, _ray: &Ray, _scene: &S, _rng: &mut Rng) -> SampleResult {
            SampleResult {
                radiance: self.radiance,
                hit: self.hit,
            }
        }
    }

    /// High-variance estimates that keep pixel quality low.
    pub struct NoiseSampler;

    impl Sampler for NoiseSampler {
        fn sample<S: SceneAccess>(&self, _ray: &Ray, _scene: &S, rng: &mut Rng) -> SampleResult {
            SampleResult {
                radiance: Vec3::splat(rng.next_f32() * 100.0),
                hit: true,
            }
        }
    }

    pub fn make_state(
        resolution: u32,
        tweak: impl FnOnce(&mut AdaptiveParams),
    ) -> (RenderState, Camera, AdaptiveParams) {
        let camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, 60.0, 1.0);
        let mut params = AdaptiveParams {
            resolution,
            ..AdaptiveParams::default()
        };
        tweak(&mut params);
        let state = RenderState::new(&camera, &params).expect("valid test state");
        (state, camera, params)
    }
}
