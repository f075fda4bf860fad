use super::adaptive::check_end;
use crate::raytracer::camera::Camera;
use crate::raytracer::framebuffer::RenderState;
use crate::raytracer::params::AdaptiveParams;
use crate::raytracer::renderer::sampling::clamp_radiance;
use crate::raytracer::renderer::{Sampler, SceneAccess};
use glam::Vec3;
use std::time::Instant;

/// Run up to `num_samples` sampler invocations for one pixel, then refresh
/// its render cells and quality estimate. The batch is truncated at the
/// per-pixel cap, and a stop request or oracle trigger aborts it between
/// samples (skipping the refresh, like an in-flight batch anywhere else).
pub fn sample_pixel<S, R>(
    state: &RenderState,
    scene: &S,
    sampler: &R,
    camera: &Camera,
    ij: (usize, usize),
    num_samples: u32,
    params: &AdaptiveParams,
) where
    S: SceneAccess,
    R: Sampler,
{
    let mut pixel = state.pixel(ij);

    let remaining = params.max_samples.saturating_sub(pixel.all.samples);
    let batch = num_samples.min(remaining);

    for _ in 0..batch {
        if !state.stop_requested() {
            let start = Instant::now();
            let ray = camera.sample_ray(
                ij,
                (state.width(), state.height()),
                &mut pixel.rng,
                params.trace.tentfilter,
            );
            let result = sampler.sample(&ray, scene, &mut pixel.rng);
            pixel.time_in_sample += start.elapsed().as_nanos() as u64;
            state.count_sample();

            // an environment lookup counts as a hit unless environments are
            // hidden or the scene has none
            let (radiance, hit) = if result.hit {
                (result.radiance, true)
            } else if params.trace.envhidden || !scene.has_environments() {
                (Vec3::ZERO, false)
            } else {
                (result.radiance, true)
            };

            pixel.add_sample(clamp_radiance(radiance, params.trace.clamp), hit);
        }

        if check_end(state, params) {
            return;
        }
    }

    pixel.refresh(params.max_samples);
}

/// Sample a pixel in `sample_step` chunks until it reaches quality `q` or
/// the chunk total reaches `sample_limit`, whichever comes first.
pub fn trace_until_quality<S, R>(
    state: &RenderState,
    scene: &S,
    sampler: &R,
    camera: &Camera,
    ij: (usize, usize),
    params: &AdaptiveParams,
    q: f32,
    sample_limit: i64,
) where
    S: SceneAccess,
    R: Sampler,
{
    sample_pixel(state, scene, sampler, camera, ij, params.sample_step, params);
    if check_end(state, params) {
        return;
    }

    let mut samples_shot = params.sample_step as i64;
    while state.pixel(ij).q < q && samples_shot < sample_limit {
        sample_pixel(state, scene, sampler, camera, ij, params.sample_step, params);
        if check_end(state, params) {
            return;
        }
        samples_shot += params.sample_step as i64;
    }
}

/// Spend the budget the proximity pass assigned to this pixel, then clear it.
pub fn trace_by_budget<S, R>(
    state: &RenderState,
    scene: &S,
    sampler: &R,
    camera: &Camera,
    ij: (usize, usize),
    params: &AdaptiveParams,
) where
    S: SceneAccess,
    R: Sampler,
{
    let budget = state.pixel(ij).sample_budget;
    sample_pixel(state, scene, sampler, camera, ij, budget, params);
    state.pixel(ij).sample_budget = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raytracer::renderloop::testing::{make_state, ConstSampler, EmptyScene, NoiseSampler};

    #[test]
    fn clamps_out_of_range_radiance() {
        let (state, camera, params) = make_state(8, |p| {
            p.trace.clamp = 10.0;
        });
        let scene = EmptyScene::new(false);
        let sampler = ConstSampler::hit(Vec3::new(100.0, 0.0, 0.0));

        sample_pixel(&state, &scene, &sampler, &camera, (2, 3), 4, &params);

        let pixel = state.pixel((2, 3));
        assert_eq!(pixel.all.samples, 4);
        assert_eq!(pixel.all.radiance.as_vec3(), Vec3::new(40.0, 0.0, 0.0));
    }

    #[test]
    fn env_miss_is_hidden_without_environments() {
        let (state, camera, params) = make_state(8, |_| {});
        let scene = EmptyScene::new(false);
        let sampler = ConstSampler::miss(Vec3::ONE);

        sample_pixel(&state, &scene, &sampler, &camera, (0, 0), 8, &params);

        let pixel = state.pixel((0, 0));
        assert_eq!(pixel.all.hits, 0);
        assert_eq!(pixel.all.radiance.as_vec3(), Vec3::ZERO);
        assert_eq!(pixel.render.w, 0.0);
    }

    #[test]
    fn env_miss_counts_as_hit_with_environments() {
        let (state, camera, params) = make_state(8, |_| {});
        let scene = EmptyScene::new(true);
        let sampler = ConstSampler::miss(Vec3::ONE);

        sample_pixel(&state, &scene, &sampler, &camera, (0, 0), 8, &params);

        let pixel = state.pixel((0, 0));
        assert_eq!(pixel.all.hits, 8);
        assert_eq!(pixel.render.truncate(), Vec3::ONE);
        assert_eq!(pixel.render.w, 1.0);
    }

    #[test]
    fn envhidden_overrides_environments() {
        let (state, camera, params) = make_state(8, |p| {
            p.trace.envhidden = true;
        });
        let scene = EmptyScene::new(true);
        let sampler = ConstSampler::miss(Vec3::ONE);

        sample_pixel(&state, &scene, &sampler, &camera, (0, 0), 8, &params);
        assert_eq!(state.pixel((0, 0)).all.hits, 0);
    }

    #[test]
    fn batch_respects_the_sample_cap() {
        let (state, camera, params) = make_state(8, |p| {
            p.max_samples = 10;
        });
        let scene = EmptyScene::new(false);
        let sampler = ConstSampler::hit(Vec3::ONE);

        sample_pixel(&state, &scene, &sampler, &camera, (1, 1), 64, &params);

        let pixel = state.pixel((1, 1));
        assert_eq!(pixel.all.samples, 10);
        assert_eq!(pixel.q, 10.0);
        drop(pixel);
        assert_eq!(state.sample_count(), 10);
    }

    #[test]
    fn stop_skips_sampling_and_refresh() {
        let (state, camera, params) = make_state(8, |_| {});
        let scene = EmptyScene::new(false);
        let sampler = ConstSampler::hit(Vec3::ONE);

        state.control().request_stop();
        sample_pixel(&state, &scene, &sampler, &camera, (0, 0), 8, &params);

        let pixel = state.pixel((0, 0));
        assert_eq!(pixel.all.samples, 0);
        assert_eq!(pixel.q, 0.0);
    }

    #[test]
    fn until_quality_stops_at_the_sample_limit() {
        let (state, camera, params) = make_state(8, |p| {
            p.sample_step = 4;
        });
        let scene = EmptyScene::new(false);
        let sampler = NoiseSampler;

        trace_until_quality(&state, &scene, &sampler, &camera, (3, 3), &params, 9.0, 16);

        // one unconditional chunk, then chunks while shot < limit
        assert_eq!(state.pixel((3, 3)).all.samples, 16);
    }

    #[test]
    fn until_quality_returns_once_quality_is_met() {
        let (state, camera, params) = make_state(8, |p| {
            p.sample_step = 4;
        });
        let scene = EmptyScene::new(false);
        let sampler = ConstSampler::hit(Vec3::ONE);

        // constant radiance saturates q in the first chunk
        trace_until_quality(&state, &scene, &sampler, &camera, (3, 3), &params, 5.0, 1000);
        assert_eq!(state.pixel((3, 3)).all.samples, 4);
    }

    #[test]
    fn budget_is_spent_and_cleared() {
        let (state, camera, params) = make_state(8, |_| {});
        let scene = EmptyScene::new(false);
        let sampler = ConstSampler::hit(Vec3::ONE);

        state.pixel((5, 2)).sample_budget = 32;
        trace_by_budget(&state, &scene, &sampler, &camera, (5, 2), &params);

        let pixel = state.pixel((5, 2));
        assert_eq!(pixel.all.samples, 32);
        assert_eq!(pixel.sample_budget, 0);
    }

    #[test]
    fn odd_partition_invariant_survives_batches() {
        let (state, camera, params) = make_state(8, |_| {});
        let scene = EmptyScene::new(false);
        let sampler = NoiseSampler;

        for chunk in [1, 2, 5, 8, 3] {
            sample_pixel(&state, &scene, &sampler, &camera, (4, 4), chunk, &params);
            let pixel = state.pixel((4, 4));
            assert_eq!(pixel.odd.samples, (pixel.all.samples + 1) / 2);
            assert!(pixel.all.hits <= pixel.all.samples);
        }
    }
}
