use super::dispatch::parallel_for;
use super::sample::{sample_pixel, trace_by_budget, trace_until_quality};
use super::spread::{build_sample_spread, SpreadEntry};
use crate::raytracer::camera::Camera;
use crate::raytracer::error::RenderError;
use crate::raytracer::framebuffer::{RenderControl, RenderState};
use crate::raytracer::params::AdaptiveParams;
use crate::raytracer::renderer::{Sampler, SceneAccess};
use image::Rgba32FImage;
use log::{debug, info};
use std::mem;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

pub type ProgressCallback<'a> = dyn FnMut(&RenderState, &str, u64, u64) + 'a;
pub type BatchCallback<'a> = dyn FnMut(&RenderState, f32, f32) + 'a;

/// Global stop conditions, cheapest first. The quality target only
/// terminates the render when neither the spp nor the time budget is set.
pub fn check_end(state: &RenderState, params: &AdaptiveParams) -> bool {
    if state.stop_requested() {
        return true;
    }

    if params.desired_spp > 0 {
        let image_spp = state.sample_count() / state.pixel_count();
        if image_spp >= params.desired_spp as u64 {
            return true;
        }
    }

    if params.desired_seconds > 0 && state.elapsed().as_secs() >= params.desired_seconds {
        return true;
    }

    if params.desired_spp == 0
        && params.desired_seconds == 0
        && state.min_q >= params.desired_q
    {
        return true;
    }

    false
}

/// Progress denominator for whichever budget drives this render.
fn max_progress(state: &RenderState, params: &AdaptiveParams) -> u64 {
    if params.desired_spp > 0 {
        params.desired_spp as u64 * state.pixel_count()
    } else if params.desired_seconds > 0 {
        params.desired_seconds * 1000
    } else {
        (params.desired_q.max(0.0) * 1000.0) as u64
    }
}

fn actual_progress(state: &RenderState, params: &AdaptiveParams) -> u64 {
    let actual = if params.desired_spp > 0 {
        state.sample_count()
    } else if params.desired_seconds > 0 {
        state.elapsed().as_millis() as u64
    } else {
        (state.curr_q.max(0.0) * 1000.0) as u64
    };
    actual.min(max_progress(state, params))
}

/// Raise neighbors of every quality-sampled pixel to a share of its sample
/// count, keeping the larger budget where stencils overlap.
fn assign_proximity_budgets(
    state: &RenderState,
    ij_by_q: &[(usize, usize)],
    spread: &[SpreadEntry],
) {
    let (width, height) = (state.width() as i64, state.height() as i64);

    for &ij in ij_by_q {
        let samples = state.pixel(ij).all.samples;

        for entry in spread {
            let k = ij.0 as i64 + entry.dx as i64;
            let l = ij.1 as i64 + entry.dy as i64;
            if k < 0 || l < 0 || k >= width || l >= height {
                continue;
            }

            let mut neighbor = state.pixel((k as usize, l as usize));
            let target = samples as f32 / entry.div;
            if ((neighbor.all.samples + neighbor.sample_budget) as f32) < target {
                neighbor.sample_budget = (target - neighbor.all.samples as f32) as u32;
            }
        }
    }
}

fn collect_budgeted_pixels(state: &RenderState, out: &mut Vec<(usize, usize)>) {
    for j in 0..state.height() {
        for i in 0..state.width() {
            if state.pixel((i, j)).sample_budget > 0 {
                out.push((i, j));
            }
        }
    }
}

/// Render until the configured budget is met, adaptively concentrating
/// samples on pixels whose odd/even partitions still disagree.
///
/// Phases: seed every pixel with `min_samples`, then loop (select pixels
/// below the quality threshold, sample them up to the threshold, spread
/// budget into their neighborhoods, spend it, measure, advance the
/// threshold) until the termination oracle fires. Returns the current
/// render, partial if the render was cancelled.
pub fn trace_image<S, R>(
    state: &mut RenderState,
    scene: &S,
    sampler: &R,
    camera: &Camera,
    params: &AdaptiveParams,
    mut progress_cb: Option<&mut ProgressCallback<'_>>,
    mut batch_cb: Option<&mut BatchCallback<'_>>,
) -> Rgba32FImage
where
    S: SceneAccess + Sync,
    R: Sampler + Sync,
{
    let mut step_q = 0.0f32;
    state.curr_q = -2.0;

    state.reset(params);
    let mut spread = build_sample_spread(step_q);

    let (width, height) = (state.width(), state.height());
    info!(
        "adaptive render {}x{} (min {} spp, step {}, max {} spp)",
        width, height, params.min_samples, params.sample_step, params.max_samples
    );

    if let Some(cb) = progress_cb.as_mut() {
        cb(
            state,
            "initial samples",
            actual_progress(state, params),
            max_progress(state, params),
        );
    }
    state.curr_q = -1.0;

    // seed: every pixel gets min_samples before any adaptive decision
    let all_ij = state.all_pixels();
    let mut seeded = 0;
    while seeded < params.min_samples {
        let st: &RenderState = state;
        parallel_for(st, params, &all_ij, |ij| {
            sample_pixel(st, scene, sampler, camera, ij, params.sample_step, params)
        });
        seeded += params.sample_step;
    }

    let mut min_sample_in_a_pixel = params.min_samples as i64;
    let mut old_min_sample = 0i64;

    if let Some(cb) = batch_cb.as_mut() {
        cb(state, state.curr_q, params.desired_q);
    }
    let mut next_batch = state.curr_q + params.batch_step;

    while !check_end(state, params) {
        // select pixels still below the current threshold
        let mut ij_by_q = mem::take(&mut state.ij_by_q);
        ij_by_q.clear();
        for j in 0..height {
            for i in 0..width {
                let mut pixel = state.pixel((i, j));
                pixel.sample_budget = 0;
                let below = pixel.q < step_q;
                drop(pixel);
                if below {
                    ij_by_q.push((i, j));
                }
            }
        }

        // no pixel may outrun the slowest pixel's progress since last time
        let limit_trace = min_sample_in_a_pixel - old_min_sample;

        if let Some(cb) = progress_cb.as_mut() {
            cb(
                state,
                "samples by quality",
                actual_progress(state, params),
                max_progress(state, params),
            );
        }
        {
            let st: &RenderState = state;
            parallel_for(st, params, &ij_by_q, |ij| {
                trace_until_quality(st, scene, sampler, camera, ij, params, step_q, limit_trace)
            });
        }

        // push budget into the neighborhoods of the pixels just sampled
        let mut ij_by_proximity = mem::take(&mut state.ij_by_proximity);
        ij_by_proximity.clear();
        assign_proximity_budgets(state, &ij_by_q, &spread);
        collect_budgeted_pixels(state, &mut ij_by_proximity);

        if let Some(cb) = progress_cb.as_mut() {
            cb(
                state,
                "samples by proximity",
                actual_progress(state, params),
                max_progress(state, params),
            );
        }
        {
            let st: &RenderState = state;
            parallel_for(st, params, &ij_by_proximity, |ij| {
                trace_by_budget(st, scene, sampler, camera, ij, params)
            });
        }

        // measure the floor the whole image has reached
        old_min_sample = min_sample_in_a_pixel;
        let mut tmp_min_q = f32::MAX;
        for j in 0..height {
            for i in 0..width {
                let pixel = state.pixel((i, j));
                tmp_min_q = tmp_min_q.min(pixel.q);
                min_sample_in_a_pixel = min_sample_in_a_pixel.min(pixel.all.samples as i64);
            }
        }
        state.min_q = tmp_min_q;

        debug!(
            "step_q {:.2}: {} below threshold, {} budgeted, min_q {:.2}, {} samples",
            step_q,
            ij_by_q.len(),
            ij_by_proximity.len(),
            state.min_q,
            state.sample_count()
        );

        if state.min_q >= step_q {
            state.curr_q = step_q;

            if state.curr_q >= next_batch {
                if let Some(cb) = batch_cb.as_mut() {
                    cb(state, state.curr_q, params.desired_q);
                }
                next_batch = state.curr_q + params.batch_step;
            }

            step_q += params.step_q;
            spread = build_sample_spread(step_q);

            // the threshold never needs to pass the target when quality is
            // the active stop condition
            if params.desired_seconds == 0
                && params.desired_spp == 0
                && step_q > params.desired_q
            {
                step_q = params.desired_q;
            }
        }

        state.ij_by_q = ij_by_q;
        state.ij_by_proximity = ij_by_proximity;
    }

    if !state.stop_requested() {
        if let Some(cb) = progress_cb.as_mut() {
            let max = max_progress(state, params);
            cb(state, "samples by proximity", max, max);
        }
        if let Some(cb) = batch_cb.as_mut() {
            cb(state, params.desired_q, params.desired_q);
        }
    }

    info!(
        "render finished: {} samples in {:.2}s",
        state.sample_count(),
        state.elapsed().as_secs_f32()
    );

    state.render_image()
}

/// A render running on its own worker thread; see [`trace_start`].
pub struct RenderTask {
    control: Arc<RenderControl>,
    worker: Mutex<Option<JoinHandle<(RenderState, Rgba32FImage)>>>,
}

impl RenderTask {
    pub fn control(&self) -> Arc<RenderControl> {
        Arc::clone(&self.control)
    }

    pub fn sample_count(&self) -> u64 {
        self.control.sample_count()
    }

    /// Request a cooperative stop and join the worker. Idempotent and safe
    /// to call from any thread; only the first caller receives the state
    /// and the (possibly partial) render.
    pub fn stop(&self) -> Option<(RenderState, Rgba32FImage)> {
        self.control.request_stop();
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()?;
        handle.join().ok()
    }
}

impl Drop for RenderTask {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Spawn `trace_image` on a background thread and hand back its controls.
pub fn trace_start<S, R>(
    scene: Arc<S>,
    sampler: Arc<R>,
    camera: Camera,
    params: AdaptiveParams,
    mut progress_cb: Option<Box<dyn FnMut(&RenderState, &str, u64, u64) + Send>>,
    mut batch_cb: Option<Box<dyn FnMut(&RenderState, f32, f32) + Send>>,
) -> Result<RenderTask, RenderError>
where
    S: SceneAccess + Send + Sync + 'static,
    R: Sampler + Send + Sync + 'static,
{
    let mut state = RenderState::new(&camera, &params)?;
    let control = state.control();
    control.clear_stop();

    let worker = thread::spawn(move || {
        let progress: Option<&mut ProgressCallback> = match progress_cb.as_mut() {
            Some(cb) => Some(cb.as_mut()),
            None => None,
        };
        let batch: Option<&mut BatchCallback> = match batch_cb.as_mut() {
            Some(cb) => Some(cb.as_mut()),
            None => None,
        };
        let image = trace_image(
            &mut state,
            scene.as_ref(),
            sampler.as_ref(),
            &camera,
            &params,
            progress,
            batch,
        );
        (state, image)
    });

    Ok(RenderTask {
        control,
        worker: Mutex::new(Some(worker)),
    })
}

/// Cancel an asynchronous render; see [`RenderTask::stop`].
pub fn trace_stop(task: &RenderTask) -> Option<(RenderState, Rgba32FImage)> {
    task.stop()
}
