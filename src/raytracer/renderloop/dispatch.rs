use super::adaptive::check_end;
use crate::raytracer::framebuffer::RenderState;
use crate::raytracer::params::AdaptiveParams;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Fan `func` out over `ij_list` on one worker per hardware thread.
///
/// Workers share a fetch-and-increment cursor, so the list itself is never
/// partitioned up front; a worker that lands on an expensive pixel simply
/// claims fewer of them. The termination oracle is polled at the top of
/// every dequeue, and a stop request short-circuits worker spawning too.
/// Returns once every worker has exited.
///
/// `func` must touch only the pixel it is handed; coordinates in the list
/// are distinct, so per-pixel state needs no further synchronization.
pub fn parallel_for<F>(
    state: &RenderState,
    params: &AdaptiveParams,
    ij_list: &[(usize, usize)],
    func: F,
) where
    F: Fn((usize, usize)) + Sync,
{
    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let next_idx = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..workers {
            if state.stop_requested() {
                break;
            }
            scope.spawn(|| {
                while !check_end(state, params) {
                    let idx = next_idx.fetch_add(1, Ordering::Relaxed);
                    if idx >= ij_list.len() {
                        break;
                    }
                    func(ij_list[idx]);
                }
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raytracer::camera::Camera;
    use std::sync::atomic::AtomicU32;

    fn make_state(resolution: u32) -> (RenderState, AdaptiveParams) {
        let camera = Camera::new(glam::Vec3::ZERO, glam::Vec3::NEG_Z, 60.0, 1.0);
        let params = AdaptiveParams {
            resolution,
            ..AdaptiveParams::default()
        };
        (RenderState::new(&camera, &params).unwrap(), params)
    }

    #[test]
    fn visits_every_pixel_exactly_once() {
        let (state, params) = make_state(16);
        let list = state.all_pixels();
        let visits: Vec<AtomicU32> = (0..list.len()).map(|_| AtomicU32::new(0)).collect();

        parallel_for(&state, &params, &list, |(i, j)| {
            visits[j * state.width() + i].fetch_add(1, Ordering::Relaxed);
        });

        assert!(visits.iter().all(|v| v.load(Ordering::Relaxed) == 1));
    }

    #[test]
    fn stop_request_prevents_any_work() {
        let (state, params) = make_state(16);
        let list = state.all_pixels();
        let visited = AtomicU32::new(0);

        state.control().request_stop();
        parallel_for(&state, &params, &list, |_| {
            visited.fetch_add(1, Ordering::Relaxed);
        });

        assert_eq!(visited.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn mid_run_stop_leaves_tail_unvisited() {
        let (state, params) = make_state(64);
        let list = state.all_pixels();
        let visited = AtomicU32::new(0);
        let control = state.control();

        parallel_for(&state, &params, &list, |_| {
            if visited.fetch_add(1, Ordering::Relaxed) == 16 {
                control.request_stop();
            }
        });

        assert!((visited.load(Ordering::Relaxed) as usize) < list.len());
    }
}
