use crate::raytracer::camera::Camera;
use crate::raytracer::error::RenderError;
use crate::raytracer::exporter::linear_to_srgb;
use crate::raytracer::params::AdaptiveParams;
use crate::raytracer::rng::Rng;
use glam::{DVec3, Vec3, Vec4};
use image::Rgba32FImage;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Seed of the one-time generator that derives per-pixel RNG streams.
const PIXEL_STREAM_SEED: u64 = 1301081;

/// Quality is capped here; a pixel at `max_samples` reports exactly this.
pub const MAX_QUALITY: f32 = 10.0;

#[derive(Clone, Copy, Default)]
pub struct Partition {
    pub radiance: DVec3,
    pub hits: u32,
    pub samples: u32,
}

impl Partition {
    fn accumulate(&mut self, radiance: DVec3, hit: bool) {
        self.radiance += radiance;
        self.hits += hit as u32;
        self.samples += 1;
    }

    /// Averaged radiance plus hit fraction. Radiance is averaged over hits,
    /// so environment-hidden misses do not darken the result.
    fn resolve(&self) -> Vec4 {
        if self.samples == 0 {
            return Vec4::ZERO;
        }
        let rgb = if self.hits > 0 {
            (self.radiance / self.hits as f64).as_vec3()
        } else {
            Vec3::ZERO
        };
        rgb.extend(self.hits as f32 / self.samples as f32)
    }
}

pub struct PixelAccumulator {
    pub rng: Rng,
    pub all: Partition,
    pub odd: Partition,
    pub q: f32,
    pub sample_budget: u32,
    pub time_in_sample: u64,
    pub render: Vec4,
    pub odd_render: Vec4,
}

impl Default for PixelAccumulator {
    fn default() -> Self {
        Self {
            rng: Rng::default(),
            all: Partition::default(),
            odd: Partition::default(),
            q: 0.0,
            sample_budget: 0,
            time_in_sample: 0,
            render: Vec4::ZERO,
            odd_render: Vec4::ZERO,
        }
    }
}

impl PixelAccumulator {
    /// Record one post-processed sample. Odd-indexed samples also feed the
    /// `odd` partition, keeping `odd.samples == ceil(all.samples / 2)`.
    pub fn add_sample(&mut self, radiance: Vec3, hit: bool) {
        let radiance = radiance.as_dvec3();
        self.all.accumulate(radiance, hit);
        if self.all.samples % 2 == 1 {
            self.odd.accumulate(radiance, hit);
        }
    }

    /// Recompute the derived render cells and the quality estimate.
    pub fn refresh(&mut self, max_samples: u32) {
        self.render = self.all.resolve();
        self.odd_render = self.odd.resolve();

        if self.all.samples >= max_samples {
            self.q = MAX_QUALITY;
            return;
        }

        let s = srgb(self.render);
        let s_odd = srgb(self.odd_render);
        let diff = ((s.x - s_odd.x).abs() + (s.y - s_odd.y).abs() + (s.z - s_odd.z).abs()) as f64;
        let div = ((s.x + s.y + s.z) as f64).sqrt();

        let err = if div >= 1e-4 { diff / div } else { diff / 0.01 };
        self.q = (-err.log2()).min(MAX_QUALITY as f64) as f32;
    }
}

fn srgb(c: Vec4) -> Vec3 {
    Vec3::new(
        linear_to_srgb(c.x),
        linear_to_srgb(c.y),
        linear_to_srgb(c.z),
    )
}

/// Shared between the render thread, its workers and external observers.
/// These are the only two pieces of cross-thread mutable state.
pub struct RenderControl {
    stop: AtomicBool,
    sample_count: AtomicU64,
}

impl RenderControl {
    fn new() -> Self {
        Self {
            stop: AtomicBool::new(false),
            sample_count: AtomicU64::new(0),
        }
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn clear_stop(&self) {
        self.stop.store(false, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn count_sample(&self) {
        self.sample_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count.load(Ordering::Relaxed)
    }

    fn reset_samples(&self) {
        self.sample_count.store(0, Ordering::Relaxed);
    }
}

pub struct RenderState {
    width: usize,
    height: usize,
    pixels: Vec<Mutex<PixelAccumulator>>,
    control: Arc<RenderControl>,
    start_time: Instant,
    pub min_q: f32,
    pub curr_q: f32,
    pub ij_by_q: Vec<(usize, usize)>,
    pub ij_by_proximity: Vec<(usize, usize)>,
}

impl RenderState {
    pub fn new(camera: &Camera, params: &AdaptiveParams) -> Result<Self, RenderError> {
        let (width, height) = camera.film_size(params.resolution);
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyImage { width, height });
        }
        if params.sample_step == 0 {
            return Err(RenderError::params("sample_step must be at least 1"));
        }

        let mut state = Self {
            width,
            height,
            pixels: (0..width * height)
                .map(|_| Mutex::new(PixelAccumulator::default()))
                .collect(),
            control: Arc::new(RenderControl::new()),
            start_time: Instant::now(),
            min_q: 0.0,
            curr_q: 0.0,
            ij_by_q: Vec::new(),
            ij_by_proximity: Vec::new(),
        };
        state.reset(params);
        Ok(state)
    }

    /// Zero all accumulators, restart the clock and reseed the per-pixel
    /// generators. Skipped entirely once a stop has been requested.
    pub fn reset(&mut self, params: &AdaptiveParams) {
        if self.control.stop_requested() {
            return;
        }
        self.start_time = Instant::now();
        self.control.reset_samples();

        let mut seeder = Rng::new(PIXEL_STREAM_SEED);
        for pixel in &mut self.pixels {
            let stream = (seeder.next_below(1 << 31) / 2 + 1) as u64;
            let pixel = pixel.get_mut().unwrap_or_else(|e| e.into_inner());
            *pixel = PixelAccumulator {
                rng: Rng::with_stream(params.trace.seed, stream),
                ..PixelAccumulator::default()
            };
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_count(&self) -> u64 {
        (self.width * self.height) as u64
    }

    pub fn control(&self) -> Arc<RenderControl> {
        Arc::clone(&self.control)
    }

    pub fn sample_count(&self) -> u64 {
        self.control.sample_count()
    }

    pub fn stop_requested(&self) -> bool {
        self.control.stop_requested()
    }

    pub fn count_sample(&self) {
        self.control.count_sample();
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Claim a pixel. Dispatch lists hold distinct coordinates, so the lock
    /// is uncontended during parallel phases.
    pub fn pixel(&self, ij: (usize, usize)) -> MutexGuard<'_, PixelAccumulator> {
        self.pixels[ij.1 * self.width + ij.0]
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Every coordinate of the image, row-major.
    pub fn all_pixels(&self) -> Vec<(usize, usize)> {
        let width = self.width;
        (0..self.width * self.height)
            .map(|idx| (idx % width, idx / width))
            .collect()
    }

    pub fn to_color_buffer(&self) -> Vec<Vec4> {
        self.pixels
            .par_iter()
            .map(|pixel| pixel.lock().unwrap_or_else(|e| e.into_inner()).render)
            .collect()
    }

    pub fn render_image(&self) -> Rgba32FImage {
        let buffer = self.to_color_buffer();
        let mut raw = Vec::with_capacity(buffer.len() * 4);
        for cell in buffer {
            raw.extend_from_slice(&cell.to_array());
        }
        Rgba32FImage::from_raw(self.width as u32, self.height as u32, raw)
            .expect("buffer dimensions match the image")
    }
}
