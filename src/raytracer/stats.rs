use crate::raytracer::framebuffer::RenderState;
use image::GrayImage;

/// Summary of a render, plus a preformatted text block for logs.
pub struct Statistics {
    pub samples: u64,
    pub pixels: u64,
    pub min_q: f32,
    pub max_q: f32,
    pub min_spp: u32,
    pub avg_spp: f64,
    pub max_spp: u32,
    pub summary: String,
}

pub fn collect_statistics(state: &RenderState) -> Statistics {
    let mut min_q = f32::MAX;
    let mut max_q = f32::MIN;
    let mut min_spp = u32::MAX;
    let mut max_spp = 0u32;

    for ij in state.all_pixels() {
        let pixel = state.pixel(ij);
        min_q = min_q.min(pixel.q);
        max_q = max_q.max(pixel.q);
        min_spp = min_spp.min(pixel.all.samples);
        max_spp = max_spp.max(pixel.all.samples);
    }

    let pixels = state.pixel_count();
    let samples = state.sample_count();
    let avg_spp = samples as f64 / pixels as f64;

    let elapsed = state.elapsed().as_millis();
    let summary = format!(
        "    Current q: {:.6}\n        min_q: {:.6}\n        max_q: {:.6}\n      min_spp: {}\n      avg_spp: {:.6}\n      max_spp: {}\nsampling time: {:02}:{:02}.{:03}\n",
        state.curr_q,
        min_q,
        max_q,
        min_spp,
        avg_spp,
        max_spp,
        elapsed / 60000,
        (elapsed % 60000) / 1000,
        (elapsed % 60000) % 1000,
    );

    Statistics {
        samples,
        pixels,
        min_q,
        max_q,
        min_spp,
        avg_spp,
        max_spp,
        summary,
    }
}

/// Where the samples went: intensity grows with the square root of the
/// sample count above the image-wide minimum.
pub fn sample_density_img(state: &RenderState, stats: &Statistics) -> GrayImage {
    let mut img = GrayImage::new(state.width() as u32, state.height() as u32);

    let range = (stats.max_spp - stats.min_spp) as f32;
    let step = if range > 0.0 { 255.0 / range.sqrt() } else { 0.0 };

    for (i, j, px) in img.enumerate_pixels_mut() {
        let samples = state.pixel((i as usize, j as usize)).all.samples;
        px.0[0] = (((samples - stats.min_spp) as f32).sqrt() * step) as u8;
    }

    img
}

/// Where the time went: per-pixel mean sampler nanoseconds, normalized over
/// the observed range. Unsampled pixels stay black.
pub fn time_density_img(state: &RenderState) -> GrayImage {
    let mut img = GrayImage::new(state.width() as u32, state.height() as u32);

    let mut min_time = 0.0f64;
    let mut max_time = 0.0f64;
    for ij in state.all_pixels() {
        let pixel = state.pixel(ij);
        if pixel.all.samples > 0 {
            let time = pixel.time_in_sample as f64 / pixel.all.samples as f64;
            if min_time == 0.0 {
                min_time = time;
            }
            if max_time == 0.0 {
                max_time = time;
            }
            min_time = min_time.min(time);
            max_time = max_time.max(time);
        }
    }

    if max_time <= min_time {
        return img;
    }
    let step = 255.0 / (max_time - min_time).sqrt();

    for (i, j, px) in img.enumerate_pixels_mut() {
        let pixel = state.pixel((i as usize, j as usize));
        if pixel.all.samples > 0 {
            let time = pixel.time_in_sample as f64 / pixel.all.samples as f64;
            px.0[0] = ((time - min_time) * step).sqrt() as u8;
        }
    }

    img
}

/// Quality map: 20 intensity levels per quality bit, saturating at 255.
pub fn q_img(state: &RenderState) -> GrayImage {
    let mut img = GrayImage::new(state.width() as u32, state.height() as u32);

    for (i, j, px) in img.enumerate_pixels_mut() {
        let q = state.pixel((i as usize, j as usize)).q;
        px.0[0] = ((q * 20.0) as i32).clamp(0, 255) as u8;
    }

    img
}
