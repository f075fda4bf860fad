/// Options forwarded to the sampler and the camera ray builder.
#[derive(Clone, Copy)]
pub struct TraceParams {
    pub tentfilter: bool,
    pub envhidden: bool,
    pub clamp: f32,
    pub seed: u64,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            tentfilter: false,
            envhidden: false,
            clamp: 10.0,
            seed: 961748941,
        }
    }
}

#[derive(Clone, Copy)]
pub struct AdaptiveParams {
    pub trace: TraceParams,
    /// Samples every pixel receives before adaptation begins.
    pub min_samples: u32,
    /// Batch size inside the sampler adapter.
    pub sample_step: u32,
    /// Hard per-pixel cap; a pixel at the cap reports quality 10.
    pub max_samples: u32,
    /// Target minimum quality bits. Only enforced as a stop condition when
    /// neither `desired_spp` nor `desired_seconds` is set.
    pub desired_q: f32,
    /// Target average samples per pixel, 0 disables.
    pub desired_spp: u32,
    /// Wall-clock budget in seconds, 0 disables.
    pub desired_seconds: u64,
    /// Quality threshold increment per scheduler iteration.
    pub step_q: f32,
    /// Quality delta between consecutive batch callbacks.
    pub batch_step: f32,
    /// Long-axis resolution; the short axis follows the camera film ratio.
    pub resolution: u32,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            trace: TraceParams::default(),
            min_samples: 32,
            sample_step: 8,
            max_samples: 4096,
            desired_q: 5.0,
            desired_spp: 0,
            desired_seconds: 0,
            step_q: 1.0,
            batch_step: 1.0,
            resolution: 1280,
        }
    }
}
