pub mod raytracer;

pub use raytracer::framebuffer::{RenderControl, RenderState};
pub use raytracer::params::{AdaptiveParams, TraceParams};
pub use raytracer::renderloop::{trace_image, trace_start, trace_stop, RenderTask};
