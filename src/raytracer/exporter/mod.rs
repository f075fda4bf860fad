mod png;
mod tonemapping;

pub use png::PngExporter;
pub use tonemapping::{linear_to_srgb, linear_to_srgb_u8, ToneMap};
