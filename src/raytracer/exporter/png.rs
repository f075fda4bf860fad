use super::{linear_to_srgb_u8, ToneMap};
use glam::Vec3;
use image::{ImageBuffer, Rgb, Rgba32FImage};

pub struct PngExporter {
    tonemap: ToneMap,
    exposure: f32,
}

impl PngExporter {
    pub fn srgb() -> Self {
        Self {
            tonemap: ToneMap::None,
            exposure: 1.0,
        }
    }

    pub fn with_tonemap(tonemap: ToneMap) -> Self {
        Self {
            tonemap,
            exposure: 1.0,
        }
    }

    pub fn with_exposure(mut self, exposure: f32) -> Self {
        self.exposure = exposure;
        self
    }

    fn vec3_to_rgb(&self, color: Vec3) -> Rgb<u8> {
        let mapped = self.tonemap.apply_with_exposure(color, self.exposure);
        Rgb(linear_to_srgb_u8(mapped))
    }

    pub fn export(&self, render: &Rgba32FImage, path: &str) {
        let img = ImageBuffer::from_fn(render.width(), render.height(), |x, y| {
            let cell = render.get_pixel(x, y).0;
            self.vec3_to_rgb(Vec3::new(cell[0], cell[1], cell[2]))
        });
        img.save(path).expect("Failed to write PNG file");
    }
}
