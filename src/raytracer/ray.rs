use glam::Vec3;

pub const RAY_EPSILON: f32 = 0.001;

#[derive(Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub t_min: f32,
    pub t_max: f32,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Ray {
            origin,
            direction,
            t_min: RAY_EPSILON,
            t_max: f32::INFINITY,
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

pub struct HitData {
    pub t: f32,
    pub point: Vec3,
    pub normal: Vec3,
    pub albedo: Vec3,
    pub emission: Vec3,
}
