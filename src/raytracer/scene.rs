use crate::raytracer::ray::{HitData, Ray};
use crate::raytracer::renderer::SceneAccess;
use glam::Vec3;

#[derive(Clone, Copy)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub albedo: Vec3,
    pub emission: Vec3,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, albedo: Vec3) -> Self {
        Self {
            center,
            radius,
            albedo,
            emission: Vec3::ZERO,
        }
    }

    pub fn emissive(mut self, emission: Vec3) -> Self {
        self.emission = emission;
        self
    }

    fn intersect(&self, ray: &Ray) -> Option<f32> {
        let oc = ray.origin - self.center;
        let b = oc.dot(ray.direction);
        let c = oc.length_squared() - self.radius * self.radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();
        let t0 = -b - sqrt_disc;
        if t0 > ray.t_min && t0 < ray.t_max {
            return Some(t0);
        }
        let t1 = -b + sqrt_disc;
        if t1 > ray.t_min && t1 < ray.t_max {
            return Some(t1);
        }
        None
    }
}

/// Gradient environment between a horizon and a zenith color.
#[derive(Clone, Copy)]
pub struct Sky {
    pub horizon: Vec3,
    pub zenith: Vec3,
}

impl Sky {
    fn radiance(&self, direction: Vec3) -> Vec3 {
        let t = 0.5 * (direction.y + 1.0);
        self.horizon.lerp(self.zenith, t)
    }
}

/// Analytic sphere scene used by the demo binary and the integration tests.
pub struct SphereScene {
    spheres: Vec<Sphere>,
    sky: Option<Sky>,
}

impl SphereScene {
    pub fn new(spheres: Vec<Sphere>, sky: Option<Sky>) -> Self {
        Self { spheres, sky }
    }

    /// A few diffuse spheres over a ground sphere, plus one emitter.
    pub fn demo() -> Self {
        let spheres = vec![
            Sphere::new(Vec3::new(0.0, -1000.0, 0.0), 1000.0, Vec3::splat(0.6)),
            Sphere::new(Vec3::new(0.0, 1.0, 0.0), 1.0, Vec3::new(0.8, 0.3, 0.25)),
            Sphere::new(Vec3::new(-2.2, 0.7, 0.6), 0.7, Vec3::new(0.3, 0.5, 0.85)),
            Sphere::new(Vec3::new(1.9, 0.55, 0.8), 0.55, Vec3::new(0.85, 0.75, 0.3)),
            Sphere::new(Vec3::new(-0.6, 0.35, 1.9), 0.35, Vec3::splat(0.9))
                .emissive(Vec3::new(6.0, 5.5, 5.0)),
        ];
        let sky = Sky {
            horizon: Vec3::new(0.9, 0.95, 1.0),
            zenith: Vec3::new(0.35, 0.55, 0.9),
        };
        Self::new(spheres, Some(sky))
    }
}

impl SceneAccess for SphereScene {
    fn hit(&self, ray: &Ray) -> Option<HitData> {
        let mut closest: Option<(f32, &Sphere)> = None;
        for sphere in &self.spheres {
            if let Some(t) = sphere.intersect(ray) {
                if closest.map_or(true, |(best, _)| t < best) {
                    closest = Some((t, sphere));
                }
            }
        }
        closest.map(|(t, sphere)| {
            let point = ray.at(t);
            HitData {
                t,
                point,
                normal: (point - sphere.center) / sphere.radius,
                albedo: sphere.albedo,
                emission: sphere.emission,
            }
        })
    }

    fn sample_sky(&self, direction: Vec3) -> Vec3 {
        match self.sky {
            Some(sky) => sky.radiance(direction),
            None => Vec3::ZERO,
        }
    }

    fn has_environments(&self) -> bool {
        self.sky.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hits_closest_sphere() {
        let scene = SphereScene::new(
            vec![
                Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0, Vec3::X),
                Sphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0, Vec3::Y),
            ],
            None,
        );
        let hit = scene
            .hit(&Ray::new(Vec3::ZERO, Vec3::NEG_Z))
            .expect("should hit");
        assert!((hit.t - 4.0).abs() < 1e-4);
        assert_eq!(hit.albedo, Vec3::X);
        assert!((hit.normal - Vec3::Z).length() < 1e-4);
    }

    #[test]
    fn miss_reports_sky_or_black() {
        let sky = Sky {
            horizon: Vec3::ONE,
            zenith: Vec3::ZERO,
        };
        let lit = SphereScene::new(Vec::new(), Some(sky));
        let dark = SphereScene::new(Vec::new(), None);

        assert!(lit.has_environments());
        assert!(lit.sample_sky(Vec3::Y).length() >= 0.0);
        assert!(!dark.has_environments());
        assert_eq!(dark.sample_sky(Vec3::Y), Vec3::ZERO);
    }
}
