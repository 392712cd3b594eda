//! Ray picking against scene geometry

use nalgebra::{Point3, Vector3};

use crate::geometry::{Aabb, Triangle};
use crate::projection::Camera;
use crate::scene::{ActorId, Scene};

const EPSILON: f32 = 1e-7;

/// A ray in 3D space defined by an origin and a unit direction
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    pub fn point_at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Slab test; entry distance if the ray touches the box in front of its origin
    pub fn intersect_aabb(&self, aabb: &Aabb) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let origin = self.origin[axis];
            let direction = self.direction[axis];
            let (lo, hi) = (aabb.min[axis], aabb.max[axis]);

            if direction.abs() < EPSILON {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / direction;
            let (t0, t1) = {
                let a = (lo - origin) * inv;
                let b = (hi - origin) * inv;
                if a < b { (a, b) } else { (b, a) }
            };
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        if t_max < 0.0 {
            return None;
        }
        Some(t_min.max(0.0))
    }

    /// Two-sided Möller–Trumbore; distance along the ray on hit
    pub fn intersect_triangle(&self, triangle: &Triangle) -> Option<f32> {
        let v0 = triangle.vertices[0].position;
        let v1 = triangle.vertices[1].position;
        let v2 = triangle.vertices[2].position;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let h = self.direction.cross(&edge2);
        let a = edge1.dot(&h);
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = self.origin - v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * self.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        (t > EPSILON).then_some(t)
    }
}

/// Nearest actor hit by a pick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub actor: ActorId,
    pub distance: f32,
    pub point: Point3<f32>,
}

/// Nearest actor along `ray`
pub fn pick_ray(scene: &Scene, ray: &Ray) -> Option<PickHit> {
    let mut best: Option<PickHit> = None;

    for actor in scene.actors() {
        let Some(bounds) = actor.bounds() else {
            continue;
        };
        match (ray.intersect_aabb(&bounds), best) {
            (None, _) => continue,
            (Some(entry), Some(hit)) if entry > hit.distance => continue,
            _ => {}
        }

        for triangle in &actor.mesh().triangles {
            if let Some(t) = ray.intersect_triangle(triangle) {
                if best.map_or(true, |hit| t < hit.distance) {
                    best = Some(PickHit {
                        actor: actor.id(),
                        distance: t,
                        point: ray.point_at(t),
                    });
                }
            }
        }
    }

    best
}

/// Pick at screen position `(x, y)` in a `width` x `height` surface.
/// Integer cell coordinates address the cell's center.
pub fn pick_screen(
    scene: &Scene,
    camera: &Camera,
    x: f32,
    y: f32,
    width: u32,
    height: u32,
) -> Option<PickHit> {
    if width == 0 || height == 0 {
        return None;
    }
    let ray = camera.screen_ray(x + 0.5, y + 0.5, width, height)?;
    pick_ray(scene, &ray)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::geometry::Mesh;
    use crate::representation::Representation;
    use crate::scene::ActorStyle;
    use std::sync::Arc;

    fn style() -> ActorStyle {
        ActorStyle {
            representation: Representation::Surface,
            color: Rgb::WHITE,
        }
    }

    #[test]
    fn aabb_hit_and_miss() {
        let aabb = Mesh::cube(2.0).bounds().unwrap();
        let toward = Ray::new(Point3::new(0.0, 0.0, 5.0), -Vector3::z());
        assert!((toward.intersect_aabb(&aabb).unwrap() - 4.0).abs() < 1e-5);

        let away = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::z());
        assert!(away.intersect_aabb(&aabb).is_none());

        let beside = Ray::new(Point3::new(3.0, 0.0, 5.0), -Vector3::z());
        assert!(beside.intersect_aabb(&aabb).is_none());
    }

    #[test]
    fn front_actor_wins() {
        let mut scene = Scene::new();
        let back = scene.add_actor(Arc::new(Mesh::cube(2.0)), style());
        let front = scene.add_actor(
            Arc::new(Mesh::cube(2.0).translated(Vector3::new(0.0, 0.0, 3.0))),
            style(),
        );

        let ray = Ray::new(Point3::new(0.0, 0.0, 10.0), -Vector3::z());
        let hit = pick_ray(&scene, &ray).unwrap();
        assert_eq!(hit.actor, front);
        assert!((hit.distance - 6.0).abs() < 1e-4);

        let from_behind = Ray::new(Point3::new(0.0, 0.0, -10.0), Vector3::z());
        assert_eq!(pick_ray(&scene, &from_behind).unwrap().actor, back);
    }

    #[test]
    fn screen_pick_center_and_corner() {
        let mut scene = Scene::new();
        let id = scene.add_actor(Arc::new(Mesh::cube(2.0)), style());
        let mut camera = Camera::new(60, 30, 2.0);
        camera.fit_to_bounds(&scene.bounds().unwrap());

        assert_eq!(pick_screen(&scene, &camera, 30.0, 15.0, 60, 30).map(|h| h.actor), Some(id));
        assert!(pick_screen(&scene, &camera, 0.0, 0.0, 60, 30).is_none());
    }

    #[test]
    fn empty_scene_picks_nothing() {
        let camera = Camera::default();
        assert!(pick_screen(&Scene::new(), &camera, 400.0, 300.0, 800, 600).is_none());
    }
}
