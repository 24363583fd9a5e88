//! 测试用的内存球体世界

use super::body::{BodyId, GraspWorld, SimpleBody};
use super::collision::{ClosestPoint, CollisionQuery, OverlapBuffer, VolumeId};
use glam::Vec3;
use std::collections::BTreeMap;

struct Sphere {
    id: VolumeId,
    center: Vec3,
    radius: f32,
    body: Option<BodyId>,
}

/// 只有球形碰撞体的世界；挂在刚体上的球随刚体位置移动
#[derive(Default)]
pub struct SphereWorld {
    spheres: Vec<Sphere>,
    pub bodies: BTreeMap<BodyId, SimpleBody>,
}

impl SphereWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sphere(&mut self, id: VolumeId, center: Vec3, radius: f32) {
        self.spheres.push(Sphere {
            id,
            center,
            radius,
            body: None,
        });
    }

    /// 添加刚体，并以刚体中心挂一个球
    pub fn add_body(&mut self, id: BodyId, body: SimpleBody, volume: VolumeId, radius: f32) {
        self.spheres.push(Sphere {
            id: volume,
            center: Vec3::ZERO,
            radius,
            body: Some(id),
        });
        self.bodies.insert(id, body);
    }

    pub fn step(&mut self, dt: f32, gravity: Vec3) {
        for body in self.bodies.values_mut() {
            body.integrate(dt, gravity);
        }
    }

    fn center_of(&self, sphere: &Sphere) -> Vec3 {
        match sphere.body.and_then(|id| self.bodies.get(&id)) {
            Some(body) => body.position + sphere.center,
            None => sphere.center,
        }
    }
}

impl CollisionQuery for SphereWorld {
    fn overlap_sphere(&self, center: Vec3, radius: f32, out: &mut OverlapBuffer) -> usize {
        for sphere in &self.spheres {
            if self.center_of(sphere).distance(center) <= sphere.radius + radius && !out.push(sphere.id)
            {
                break;
            }
        }
        out.len()
    }

    fn closest_point(&self, volumes: &[VolumeId], point: Vec3) -> Option<ClosestPoint> {
        self.spheres
            .iter()
            .filter(|s| volumes.contains(&s.id))
            .map(|s| {
                let center = self.center_of(s);
                let offset = point - center;
                if offset.length() <= s.radius {
                    ClosestPoint {
                        point,
                        is_inside: true,
                    }
                } else {
                    ClosestPoint {
                        point: center + offset.normalize() * s.radius,
                        is_inside: false,
                    }
                }
            })
            .min_by(|a, b| a.distance_from(point).total_cmp(&b.distance_from(point)))
    }
}

impl GraspWorld for SphereWorld {
    type Body = SimpleBody;

    fn body(&self, id: BodyId) -> Option<&SimpleBody> {
        self.bodies.get(&id)
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut SimpleBody> {
        self.bodies.get_mut(&id)
    }
}
