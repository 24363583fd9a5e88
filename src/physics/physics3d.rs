use crate::impl_default;
use crate::interaction::{
    BodyId, ClosestPoint, CollisionQuery, GraspWorld, OverlapBuffer, RigidBody as GraspBody,
    VolumeId,
};
use crate::xr::Pose;
use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, UnitQuaternion};
use rapier3d::parry::shape::Ball;
use rapier3d::prelude::DefaultBroadPhase;
use rapier3d::prelude::*;

// --- Components ---

#[derive(Component, Debug, Clone, Copy)]
pub struct RigidBody3D {
    pub handle: RigidBodyHandle,
}

#[derive(Component, Debug, Clone)]
pub struct Collider3D {
    pub handles: Vec<ColliderHandle>,
}

// --- Resources ---

#[derive(Resource)]
pub struct PhysicsWorld3D {
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: Box<dyn BroadPhase>,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub query_pipeline: QueryPipeline,
}

impl_default!(PhysicsWorld3D {
    gravity: vector![0.0, -9.81, 0.0],
    integration_parameters: IntegrationParameters::default(),
    physics_pipeline: PhysicsPipeline::new(),
    island_manager: IslandManager::new(),
    broad_phase: Box::new(DefaultBroadPhase::new()),
    narrow_phase: NarrowPhase::new(),
    impulse_joint_set: ImpulseJointSet::new(),
    multibody_joint_set: MultibodyJointSet::new(),
    ccd_solver: CCDSolver::new(),
    rigid_body_set: RigidBodySet::new(),
    collider_set: ColliderSet::new(),
    query_pipeline: QueryPipeline::new(),
});

impl PhysicsWorld3D {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按模拟配置创建：重力与固定步长
    pub fn with_settings(gravity: Vec3, time_step: f32) -> Self {
        let mut world = Self::default();
        world.gravity = to_vector(gravity);
        world.integration_parameters.dt = time_step;
        world
    }

    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut *self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// 在不推进模拟的情况下刷新查询管线（新增碰撞体后使用）
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// 创建刚体
    pub fn add_body(&mut self, desc: &RigidBodyDesc3D) -> BodyId {
        let body = RigidBodyBuilder::new(desc.body_type)
            .position(to_isometry(&Pose::new(desc.position, desc.rotation)))
            .linvel(to_vector(desc.linear_velocity))
            .angvel(to_vector(desc.angular_velocity))
            .gravity_scale(if desc.use_gravity { 1.0 } else { 0.0 })
            .build();
        let handle = self.rigid_body_set.insert(body);
        tracing::debug!(target: "physics", "Added {:?} body {:?}", desc.body_type, handle);
        body_id(handle)
    }

    /// 给刚体挂一个碰撞体；刚体不存在时返回 `None`
    pub fn add_collider(&mut self, body: BodyId, desc: &ColliderDesc3D) -> Option<VolumeId> {
        let parent = body_handle(body);
        self.rigid_body_set.get(parent)?;

        let collider = ColliderBuilder::new(desc.shape.to_rapier_shape())
            .position(to_isometry(&desc.offset))
            .density(desc.density)
            .friction(desc.friction)
            .restitution(desc.restitution)
            .build();

        // 分离借用
        let PhysicsWorld3D {
            rigid_body_set,
            collider_set,
            ..
        } = self;
        let handle = collider_set.insert_with_parent(collider, parent, rigid_body_set);
        Some(volume_id(handle))
    }

    /// 删除刚体及其碰撞体
    pub fn remove_body(&mut self, body: BodyId) -> bool {
        self.rigid_body_set
            .remove(
                body_handle(body),
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    /// 刚体的全部碰撞体
    pub fn body_volumes(&self, body: BodyId) -> Vec<VolumeId> {
        self.rigid_body_set
            .get(body_handle(body))
            .map(|rb| rb.colliders().iter().map(|h| volume_id(*h)).collect())
            .unwrap_or_default()
    }

    /// 刚体原点到其碰撞体包围盒最远顶点的距离
    pub fn bounding_radius(&self, body: BodyId) -> Option<f32> {
        let rb = self.rigid_body_set.get(body_handle(body))?;
        let origin = Point::from(*rb.translation());
        rb.colliders()
            .iter()
            .filter_map(|h| self.collider_set.get(*h))
            .flat_map(|collider| collider.compute_aabb().vertices())
            .map(|vertex| na_distance(&origin, &vertex))
            .reduce(f32::max)
    }

    pub fn body_pose(&self, body: BodyId) -> Option<Pose> {
        self.rigid_body_set
            .get(body_handle(body))
            .map(|rb| GraspBody::pose(rb))
    }
}

impl CollisionQuery for PhysicsWorld3D {
    fn overlap_sphere(&self, center: Vec3, radius: f32, out: &mut OverlapBuffer) -> usize {
        let ball = Ball::new(radius);
        let position = Isometry::translation(center.x, center.y, center.z);
        self.query_pipeline.intersections_with_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &position,
            &ball,
            QueryFilter::default(),
            |handle| out.push(volume_id(handle)),
        );
        out.len()
    }

    fn closest_point(&self, volumes: &[VolumeId], point: Vec3) -> Option<ClosestPoint> {
        let query = point![point.x, point.y, point.z];
        let mut best: Option<ClosestPoint> = None;
        for volume in volumes {
            let Some(collider) = self.collider_set.get(collider_handle(*volume)) else {
                continue;
            };
            let projection = collider
                .shape()
                .project_point(collider.position(), &query, true);
            let candidate = ClosestPoint {
                point: Vec3::new(projection.point.x, projection.point.y, projection.point.z),
                is_inside: projection.is_inside,
            };
            if candidate.is_inside {
                return Some(candidate);
            }
            let closer = best.map_or(true, |b| candidate.distance_from(point) < b.distance_from(point));
            if closer {
                best = Some(candidate);
            }
        }
        best
    }
}

impl GraspWorld for PhysicsWorld3D {
    type Body = RigidBody;

    fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.rigid_body_set.get(body_handle(id))
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.rigid_body_set.get_mut(body_handle(id))
    }
}

/// Rapier 刚体：运动学刚体走下一步目标姿态，重力开关映射到重力缩放
impl GraspBody for RigidBody {
    fn position(&self) -> Vec3 {
        let t = self.translation();
        Vec3::new(t.x, t.y, t.z)
    }

    fn rotation(&self) -> Quat {
        to_quat(RigidBody::rotation(self))
    }

    fn set_position(&mut self, position: Vec3) {
        if RigidBody::is_kinematic(self) {
            self.set_next_kinematic_translation(to_vector(position));
        } else {
            self.set_translation(to_vector(position), true);
        }
    }

    fn set_rotation(&mut self, rotation: Quat) {
        if RigidBody::is_kinematic(self) {
            self.set_next_kinematic_rotation(to_rotation(rotation));
        } else {
            RigidBody::set_rotation(self, to_rotation(rotation), true);
        }
    }

    fn linear_velocity(&self) -> Vec3 {
        let v = self.linvel();
        Vec3::new(v.x, v.y, v.z)
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.set_linvel(to_vector(velocity), true);
    }

    fn angular_velocity(&self) -> Vec3 {
        let w = self.angvel();
        Vec3::new(w.x, w.y, w.z)
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.set_angvel(to_vector(velocity), true);
    }

    fn is_kinematic(&self) -> bool {
        RigidBody::is_kinematic(self)
    }

    fn use_gravity(&self) -> bool {
        self.gravity_scale() != 0.0
    }

    fn set_use_gravity(&mut self, enabled: bool) {
        self.set_gravity_scale(if enabled { 1.0 } else { 0.0 }, true);
    }
}

// --- Conversions ---

pub fn body_id(handle: RigidBodyHandle) -> BodyId {
    let (index, generation) = handle.into_raw_parts();
    BodyId(pack(index, generation))
}

pub fn body_handle(id: BodyId) -> RigidBodyHandle {
    let (index, generation) = unpack(id.0);
    RigidBodyHandle::from_raw_parts(index, generation)
}

pub fn volume_id(handle: ColliderHandle) -> VolumeId {
    let (index, generation) = handle.into_raw_parts();
    VolumeId(pack(index, generation))
}

pub fn collider_handle(id: VolumeId) -> ColliderHandle {
    let (index, generation) = unpack(id.0);
    ColliderHandle::from_raw_parts(index, generation)
}

fn pack(index: u32, generation: u32) -> u64 {
    (u64::from(generation) << 32) | u64::from(index)
}

fn unpack(raw: u64) -> (u32, u32) {
    ((raw & 0xffff_ffff) as u32, (raw >> 32) as u32)
}

fn to_vector(v: Vec3) -> Vector<Real> {
    vector![v.x, v.y, v.z]
}

fn to_rotation(q: Quat) -> Rotation<Real> {
    UnitQuaternion::new_normalize(Quaternion::new(q.w, q.x, q.y, q.z))
}

fn to_quat(rot: &Rotation<Real>) -> Quat {
    Quat::from_xyzw(rot.i, rot.j, rot.k, rot.w)
}

fn to_isometry(pose: &Pose) -> Isometry<Real> {
    Isometry::from_parts(
        Translation::new(pose.position.x, pose.position.y, pose.position.z),
        to_rotation(pose.orientation),
    )
}

fn na_distance(a: &Point<Real>, b: &Point<Real>) -> f32 {
    (b - a).norm()
}

// --- Builders ---

#[derive(Component, Debug, Clone)]
pub struct RigidBodyDesc3D {
    pub body_type: RigidBodyType,
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub use_gravity: bool,
}

impl_default!(RigidBodyDesc3D {
    body_type: RigidBodyType::Dynamic,
    position: Vec3::ZERO,
    rotation: Quat::IDENTITY,
    linear_velocity: Vec3::ZERO,
    angular_velocity: Vec3::ZERO,
    use_gravity: true,
});

impl RigidBodyDesc3D {
    pub fn dynamic(pose: Pose) -> Self {
        Self {
            position: pose.position,
            rotation: pose.orientation,
            ..Default::default()
        }
    }

    pub fn kinematic(pose: Pose) -> Self {
        Self {
            body_type: RigidBodyType::KinematicPositionBased,
            position: pose.position,
            rotation: pose.orientation,
            use_gravity: false,
            ..Default::default()
        }
    }

    pub fn fixed(pose: Pose) -> Self {
        Self {
            body_type: RigidBodyType::Fixed,
            position: pose.position,
            rotation: pose.orientation,
            use_gravity: false,
            ..Default::default()
        }
    }
}

#[derive(Component, Debug, Clone)]
pub struct ColliderDesc3D {
    pub shape: Shape3D,
    /// 相对刚体的局部姿态
    pub offset: Pose,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl_default!(ColliderDesc3D {
    shape: Shape3D::Cuboid(Vec3::splat(0.5)),
    offset: Pose::IDENTITY,
    density: 1.0,
    friction: 0.5,
    restitution: 0.0,
});

impl ColliderDesc3D {
    pub fn new(shape: Shape3D) -> Self {
        Self {
            shape,
            ..Default::default()
        }
    }

    pub fn with_offset(mut self, offset: Pose) -> Self {
        self.offset = offset;
        self
    }
}

#[derive(Debug, Clone)]
pub enum Shape3D {
    /// 半尺寸
    Cuboid(Vec3),
    Ball(f32),
    Capsule(f32, f32),
    Cylinder(f32, f32),
}

impl Shape3D {
    pub fn to_rapier_shape(&self) -> SharedShape {
        match self {
            Shape3D::Cuboid(half_extents) => {
                SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            Shape3D::Ball(radius) => SharedShape::ball(*radius),
            Shape3D::Capsule(half_height, radius) => SharedShape::capsule_y(*half_height, *radius),
            Shape3D::Cylinder(half_height, radius) => SharedShape::cylinder(*half_height, *radius),
        }
    }
}
