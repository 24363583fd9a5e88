//! 刚体接口
//!
//! 运动驱动只依赖 [`RigidBody`]，不依赖具体物理引擎。
//! Rapier 后端见 `crate::physics`；[`SimpleBody`] 是不做碰撞的纯积分实现，
//! 用于无物理场景和测试。

use super::collision::CollisionQuery;
use crate::xr::Pose;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// 刚体ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u64);

/// 被抓取对象的刚体
pub trait RigidBody {
    fn position(&self) -> Vec3;
    fn rotation(&self) -> Quat;
    fn set_position(&mut self, position: Vec3);
    fn set_rotation(&mut self, rotation: Quat);

    fn linear_velocity(&self) -> Vec3;
    fn set_linear_velocity(&mut self, velocity: Vec3);
    fn angular_velocity(&self) -> Vec3;
    fn set_angular_velocity(&mut self, velocity: Vec3);

    /// 运动学刚体：姿态直接赋值，不受力
    fn is_kinematic(&self) -> bool;
    fn use_gravity(&self) -> bool;
    fn set_use_gravity(&mut self, enabled: bool);

    fn pose(&self) -> Pose {
        Pose::new(self.position(), self.rotation())
    }

    fn set_pose(&mut self, pose: Pose) {
        self.set_position(pose.position);
        self.set_rotation(pose.orientation);
    }
}

/// 抓取引擎看到的物理世界：碰撞查询 + 按ID访问刚体
pub trait GraspWorld: CollisionQuery {
    type Body: RigidBody;

    fn body(&self, id: BodyId) -> Option<&Self::Body>;
    fn body_mut(&mut self, id: BodyId) -> Option<&mut Self::Body>;
}

/// 纯积分刚体
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleBody {
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub kinematic: bool,
    pub gravity: bool,
}

impl SimpleBody {
    /// 创建受重力影响的动态刚体
    pub fn dynamic(pose: Pose) -> Self {
        Self {
            position: pose.position,
            rotation: pose.orientation,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            kinematic: false,
            gravity: true,
        }
    }

    /// 创建运动学刚体
    pub fn kinematic(pose: Pose) -> Self {
        Self {
            kinematic: true,
            gravity: false,
            ..Self::dynamic(pose)
        }
    }

    /// 显式欧拉积分一步；运动学刚体不积分
    pub fn integrate(&mut self, dt: f32, gravity: Vec3) {
        if self.kinematic {
            return;
        }
        if self.gravity {
            self.linear_velocity += gravity * dt;
        }
        self.position += self.linear_velocity * dt;

        let spin = self.angular_velocity * dt;
        let angle = spin.length();
        if angle > f32::EPSILON {
            let delta = Quat::from_axis_angle(spin / angle, angle);
            self.rotation = (delta * self.rotation).normalize();
        }
    }
}

impl RigidBody for SimpleBody {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn rotation(&self) -> Quat {
        self.rotation
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.linear_velocity = velocity;
    }

    fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.angular_velocity = velocity;
    }

    fn is_kinematic(&self) -> bool {
        self.kinematic
    }

    fn use_gravity(&self) -> bool {
        self.gravity
    }

    fn set_use_gravity(&mut self, enabled: bool) {
        self.gravity = enabled;
    }
}
