// ============================================================================
// XR 基础类型
// 姿态、手部侧别与追踪数据源错误
// ============================================================================

use crate::impl_default;
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 刚性姿态（位置 + 朝向）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl_default!(Pose {
    position: Vec3::ZERO,
    orientation: Quat::IDENTITY,
});

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    pub fn inverse(&self) -> Self {
        let inv_orientation = self.orientation.inverse();
        Self {
            position: inv_orientation * (-self.position),
            orientation: inv_orientation,
        }
    }

    /// 局部点 -> 世界点
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation * local
    }

    /// 世界点 -> 局部点
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.orientation.inverse() * (world - self.position)
    }

    /// 组合姿态：先应用 `local`，再应用 `self`
    pub fn mul_pose(&self, local: &Pose) -> Pose {
        Pose {
            position: self.transform_point(local.position),
            orientation: (self.orientation * local.orientation).normalize(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }
}

/// 局部点 -> 世界点
pub fn local_to_world(pose: &Pose, point: Vec3) -> Vec3 {
    pose.transform_point(point)
}

/// 世界点 -> 局部点
pub fn world_to_local(pose: &Pose, point: Vec3) -> Vec3 {
    pose.inverse_transform_point(point)
}

/// 手部侧别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    /// 作为 `[T; 2]` 下标
    pub fn index(self) -> usize {
        match self {
            Hand::Left => 0,
            Hand::Right => 1,
        }
    }

    pub fn other(self) -> Hand {
        match self {
            Hand::Left => Hand::Right,
            Hand::Right => Hand::Left,
        }
    }
}

/// XR 错误
#[derive(Error, Debug)]
pub enum XrError {
    #[error("XR not supported")]
    NotSupported,
    #[error("XR session not ready")]
    SessionNotReady,
    #[error("Hand joint data incomplete: expected {expected}, got {actual}")]
    IncompleteJoints { expected: usize, actual: usize },
    #[error("XR runtime failure: {0}")]
    RuntimeFailure(String),
}

// XR 手部追踪
pub mod hand_tracking;
pub use hand_tracking::{
    joints_from_openxr, HandJoint, HandJointType, HandJoints, HandTracker, HAND_JOINT_COUNT,
};
