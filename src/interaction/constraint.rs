//! 姿态约束
//!
//! 求解出的目标姿态在交给运动驱动之前经过约束过滤。约束是纯函数 pose -> pose，
//! 闭包也可以直接作为约束使用。

use crate::xr::Pose;
use glam::{Quat, Vec3};

/// 姿态约束
pub trait Constraint: Send + Sync {
    fn apply(&self, pose: Pose) -> Pose;
}

impl<F> Constraint for F
where
    F: Fn(Pose) -> Pose + Send + Sync,
{
    fn apply(&self, pose: Pose) -> Pose {
        self(pose)
    }
}

/// 线性导轨：位置投影到有限线段上，朝向锁定
#[derive(Debug, Clone, Copy)]
pub struct LinearRailConstraint {
    pub origin: Vec3,
    /// 单位方向
    pub direction: Vec3,
    pub min: f32,
    pub max: f32,
    pub rotation: Quat,
}

impl LinearRailConstraint {
    pub fn new(origin: Vec3, direction: Vec3, limits: (f32, f32), rotation: Quat) -> Self {
        let (min, max) = if limits.0 <= limits.1 {
            limits
        } else {
            (limits.1, limits.0)
        };
        Self {
            origin,
            direction: direction.try_normalize().unwrap_or(Vec3::X),
            min,
            max,
            rotation,
        }
    }
}

impl Constraint for LinearRailConstraint {
    fn apply(&self, pose: Pose) -> Pose {
        let t = (pose.position - self.origin)
            .dot(self.direction)
            .clamp(self.min, self.max);
        Pose::new(self.origin + self.direction * t, self.rotation)
    }
}

/// 铰链：位置钉在支点，朝向只保留绕轴的扭转分量
#[derive(Debug, Clone, Copy)]
pub struct HingeConstraint {
    pub pivot: Vec3,
    /// 单位转轴（世界空间）
    pub axis: Vec3,
    /// 扭转角为0时的朝向
    pub rest: Quat,
    /// 扭转角范围（弧度）
    pub limits: Option<(f32, f32)>,
}

impl HingeConstraint {
    pub fn new(pivot: Vec3, axis: Vec3, rest: Quat) -> Self {
        Self {
            pivot,
            axis: axis.try_normalize().unwrap_or(Vec3::Y),
            rest,
            limits: None,
        }
    }

    pub fn with_limits(mut self, min: f32, max: f32) -> Self {
        self.limits = Some((min.min(max), min.max(max)));
        self
    }

    /// 相对静止朝向绕轴的扭转角，范围 (-π, π]
    pub fn twist_angle(&self, orientation: Quat) -> f32 {
        let relative = (orientation * self.rest.inverse()).normalize();
        let projection = Vec3::new(relative.x, relative.y, relative.z).dot(self.axis);
        let angle = 2.0 * projection.atan2(relative.w);
        wrap_angle(angle)
    }
}

impl Constraint for HingeConstraint {
    fn apply(&self, pose: Pose) -> Pose {
        let mut angle = self.twist_angle(pose.orientation);
        if let Some((min, max)) = self.limits {
            angle = angle.clamp(min, max);
        }
        let orientation = (Quat::from_axis_angle(self.axis, angle) * self.rest).normalize();
        Pose::new(self.pivot, orientation)
    }
}

fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_constraint() {
        let floor = |mut pose: Pose| {
            pose.position.y = pose.position.y.max(0.0);
            pose
        };
        let pose = floor.apply(Pose::from_position(Vec3::new(1.0, -2.0, 0.0)));
        assert_eq!(pose.position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_linear_rail_projects_and_clamps() {
        let rail = LinearRailConstraint::new(Vec3::ZERO, Vec3::X * 2.0, (0.0, 1.0), Quat::IDENTITY);
        let pose = Pose::new(Vec3::new(0.5, 3.0, -1.0), Quat::from_rotation_z(1.0));
        let constrained = rail.apply(pose);
        assert_eq!(constrained.position, Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(constrained.orientation, Quat::IDENTITY);

        let far = rail.apply(Pose::from_position(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(far.position, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_hinge_keeps_only_twist() {
        let hinge = HingeConstraint::new(Vec3::new(0.0, 1.0, 0.0), Vec3::Y, Quat::IDENTITY);
        let pose = Pose::new(
            Vec3::new(3.0, 3.0, 3.0),
            Quat::from_rotation_y(0.6) * Quat::from_rotation_x(0.3),
        );
        let constrained = hinge.apply(pose);
        assert_eq!(constrained.position, Vec3::new(0.0, 1.0, 0.0));
        assert!((hinge.twist_angle(constrained.orientation) - 0.6).abs() < 1e-3);
        // 扭转之外的摆动分量被去掉
        let forward = constrained.orientation * Vec3::Z;
        assert!(forward.y.abs() < 1e-5);
    }

    #[test]
    fn test_hinge_limits() {
        let hinge = HingeConstraint::new(Vec3::ZERO, Vec3::Y, Quat::IDENTITY).with_limits(-0.5, 0.5);
        let constrained = hinge.apply(Pose::new(Vec3::ZERO, Quat::from_rotation_y(1.2)));
        assert!((hinge.twist_angle(constrained.orientation) - 0.5).abs() < 1e-4);
    }
}
