//! 运动驱动
//!
//! 运动学刚体直接赋值求解出的姿态；动态刚体则计算一次到位所需的目标速度，
//! 限速后按缓动强度把当前速度混合过去。松手时可选地用手部速度覆盖刚体速度。

use super::body::RigidBody;
use crate::config::MotionConfig;
use crate::xr::Pose;
use glam::{Quat, Vec3};
use std::f32::consts::{PI, TAU};

/// 从 `from` 转到 `to` 所需的角速度（弧度/秒）
///
/// 角度先折算到 (-π, π]，轴无效时返回零。
pub fn angular_velocity_between(from: Quat, to: Quat, dt: f32) -> Vec3 {
    if !(dt > 0.0) {
        return Vec3::ZERO;
    }
    let delta = (to * from.inverse()).normalize();
    let (axis, mut angle) = delta.to_axis_angle();
    if angle > PI {
        angle -= TAU;
    }
    if !axis.is_finite() || !angle.is_finite() || axis.length_squared() < 0.5 {
        return Vec3::ZERO;
    }
    axis * (angle / dt)
}

/// 限制线速度大小，角速度按同一比例缩放以保持方向
pub fn clamp_velocity(linear: Vec3, angular: Vec3, max_speed: f32) -> (Vec3, Vec3) {
    let speed = linear.length();
    if speed > max_speed && speed > 0.0 {
        let scale = max_speed / speed;
        (linear * scale, angular * scale)
    } else {
        (linear, angular)
    }
}

/// 一次驱动的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveOutcome {
    /// 驱动后的刚体线速度
    pub linear_velocity: Vec3,
    /// 驱动后的刚体角速度
    pub angular_velocity: Vec3,
    /// 本次使用的混合强度（运动学刚体为1）
    pub strength: f32,
}

/// 运动驱动器
pub struct MotionDriver<'a> {
    config: &'a MotionConfig,
}

impl<'a> MotionDriver<'a> {
    pub fn new(config: &'a MotionConfig) -> Self {
        Self { config }
    }

    /// 限速后的目标速度
    pub fn target_velocity(&self, current: &Pose, target: &Pose, dt: f32) -> (Vec3, Vec3) {
        let linear = (target.position - current.position) / dt;
        let angular = angular_velocity_between(current.orientation, target.orientation, dt);
        clamp_velocity(linear, angular, self.config.max_movement_speed)
    }

    /// 混合强度：抓取开始的第一步为1，之后由剩余距离查缓动曲线
    pub fn strength(&self, first_tick: bool, distance: f32) -> f32 {
        if first_tick {
            1.0
        } else {
            self.config.easing.sample(distance).clamp(0.0, 1.0)
        }
    }

    /// 把刚体朝目标姿态驱动一步
    pub fn drive<B: RigidBody + ?Sized>(
        &self,
        body: &mut B,
        target: &Pose,
        dt: f32,
        first_tick: bool,
    ) -> DriveOutcome {
        if !target.is_finite() {
            tracing::warn!(target: "grasp::motion", "Refusing to drive toward non-finite pose");
            return self.unchanged(body);
        }

        if body.is_kinematic() {
            body.set_pose(*target);
            return DriveOutcome {
                linear_velocity: body.linear_velocity(),
                angular_velocity: body.angular_velocity(),
                strength: 1.0,
            };
        }

        if !(dt > 0.0) {
            return self.unchanged(body);
        }

        let current = body.pose();
        let (target_linear, target_angular) = self.target_velocity(&current, target, dt);
        let strength = self.strength(first_tick, current.position.distance(target.position));

        let linear = body.linear_velocity().lerp(target_linear, strength);
        let angular = body.angular_velocity().lerp(target_angular, strength);
        body.set_linear_velocity(linear);
        body.set_angular_velocity(angular);

        DriveOutcome {
            linear_velocity: linear,
            angular_velocity: angular,
            strength,
        }
    }

    /// 松手时的抛掷速度
    pub fn throw_velocity(&self, hand_linear: Vec3, hand_angular: Vec3) -> (Vec3, Vec3) {
        (
            hand_linear * self.config.throw_velocity_power,
            hand_angular * self.config.throw_angular_power,
        )
    }

    /// 松手：开启抛掷增益时用手部速度覆盖刚体速度，返回刚体最终速度
    pub fn release<B: RigidBody + ?Sized>(
        &self,
        body: &mut B,
        hand_linear: Vec3,
        hand_angular: Vec3,
    ) -> (Vec3, Vec3) {
        if self.config.throw_boost && !body.is_kinematic() {
            let (linear, angular) = self.throw_velocity(hand_linear, hand_angular);
            if linear.is_finite() && angular.is_finite() {
                body.set_linear_velocity(linear);
                body.set_angular_velocity(angular);
            }
        }
        (body.linear_velocity(), body.angular_velocity())
    }

    fn unchanged<B: RigidBody + ?Sized>(&self, body: &B) -> DriveOutcome {
        DriveOutcome {
            linear_velocity: body.linear_velocity(),
            angular_velocity: body.angular_velocity(),
            strength: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::body::SimpleBody;
    use proptest::prelude::*;

    #[test]
    fn test_angular_velocity_wraps_short_way() {
        let from = Quat::IDENTITY;
        let to = Quat::from_rotation_y(-0.5);
        let w = angular_velocity_between(from, to, 0.5);
        assert!((w - Vec3::new(0.0, -1.0, 0.0)).length() < 1e-4);

        // 接近一整圈的旋转应走反方向的短路径
        let to = Quat::from_rotation_z(TAU - 0.2);
        let w = angular_velocity_between(from, to, 1.0);
        assert!((w - Vec3::new(0.0, 0.0, -0.2)).length() < 1e-3);
    }

    #[test]
    fn test_angular_velocity_identity_is_zero() {
        let q = Quat::from_rotation_x(0.3);
        assert!(angular_velocity_between(q, q, 0.01).length() < 1e-4);
        assert_eq!(angular_velocity_between(Quat::IDENTITY, q, 0.0), Vec3::ZERO);
    }

    #[test]
    fn test_kinematic_body_is_placed_directly() {
        let config = MotionConfig::default();
        let driver = MotionDriver::new(&config);
        let mut body = SimpleBody::kinematic(Pose::IDENTITY);
        let target = Pose::new(Vec3::new(5.0, 0.0, 0.0), Quat::from_rotation_y(1.0));

        let outcome = driver.drive(&mut body, &target, 1.0 / 90.0, false);
        assert_eq!(body.pose(), target);
        assert_eq!(outcome.strength, 1.0);
    }

    #[test]
    fn test_first_tick_uses_full_strength() {
        let config = MotionConfig::default();
        let driver = MotionDriver::new(&config);
        let mut body = SimpleBody::dynamic(Pose::IDENTITY);
        let target = Pose::from_position(Vec3::new(0.05, 0.0, 0.0));

        let outcome = driver.drive(&mut body, &target, 0.01, true);
        assert_eq!(outcome.strength, 1.0);
        assert!((body.linear_velocity - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_far_target_blends_and_clamps() {
        let config = MotionConfig::default();
        let driver = MotionDriver::new(&config);
        let mut body = SimpleBody::dynamic(Pose::IDENTITY);
        let target = Pose::from_position(Vec3::new(2.0, 0.0, 0.0));

        let outcome = driver.drive(&mut body, &target, 0.01, false);
        assert_eq!(outcome.strength, 0.2);
        // 目标速度被限到 12，再以 0.2 混合
        assert!((body.linear_velocity.x - 2.4).abs() < 1e-4);
    }

    #[test]
    fn test_release_throw_boost() {
        let mut config = MotionConfig::default();
        config.throw_velocity_power = 9.3;
        let mut body = SimpleBody::dynamic(Pose::IDENTITY);
        body.set_linear_velocity(Vec3::new(0.1, 0.0, 0.0));

        let (linear, _) =
            MotionDriver::new(&config).release(&mut body, Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO);
        assert!((linear - Vec3::new(18.6, 0.0, 0.0)).length() < 1e-4);

        config.throw_boost = false;
        let mut body = SimpleBody::dynamic(Pose::IDENTITY);
        body.set_linear_velocity(Vec3::new(0.1, 0.0, 0.0));
        let (linear, _) =
            MotionDriver::new(&config).release(&mut body, Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO);
        assert_eq!(linear, Vec3::new(0.1, 0.0, 0.0));
    }

    proptest! {
        #[test]
        fn prop_clamp_preserves_direction(
            x in -100.0f32..100.0,
            y in -100.0f32..100.0,
            z in -100.0f32..100.0,
            max_speed in 0.1f32..20.0,
        ) {
            let linear = Vec3::new(x, y, z);
            prop_assume!(linear.length() > max_speed);
            let angular = Vec3::new(z, x, y);

            let (clamped, clamped_angular) = clamp_velocity(linear, angular, max_speed);
            prop_assert!(clamped.length() <= max_speed * (1.0 + 1e-5));
            prop_assert!(clamped.normalize().dot(linear.normalize()) > 1.0 - 1e-5);
            let ratio = clamped.length() / linear.length();
            prop_assert!((clamped_angular - angular * ratio).length() <= 1e-3 * angular.length().max(1.0));
        }
    }
}
