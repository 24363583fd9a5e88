//! 多手姿态求解
//!
//! 把所有正在抓取的手合成为一个目标姿态：
//! - 平均法（默认）：每只手给出一个对象位置与朝向，位置取平均，
//!   前向/上向基向量取平均后重新正交化
//! - 刚性拟合：对起始星座与实时星座做 Kabsch 拟合，输入退化时回退到平均法

use super::hand::HandPoseSource;
use super::kabsch::{fit_rigid, FitError};
use super::state::{live_constellation, Constellation, GraspState, CONSTELLATION_SIZE};
use super::PoseSolveMethod;
use crate::xr::{local_to_world, Hand, Pose};
use glam::{Mat3, Quat, Vec3};

/// 一只抓取手对求解的输入
#[derive(Debug, Clone, Copy)]
pub struct HandContribution {
    pub hand: Hand,
    pub palm: Pose,
    /// 实时抓取中心（世界空间）
    pub live_center: Vec3,
    pub position_offset: Vec3,
    pub rotation_offset: Quat,
    /// 对象局部空间
    pub start_constellation: Constellation,
    /// 世界空间
    pub live_constellation: Constellation,
}

impl HandContribution {
    pub fn from_state<H: HandPoseSource + ?Sized>(
        hand: Hand,
        state: &GraspState,
        hands: &H,
        palm_normal_offset: f32,
    ) -> Self {
        let palm = hands.palm_pose(hand);
        Self {
            hand,
            palm,
            live_center: state.live_grasp_center(&palm),
            position_offset: state.grasp_position_offset(),
            rotation_offset: state.grasp_rotation_offset(),
            start_constellation: *state.start_constellation(),
            live_constellation: live_constellation(hands, hand, palm_normal_offset),
        }
    }

    /// 这只手单独给出的对象位置
    pub fn position(&self, object_pose: &Pose) -> Vec3 {
        self.live_center - local_to_world(object_pose, self.position_offset) + object_pose.position
    }

    /// 这只手单独给出的对象朝向
    pub fn rotation(&self) -> Quat {
        (self.palm.orientation * self.rotation_offset).normalize()
    }
}

/// 由前向与上向构造朝向（+Z 为前，+Y 为上），两者平行时返回 `None`
pub fn look_rotation(forward: Vec3, up: Vec3) -> Option<Quat> {
    let forward = forward.try_normalize()?;
    let right = up.cross(forward).try_normalize()?;
    let up = forward.cross(right);
    let rotation = Quat::from_mat3(&Mat3::from_cols(right, up, forward)).normalize();
    rotation.is_finite().then_some(rotation)
}

/// 平均法
pub fn solve_average(object_pose: &Pose, contributions: &[HandContribution]) -> Option<Pose> {
    let first = contributions.first()?;
    let count = contributions.len() as f32;

    let mut position = Vec3::ZERO;
    let mut forward = Vec3::ZERO;
    let mut up = Vec3::ZERO;
    for contribution in contributions {
        position += contribution.position(object_pose);
        let rotation = contribution.rotation();
        forward += rotation * Vec3::Z;
        up += rotation * Vec3::Y;
    }

    let orientation = if contributions.len() == 1 {
        first.rotation()
    } else {
        look_rotation(forward, up).unwrap_or_else(|| first.rotation())
    };

    Some(Pose::new(position / count, orientation))
}

/// 刚性拟合：起始星座（对象局部）-> 实时星座（世界），拟合结果即对象姿态
pub fn solve_rigid_fit(contributions: &[HandContribution]) -> Result<Pose, FitError> {
    let mut source = [Vec3::ZERO; CONSTELLATION_SIZE * 2];
    let mut target = [Vec3::ZERO; CONSTELLATION_SIZE * 2];
    let mut len = 0;
    for contribution in contributions.iter().take(2) {
        for i in 0..CONSTELLATION_SIZE {
            source[len] = contribution.start_constellation[i];
            target[len] = contribution.live_constellation[i];
            len += 1;
        }
    }

    let fit = fit_rigid(&source[..len], &target[..len])?;
    Ok(Pose::new(fit.translation, fit.rotation))
}

/// 姿态求解器
#[derive(Debug, Clone, Copy)]
pub struct GraspPoseSolver {
    method: PoseSolveMethod,
}

impl GraspPoseSolver {
    pub fn new(method: PoseSolveMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> PoseSolveMethod {
        self.method
    }

    /// 求解目标姿态；没有抓取手时返回 `None`，由调用方保持当前姿态
    pub fn solve(&self, object_pose: &Pose, contributions: &[HandContribution]) -> Option<Pose> {
        if contributions.is_empty() {
            return None;
        }

        match self.method {
            PoseSolveMethod::Average => solve_average(object_pose, contributions),
            PoseSolveMethod::RigidFit => match solve_rigid_fit(contributions) {
                Ok(pose) => Some(pose),
                Err(err) => {
                    tracing::debug!(
                        target: "grasp::solver",
                        "Rigid fit unavailable ({}), averaging instead",
                        err
                    );
                    solve_average(object_pose, contributions)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xr::world_to_local;
    use std::f32::consts::FRAC_PI_2;

    fn contribution(palm: Pose, center: Vec3, object_pose: &Pose) -> HandContribution {
        let live = [
            palm.transform_point(Vec3::new(-0.02, 0.0, 0.0)),
            palm.transform_point(Vec3::new(-0.03, 0.0, -0.05)),
            palm.transform_point(Vec3::new(0.04, 0.0, -0.05)),
            palm.transform_point(Vec3::new(0.0, 0.0, -0.08)),
            palm.transform_point(Vec3::new(0.0, -0.05, 0.0)),
        ];
        HandContribution {
            hand: Hand::Left,
            palm,
            live_center: center,
            position_offset: world_to_local(object_pose, center),
            rotation_offset: (palm.orientation.inverse() * object_pose.orientation).normalize(),
            start_constellation: live.map(|p| world_to_local(object_pose, p)),
            live_constellation: live,
        }
    }

    #[test]
    fn test_look_rotation_identity() {
        let q = look_rotation(Vec3::Z, Vec3::Y).unwrap();
        assert!((q * Vec3::X - Vec3::X).length() < 1e-5);
        assert!(look_rotation(Vec3::Y, Vec3::Y).is_none());
    }

    #[test]
    fn test_single_hand_at_start_returns_object_pose() {
        let object = Pose::new(Vec3::new(0.0, 1.0, 0.5), Quat::from_rotation_y(0.4));
        let palm = Pose::new(Vec3::new(0.0, 1.0, 0.4), Quat::from_rotation_x(0.2));
        let c = contribution(palm, Vec3::new(0.01, 1.0, 0.48), &object);

        let solved = solve_average(&object, &[c]).unwrap();
        assert!((solved.position - object.position).length() < 1e-5);
        assert!((solved.orientation.dot(object.orientation).abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hand_translation_moves_target() {
        let object = Pose::from_position(Vec3::new(0.0, 1.0, 0.5));
        let palm = Pose::from_position(Vec3::new(0.0, 1.0, 0.4));
        let mut c = contribution(palm, Vec3::new(0.0, 1.0, 0.45), &object);
        c.live_center += Vec3::new(0.1, 0.0, 0.0);

        let solved = solve_average(&object, &[c]).unwrap();
        assert!((solved.position - Vec3::new(0.1, 1.0, 0.5)).length() < 1e-5);
    }

    #[test]
    fn test_two_hands_average_rotation() {
        let object = Pose::IDENTITY;
        let mut left = contribution(Pose::IDENTITY, Vec3::new(-0.1, 0.0, 0.0), &object);
        let mut right = contribution(Pose::IDENTITY, Vec3::new(0.1, 0.0, 0.0), &object);
        left.palm.orientation = Quat::from_rotation_y(0.5);
        right.palm.orientation = Quat::from_rotation_y(-0.5);

        let solved = solve_average(&object, &[left, right]).unwrap();
        assert!(solved.position.length() < 1e-5);
        assert!((solved.orientation.dot(Quat::IDENTITY).abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_rigid_fit_tracks_rotated_hand() {
        let object = Pose::from_position(Vec3::new(0.0, 1.0, 0.5));
        let palm = Pose::from_position(Vec3::new(0.0, 1.0, 0.4));
        let mut c = contribution(palm, Vec3::new(0.0, 1.0, 0.45), &object);

        let moved_palm = Pose::new(Vec3::new(0.2, 1.1, 0.4), Quat::from_rotation_z(FRAC_PI_2));
        let delta = moved_palm.mul_pose(&palm.inverse());
        c.live_constellation = c.live_constellation.map(|p| delta.transform_point(p));

        let solved = solve_rigid_fit(&[c]).unwrap();
        let expected = delta.mul_pose(&object);
        assert!((solved.position - expected.position).length() < 1e-4);
        assert!((solved.orientation.dot(expected.orientation).abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_rigid_fit_falls_back_on_degenerate_constellation() {
        let object = Pose::from_position(Vec3::new(0.0, 1.0, 0.5));
        let mut c = contribution(Pose::IDENTITY, Vec3::new(0.0, 1.0, 0.45), &object);
        c.start_constellation = [Vec3::ZERO; CONSTELLATION_SIZE];

        assert!(solve_rigid_fit(&[c]).is_err());
        let solver = GraspPoseSolver::new(PoseSolveMethod::RigidFit);
        let solved = solver.solve(&object, &[c]).unwrap();
        assert!((solved.position - object.position).length() < 1e-5);
    }

    #[test]
    fn test_no_hands_is_none() {
        let solver = GraspPoseSolver::new(PoseSolveMethod::Average);
        assert!(solver.solve(&Pose::IDENTITY, &[]).is_none());
    }
}
