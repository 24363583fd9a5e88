//! OpenXR 手部追踪扩展集成
//!
//! 将 `XR_EXT_hand_tracking` 的26个关节数据转换为抓取核心需要的手部信号。
//!
//! ## 功能特性
//!
//! - 26个手部关节追踪（每只手），布局与 OpenXR 一致
//! - 由关节弯折角估算手指弯曲度
//! - 拇指与各指的捏合信息
//! - 相邻两次更新之间差分得到的线速度与角速度
//! - 实现 [`HandPoseSource`]，可直接传给抓取引擎
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use grasp_engine::xr::*;
//!
//! let mut tracker = HandTracker::new(HandTrackingConfig::default());
//!
//! // 每帧从运行时取得关节并更新
//! let joints = joints_from_openxr(&locations)?;
//! tracker.update_hand(Hand::Left, joints, dt);
//!
//! engine.fixed_update(&tracker, &mut world, dt);
//! ```

use super::{Hand, Pose, XrError};
use crate::config::HandTrackingConfig;
use crate::impl_default;
use crate::interaction::hand::{pinch_between, Finger, HandPoseSource, PinchInfo};
use crate::interaction::motion::angular_velocity_between;
use glam::{Quat, Vec3};

/// 每只手的关节数量
pub const HAND_JOINT_COUNT: usize = 26;

/// 手部关节类型（声明顺序即 OpenXR 关节下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandJointType {
    Palm,
    Wrist,
    ThumbMetacarpal,
    ThumbProximal,
    ThumbDistal,
    ThumbTip,
    IndexMetacarpal,
    IndexProximal,
    IndexIntermediate,
    IndexDistal,
    IndexTip,
    MiddleMetacarpal,
    MiddleProximal,
    MiddleIntermediate,
    MiddleDistal,
    MiddleTip,
    RingMetacarpal,
    RingProximal,
    RingIntermediate,
    RingDistal,
    RingTip,
    LittleMetacarpal,
    LittleProximal,
    LittleIntermediate,
    LittleDistal,
    LittleTip,
}

impl HandJointType {
    /// 某手指从掌骨到指尖的关节链
    pub fn chain(finger: Finger) -> &'static [HandJointType] {
        use HandJointType::*;
        match finger {
            Finger::Thumb => &[ThumbMetacarpal, ThumbProximal, ThumbDistal, ThumbTip],
            Finger::Index => &[
                IndexMetacarpal,
                IndexProximal,
                IndexIntermediate,
                IndexDistal,
                IndexTip,
            ],
            Finger::Middle => &[
                MiddleMetacarpal,
                MiddleProximal,
                MiddleIntermediate,
                MiddleDistal,
                MiddleTip,
            ],
            Finger::Ring => &[
                RingMetacarpal,
                RingProximal,
                RingIntermediate,
                RingDistal,
                RingTip,
            ],
            Finger::Little => &[
                LittleMetacarpal,
                LittleProximal,
                LittleIntermediate,
                LittleDistal,
                LittleTip,
            ],
        }
    }
}

/// 手部关节
#[derive(Debug, Clone, Copy)]
pub struct HandJoint {
    /// 姿态
    pub pose: Pose,
    /// 半径（用于碰撞检测）
    pub radius: f32,
    /// 是否有效
    pub is_valid: bool,
}

impl_default!(HandJoint {
    pose: Pose::IDENTITY,
    radius: 0.0,
    is_valid: false,
});

/// 手部关节集合
#[derive(Debug, Clone)]
pub struct HandJoints {
    joints: [HandJoint; HAND_JOINT_COUNT],
    /// 置信度 (0.0 - 1.0)
    confidence: f32,
}

impl Default for HandJoints {
    fn default() -> Self {
        Self {
            joints: [HandJoint::default(); HAND_JOINT_COUNT],
            confidence: 0.0,
        }
    }
}

impl HandJoints {
    /// 创建新的手部关节集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新关节
    pub fn update_joint(&mut self, joint_type: HandJointType, joint: HandJoint) {
        self.joints[joint_type as usize] = joint;
    }

    /// 获取关节
    pub fn get_joint(&self, joint_type: HandJointType) -> &HandJoint {
        &self.joints[joint_type as usize]
    }

    /// 设置置信度
    pub fn set_confidence(&mut self, confidence: f32) {
        self.confidence = confidence.clamp(0.0, 1.0);
    }

    /// 获取置信度
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// 掌心、手腕与全部指尖有效才算有效
    pub fn is_valid(&self) -> bool {
        let required = [HandJointType::Palm, HandJointType::Wrist];
        required
            .iter()
            .copied()
            .chain(Finger::ALL.iter().map(|f| f.tip_joint()))
            .all(|j| self.get_joint(j).is_valid)
    }

    /// 获取指尖姿态
    pub fn finger_tip(&self, finger: Finger) -> Pose {
        self.get_joint(finger.tip_joint()).pose
    }

    /// 计算手指弯曲度（0.0 = 完全伸直, 1.0 = 完全弯曲）
    ///
    /// 沿关节链累加相邻骨段的弯折角，再按 `max_curl_angle` 归一化。
    pub fn finger_curl(&self, finger: Finger, max_curl_angle: f32) -> f32 {
        let chain = HandJointType::chain(finger);
        let mut total_angle = 0.0;

        for window in chain.windows(3) {
            let a = self.get_joint(window[0]).pose.position;
            let b = self.get_joint(window[1]).pose.position;
            let c = self.get_joint(window[2]).pose.position;
            let (Some(first), Some(second)) = ((b - a).try_normalize(), (c - b).try_normalize())
            else {
                continue;
            };
            total_angle += first.dot(second).clamp(-1.0, 1.0).acos();
        }

        (total_angle / max_curl_angle.max(f32::EPSILON)).clamp(0.0, 1.0)
    }
}

/// 将 OpenXR 关节位置数组转换为 [`HandJoints`]
pub fn joints_from_openxr(locations: &[openxr::HandJointLocation]) -> Result<HandJoints, XrError> {
    if locations.len() < HAND_JOINT_COUNT {
        return Err(XrError::IncompleteJoints {
            expected: HAND_JOINT_COUNT,
            actual: locations.len(),
        });
    }

    let mut joints = HandJoints::new();
    let mut valid_count = 0usize;
    for (i, location) in locations.iter().take(HAND_JOINT_COUNT).enumerate() {
        let flags = location.location_flags;
        let is_valid = flags.contains(openxr::SpaceLocationFlags::POSITION_VALID)
            && flags.contains(openxr::SpaceLocationFlags::ORIENTATION_VALID);
        if is_valid {
            valid_count += 1;
        }
        let p = location.pose.position;
        let o = location.pose.orientation;
        joints.joints[i] = HandJoint {
            pose: Pose::new(Vec3::new(p.x, p.y, p.z), Quat::from_xyzw(o.x, o.y, o.z, o.w)),
            radius: location.radius,
            is_valid,
        };
    }
    joints.set_confidence(valid_count as f32 / HAND_JOINT_COUNT as f32);
    Ok(joints)
}

#[derive(Debug, Clone, Default)]
struct TrackedHand {
    joints: HandJoints,
    curls: [f32; 5],
    pinches: [PinchInfo; 5],
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    has_previous: bool,
    tracked: bool,
}

/// 手部追踪器
pub struct HandTracker {
    config: HandTrackingConfig,
    hands: [TrackedHand; 2],
}

impl HandTracker {
    /// 创建新的手部追踪器
    pub fn new(config: HandTrackingConfig) -> Self {
        Self {
            config,
            hands: [TrackedHand::default(), TrackedHand::default()],
        }
    }

    /// 用新一帧关节数据更新某只手，`dt` 为距上次更新的秒数
    pub fn update_hand(&mut self, hand: Hand, joints: HandJoints, dt: f32) {
        let config = &self.config;
        let state = &mut self.hands[hand.index()];

        if !joints.is_valid() {
            // 追踪丢失时保留上一帧数据，速度归零
            state.joints.set_confidence(0.0);
            state.tracked = false;
            state.linear_velocity = Vec3::ZERO;
            state.angular_velocity = Vec3::ZERO;
            state.has_previous = false;
            tracing::trace!(target: "xr", "{:?} hand lost tracking", hand);
            return;
        }

        let palm = joints.get_joint(HandJointType::Palm).pose;
        if state.has_previous && dt > 0.0 {
            let previous = state.joints.get_joint(HandJointType::Palm).pose;
            state.linear_velocity = (palm.position - previous.position) / dt;
            state.angular_velocity =
                angular_velocity_between(previous.orientation, palm.orientation, dt);
        } else {
            state.linear_velocity = Vec3::ZERO;
            state.angular_velocity = Vec3::ZERO;
        }

        let thumb_tip = joints.finger_tip(Finger::Thumb).position;
        for finger in Finger::ALL {
            state.curls[finger.index()] = joints.finger_curl(finger, config.max_curl_angle);
            if finger != Finger::Thumb {
                state.pinches[finger.index()] = pinch_between(
                    thumb_tip,
                    joints.finger_tip(finger).position,
                    config.pinch_min_distance,
                    config.pinch_max_distance,
                );
            }
        }

        state.joints = joints;
        state.has_previous = true;
        state.tracked = true;
    }

    /// 获取手部关节数据
    pub fn hand_joints(&self, hand: Hand) -> &HandJoints {
        &self.hands[hand.index()].joints
    }

    /// 获取手部置信度
    pub fn confidence(&self, hand: Hand) -> f32 {
        self.hands[hand.index()].joints.confidence()
    }
}

impl Default for HandTracker {
    fn default() -> Self {
        Self::new(HandTrackingConfig::default())
    }
}

impl HandPoseSource for HandTracker {
    fn is_tracking(&self, hand: Hand) -> bool {
        let state = &self.hands[hand.index()];
        state.tracked
            && state.joints.is_valid()
            && state.joints.confidence() >= self.config.min_confidence
    }

    fn fingertip_pose(&self, hand: Hand, finger: Finger) -> Pose {
        self.hands[hand.index()].joints.finger_tip(finger)
    }

    fn curl(&self, hand: Hand, finger: Finger) -> f32 {
        self.hands[hand.index()].curls[finger.index()]
    }

    fn pinch_info(&self, hand: Hand, finger: Finger) -> PinchInfo {
        self.hands[hand.index()].pinches[finger.index()]
    }

    fn palm_pose(&self, hand: Hand) -> Pose {
        self.hands[hand.index()]
            .joints
            .get_joint(HandJointType::Palm)
            .pose
    }

    fn linear_velocity(&self, hand: Hand) -> Vec3 {
        self.hands[hand.index()].linear_velocity
    }

    fn angular_velocity(&self, hand: Hand) -> Vec3 {
        self.hands[hand.index()].angular_velocity
    }

    fn joint_position(&self, hand: Hand, joint: HandJointType) -> Vec3 {
        self.hands[hand.index()].joints.get_joint(joint).pose.position
    }
}
