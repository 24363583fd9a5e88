//! 手部姿态数据源
//!
//! 抓取核心只通过 [`HandPoseSource`] 读取手部数据，不持有任何全局手部实例。
//! [`HandSet`] 是最直接的实现：每帧由上层填充两只手的快照后传入引擎。

use crate::xr::{HandJointType, Hand, Pose, HAND_JOINT_COUNT};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// 手指类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Little,
    ];

    /// 除拇指外的四指
    pub const OPPOSING: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Little];

    pub fn index(self) -> usize {
        match self {
            Finger::Thumb => 0,
            Finger::Index => 1,
            Finger::Middle => 2,
            Finger::Ring => 3,
            Finger::Little => 4,
        }
    }

    pub fn tip_joint(self) -> HandJointType {
        match self {
            Finger::Thumb => HandJointType::ThumbTip,
            Finger::Index => HandJointType::IndexTip,
            Finger::Middle => HandJointType::MiddleTip,
            Finger::Ring => HandJointType::RingTip,
            Finger::Little => HandJointType::LittleTip,
        }
    }
}

/// 捏合信息：拇指尖与某指尖之间
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PinchInfo {
    /// 两指尖中点
    pub center: Vec3,
    /// 两指尖距离
    pub distance: f32,
    /// 捏合程度 (0.0 = 张开, 1.0 = 贴合)
    pub amount: f32,
}

/// 手部姿态数据源
///
/// 纯数据提供者，所有方法都应是廉价的读取。
pub trait HandPoseSource {
    fn is_tracking(&self, hand: Hand) -> bool;
    fn fingertip_pose(&self, hand: Hand, finger: Finger) -> Pose;
    /// 弯曲度 (0.0 = 伸直, 1.0 = 完全弯曲)
    fn curl(&self, hand: Hand, finger: Finger) -> f32;
    fn pinch_info(&self, hand: Hand, finger: Finger) -> PinchInfo;
    fn palm_pose(&self, hand: Hand) -> Pose;
    fn linear_velocity(&self, hand: Hand) -> Vec3;
    fn angular_velocity(&self, hand: Hand) -> Vec3;
    fn joint_position(&self, hand: Hand, joint: HandJointType) -> Vec3;
}

/// 单只手的一帧快照
#[derive(Debug, Clone)]
pub struct HandFrame {
    pub tracked: bool,
    pub palm: Pose,
    pub fingertips: [Pose; 5],
    pub curls: [f32; 5],
    pub pinches: [PinchInfo; 5],
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub joints: [Vec3; HAND_JOINT_COUNT],
}

impl Default for HandFrame {
    fn default() -> Self {
        Self {
            tracked: false,
            palm: Pose::IDENTITY,
            fingertips: [Pose::IDENTITY; 5],
            curls: [0.0; 5],
            pinches: [PinchInfo::default(); 5],
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            joints: [Vec3::ZERO; HAND_JOINT_COUNT],
        }
    }
}

impl HandFrame {
    /// 以掌心姿态放置一只张开的、被追踪的手
    ///
    /// 关节使用固定的掌心局部布局，便于构造测试与演示数据。
    pub fn open_at(palm: Pose) -> Self {
        let mut frame = Self {
            tracked: true,
            palm,
            ..Default::default()
        };
        for (i, local) in CANONICAL_JOINTS.iter().enumerate() {
            frame.joints[i] = palm.transform_point(*local);
        }
        for finger in Finger::ALL {
            let tip = frame.joints[finger.tip_joint() as usize];
            frame.fingertips[finger.index()] = Pose::new(tip, palm.orientation);
        }
        frame.refresh_pinches(0.01, 0.08);
        frame
    }

    pub fn untracked() -> Self {
        Self::default()
    }

    /// 设置某指尖的世界位置（同步关节表）
    pub fn set_fingertip(&mut self, finger: Finger, position: Vec3) {
        self.fingertips[finger.index()].position = position;
        self.joints[finger.tip_joint() as usize] = position;
    }

    pub fn set_curl(&mut self, finger: Finger, curl: f32) {
        self.curls[finger.index()] = curl.clamp(0.0, 1.0);
    }

    pub fn set_curls(&mut self, curl: f32) {
        for finger in Finger::ALL {
            self.set_curl(finger, curl);
        }
    }

    pub fn set_pinch(&mut self, finger: Finger, pinch: PinchInfo) {
        self.pinches[finger.index()] = pinch;
    }

    /// 由指尖位置重新计算各指与拇指的捏合信息
    pub fn refresh_pinches(&mut self, min_distance: f32, max_distance: f32) {
        let thumb = self.fingertips[Finger::Thumb.index()].position;
        for finger in Finger::OPPOSING {
            let tip = self.fingertips[finger.index()].position;
            self.pinches[finger.index()] = pinch_between(thumb, tip, min_distance, max_distance);
        }
    }

    /// 将整只手刚性移动到新的掌心姿态
    pub fn move_to(&mut self, palm: Pose) {
        let delta = palm.mul_pose(&self.palm.inverse());
        for joint in self.joints.iter_mut() {
            *joint = delta.transform_point(*joint);
        }
        for tip in self.fingertips.iter_mut() {
            *tip = delta.mul_pose(tip);
        }
        for pinch in self.pinches.iter_mut() {
            pinch.center = delta.transform_point(pinch.center);
        }
        self.palm = palm;
    }
}

/// 计算拇指尖与指尖之间的捏合信息
pub fn pinch_between(thumb_tip: Vec3, finger_tip: Vec3, min_distance: f32, max_distance: f32) -> PinchInfo {
    let distance = thumb_tip.distance(finger_tip);
    let span = (max_distance - min_distance).max(f32::EPSILON);
    PinchInfo {
        center: (thumb_tip + finger_tip) * 0.5,
        distance,
        amount: 1.0 - ((distance - min_distance) / span).clamp(0.0, 1.0),
    }
}

// 掌心局部坐标系下的关节布局（+Z 指向手指，-Y 为掌心法线）
const CANONICAL_JOINTS: [Vec3; HAND_JOINT_COUNT] = [
    Vec3::new(0.0, 0.0, 0.0),      // Palm
    Vec3::new(0.0, 0.0, -0.08),    // Wrist
    Vec3::new(-0.03, 0.0, -0.05),  // ThumbMetacarpal
    Vec3::new(-0.045, 0.0, -0.02), // ThumbProximal
    Vec3::new(-0.055, 0.0, 0.005), // ThumbDistal
    Vec3::new(-0.06, 0.0, 0.025),  // ThumbTip
    Vec3::new(-0.02, 0.0, -0.05),  // IndexMetacarpal
    Vec3::new(-0.02, 0.0, 0.0),    // IndexProximal
    Vec3::new(-0.02, 0.0, 0.03),   // IndexIntermediate
    Vec3::new(-0.02, 0.0, 0.05),   // IndexDistal
    Vec3::new(-0.02, 0.0, 0.07),   // IndexTip
    Vec3::new(0.0, 0.0, -0.05),    // MiddleMetacarpal
    Vec3::new(0.0, 0.0, 0.0),      // MiddleProximal
    Vec3::new(0.0, 0.0, 0.035),    // MiddleIntermediate
    Vec3::new(0.0, 0.0, 0.058),    // MiddleDistal
    Vec3::new(0.0, 0.0, 0.08),     // MiddleTip
    Vec3::new(0.02, 0.0, -0.05),   // RingMetacarpal
    Vec3::new(0.02, 0.0, 0.0),     // RingProximal
    Vec3::new(0.02, 0.0, 0.03),    // RingIntermediate
    Vec3::new(0.02, 0.0, 0.05),    // RingDistal
    Vec3::new(0.02, 0.0, 0.07),    // RingTip
    Vec3::new(0.04, 0.0, -0.05),   // LittleMetacarpal
    Vec3::new(0.04, 0.0, -0.01),   // LittleProximal
    Vec3::new(0.04, 0.0, 0.015),   // LittleIntermediate
    Vec3::new(0.04, 0.0, 0.03),    // LittleDistal
    Vec3::new(0.04, 0.0, 0.045),   // LittleTip
];

/// 双手快照集合
#[derive(Debug, Clone, Default)]
pub struct HandSet {
    hands: [HandFrame; 2],
}

impl HandSet {
    pub fn new(left: HandFrame, right: HandFrame) -> Self {
        Self {
            hands: [left, right],
        }
    }

    pub fn get(&self, hand: Hand) -> &HandFrame {
        &self.hands[hand.index()]
    }

    pub fn get_mut(&mut self, hand: Hand) -> &mut HandFrame {
        &mut self.hands[hand.index()]
    }

    pub fn set(&mut self, hand: Hand, frame: HandFrame) {
        self.hands[hand.index()] = frame;
    }
}

impl HandPoseSource for HandSet {
    fn is_tracking(&self, hand: Hand) -> bool {
        self.get(hand).tracked
    }

    fn fingertip_pose(&self, hand: Hand, finger: Finger) -> Pose {
        self.get(hand).fingertips[finger.index()]
    }

    fn curl(&self, hand: Hand, finger: Finger) -> f32 {
        self.get(hand).curls[finger.index()]
    }

    fn pinch_info(&self, hand: Hand, finger: Finger) -> PinchInfo {
        self.get(hand).pinches[finger.index()]
    }

    fn palm_pose(&self, hand: Hand) -> Pose {
        self.get(hand).palm
    }

    fn linear_velocity(&self, hand: Hand) -> Vec3 {
        self.get(hand).linear_velocity
    }

    fn angular_velocity(&self, hand: Hand) -> Vec3 {
        self.get(hand).angular_velocity
    }

    fn joint_position(&self, hand: Hand, joint: HandJointType) -> Vec3 {
        self.get(hand).joints[joint as usize]
    }
}

/// 掌心局部的旋转偏移，不受 `Quat` 符号二义性影响
pub(crate) fn palm_relative_rotation(palm: Quat, target: Quat) -> Quat {
    (palm.inverse() * target).normalize()
}
