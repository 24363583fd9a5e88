//! 每个（对象，手）对的抓取状态
//!
//! 状态随对象创建，松手时重置而不销毁；只有检测器在该对象自己的
//! 固定步更新中修改它，外部只能通过只读访问器查看。

use super::hand::{Finger, HandPoseSource};
use crate::xr::{HandJointType, Hand, Pose};
use glam::{Quat, Vec3};

/// 星座点数量
pub const CONSTELLATION_SIZE: usize = 5;

/// 抓取星座：抓取开始时记录的五个手部标志点
pub type Constellation = [Vec3; CONSTELLATION_SIZE];

/// 星座前四个点对应的关节（第五点为掌心法线偏移点）
pub const CONSTELLATION_JOINTS: [HandJointType; 4] = [
    HandJointType::IndexProximal,
    HandJointType::ThumbMetacarpal,
    HandJointType::LittleMetacarpal,
    HandJointType::Wrist,
];

/// 读取某只手当前的世界空间星座
pub fn live_constellation<H: HandPoseSource + ?Sized>(
    hands: &H,
    hand: Hand,
    palm_normal_offset: f32,
) -> Constellation {
    let palm = hands.palm_pose(hand);
    let mut points = [Vec3::ZERO; CONSTELLATION_SIZE];
    for (point, joint) in points.iter_mut().zip(CONSTELLATION_JOINTS) {
        *point = hands.joint_position(hand, joint);
    }
    points[4] = palm.position + palm.orientation * (Vec3::NEG_Y * palm_normal_offset);
    points
}

/// 单根手指的抓取记录
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FingerGrasp {
    /// 本步指尖是否与对象重叠
    pub overlapping: bool,
    /// 是否参与了当前这次抓取
    pub started: bool,
    /// 参与抓取时的弯曲度快照，仅在 `started` 时有效
    pub start_curl: f32,
    pub curl_current: f32,
    pub curl_previous: f32,
}

impl FingerGrasp {
    /// 弯曲速度（弯曲度/步）
    pub fn curl_velocity(&self) -> f32 {
        self.curl_current - self.curl_previous
    }

    /// 快速张开，或者弯曲度比快照回落超过 `margin`
    pub fn is_released(&self, margin: f32, velocity_threshold: f32) -> bool {
        self.curl_velocity() < -velocity_threshold || self.curl_current < self.start_curl - margin
    }

    pub(crate) fn begin(&mut self) {
        self.started = true;
        self.start_curl = self.curl_current;
    }

    pub(crate) fn record_curl(&mut self, curl: f32) {
        self.curl_previous = self.curl_current;
        self.curl_current = curl;
    }
}

/// 一只手对一个对象的抓取状态
#[derive(Debug, Clone, PartialEq)]
pub struct GraspState {
    pub(crate) is_grasping: bool,
    pub(crate) fingers: [FingerGrasp; 5],
    pub(crate) grasp_center: Vec3,
    pub(crate) grasp_center_palm_local: Vec3,
    pub(crate) grasp_position_offset: Vec3,
    pub(crate) grasp_rotation_offset: Quat,
    pub(crate) start_constellation: Constellation,
    pub(crate) regrasp_timer: f32,
}

impl Default for GraspState {
    fn default() -> Self {
        Self {
            is_grasping: false,
            fingers: [FingerGrasp::default(); 5],
            grasp_center: Vec3::ZERO,
            grasp_center_palm_local: Vec3::ZERO,
            grasp_position_offset: Vec3::ZERO,
            grasp_rotation_offset: Quat::IDENTITY,
            start_constellation: [Vec3::ZERO; CONSTELLATION_SIZE],
            regrasp_timer: 0.0,
        }
    }
}

impl GraspState {
    pub fn is_grasping(&self) -> bool {
        self.is_grasping
    }

    pub fn finger(&self, finger: Finger) -> &FingerGrasp {
        &self.fingers[finger.index()]
    }

    pub fn fingers(&self) -> &[FingerGrasp; 5] {
        &self.fingers
    }

    /// 抓取开始时的世界空间抓取中心
    pub fn grasp_center(&self) -> Vec3 {
        self.grasp_center
    }

    /// 抓取中心在对象局部空间的偏移
    pub fn grasp_position_offset(&self) -> Vec3 {
        self.grasp_position_offset
    }

    /// 掌心朝向到对象朝向的相对旋转
    pub fn grasp_rotation_offset(&self) -> Quat {
        self.grasp_rotation_offset
    }

    /// 对象局部空间的起始星座
    pub fn start_constellation(&self) -> &Constellation {
        &self.start_constellation
    }

    pub fn regrasp_timer(&self) -> f32 {
        self.regrasp_timer
    }

    /// 当前手掌下的实时抓取中心
    pub fn live_grasp_center(&self, palm: &Pose) -> Vec3 {
        palm.transform_point(self.grasp_center_palm_local)
    }

    pub fn started_count(&self) -> usize {
        self.fingers.iter().filter(|f| f.started).count()
    }

    /// 松手：清空手指状态并启动冷却计时，弯曲度历史保留
    pub(crate) fn release(&mut self, cooldown: f32) {
        self.is_grasping = false;
        for finger in self.fingers.iter_mut() {
            finger.overlapping = false;
            finger.started = false;
            finger.start_curl = 0.0;
        }
        self.regrasp_timer = cooldown.max(0.0);
    }

    /// 完全复位（重生时使用）
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
