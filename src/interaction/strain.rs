//! 拉伸量
//!
//! 手的实时抓取中心与"抓取偏移点在对象当前姿态下的世界位置"之间的距离，
//! 表示对象落后于手多少。纯观测量，只驱动反馈，不参与物理。

use super::state::GraspState;
use crate::xr::{local_to_world, Hand, Pose};

/// 单只手的拉伸量；未抓取时为0
pub fn hand_strain(state: &GraspState, palm: &Pose, object_pose: &Pose) -> f32 {
    if !state.is_grasping() {
        return 0.0;
    }
    let anchor = local_to_world(object_pose, state.grasp_position_offset());
    state.live_grasp_center(palm).distance(anchor)
}

/// 每个对象的拉伸记录
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StrainState {
    per_hand: [f32; 2],
}

impl StrainState {
    pub(crate) fn set(&mut self, hand: Hand, strain: f32) {
        self.per_hand[hand.index()] = if strain.is_finite() { strain } else { 0.0 };
    }

    pub fn hand(&self, hand: Hand) -> f32 {
        self.per_hand[hand.index()]
    }

    /// 对象整体拉伸量：各手最大值
    pub fn max(&self) -> f32 {
        self.per_hand[0].max(self.per_hand[1])
    }

    pub(crate) fn reset(&mut self) {
        self.per_hand = [0.0; 2];
    }
}
