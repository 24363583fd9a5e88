//! 抓取检测
//!
//! 每个固定步、每个（对象，手）对运行一次的状态机：
//!
//! 1. 未抓取时递减重新抓取冷却计时
//! 2. 被追踪时记录各指弯曲度（上一步 -> 当前）
//! 3. 五个指尖各做一次球体重叠查询
//! 4. 空闲 -> 抓取：拇指重叠 + 任一其他手指重叠 + 冷却结束 + 被追踪
//!    抓取中：新开始重叠的手指中途加入
//! 5. 松手：拇指松开，或全部参与手指都松开
//!
//! 追踪丢失时整只手挂起：不开始、不加入、不松手。

use super::collision::{CollisionQuery, OverlapBuffer, VolumeId};
use super::hand::{palm_relative_rotation, Finger, HandPoseSource};
use super::state::{live_constellation, GraspState, CONSTELLATION_SIZE};
use crate::config::DetectorConfig;
use crate::xr::{world_to_local, Hand, Pose};

/// 冷却计时低于该值直接归零
const TIMER_SNAP: f32 = 1e-5;

/// 单只手本步的状态变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandTransition {
    None,
    /// 空闲 -> 抓取
    Started,
    /// 抓取中有手指加入
    Joined,
    /// 抓取 -> 空闲
    Released,
}

/// 抓取检测器
pub struct GraspDetector<'a> {
    config: &'a DetectorConfig,
}

impl<'a> GraspDetector<'a> {
    pub fn new(config: &'a DetectorConfig) -> Self {
        Self { config }
    }

    /// 推进一只手的状态机一步
    #[allow(clippy::too_many_arguments)]
    pub fn update<H, C>(
        &self,
        state: &mut GraspState,
        hands: &H,
        hand: Hand,
        collision: &C,
        volumes: &[VolumeId],
        object_pose: &Pose,
        dt: f32,
        buffer: &mut OverlapBuffer,
    ) -> HandTransition
    where
        H: HandPoseSource + ?Sized,
        C: CollisionQuery + ?Sized,
    {
        if !state.is_grasping {
            state.regrasp_timer = (state.regrasp_timer - dt.max(0.0)).max(0.0);
            if state.regrasp_timer < TIMER_SNAP {
                state.regrasp_timer = 0.0;
            }
        }

        let tracked = hands.is_tracking(hand);
        if tracked {
            for finger in Finger::ALL {
                state.fingers[finger.index()].record_curl(hands.curl(hand, finger));
            }
        }

        self.update_overlaps(state, hands, hand, tracked, collision, volumes, buffer);

        if !tracked {
            return HandTransition::None;
        }

        if !state.is_grasping {
            if self.can_start(state) {
                self.start(state, hands, hand, object_pose);
                return HandTransition::Started;
            }
            return HandTransition::None;
        }

        let joined = self.join_fingers(state, hand);

        if self.should_release(state) {
            state.release(self.config.regrasp_cooldown);
            tracing::debug!(target: "grasp", "{:?} hand released", hand);
            return HandTransition::Released;
        }

        if joined {
            HandTransition::Joined
        } else {
            HandTransition::None
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn update_overlaps<H, C>(
        &self,
        state: &mut GraspState,
        hands: &H,
        hand: Hand,
        tracked: bool,
        collision: &C,
        volumes: &[VolumeId],
        buffer: &mut OverlapBuffer,
    ) where
        H: HandPoseSource + ?Sized,
        C: CollisionQuery + ?Sized,
    {
        for finger in Finger::ALL {
            let overlapping = tracked && {
                buffer.clear();
                let tip = hands.fingertip_pose(hand, finger).position;
                collision.overlap_sphere(tip, self.config.fingertip_radius, buffer);
                buffer.contains_any(volumes)
            };
            state.fingers[finger.index()].overlapping = overlapping;
        }
    }

    fn can_start(&self, state: &GraspState) -> bool {
        let thumb = state.fingers[Finger::Thumb.index()].overlapping;
        let opposing = Finger::OPPOSING
            .iter()
            .any(|f| state.fingers[f.index()].overlapping);
        thumb && opposing && state.regrasp_timer == 0.0
    }

    fn start<H: HandPoseSource + ?Sized>(
        &self,
        state: &mut GraspState,
        hands: &H,
        hand: Hand,
        object_pose: &Pose,
    ) {
        state.is_grasping = true;
        for finger in state.fingers.iter_mut() {
            if finger.overlapping {
                finger.begin();
            }
        }

        let index = hands.pinch_info(hand, Finger::Index);
        let middle = hands.pinch_info(hand, Finger::Middle);
        let center = if middle.amount > index.amount {
            middle.center
        } else {
            index.center
        };

        let palm = hands.palm_pose(hand);
        state.grasp_center = center;
        state.grasp_center_palm_local = world_to_local(&palm, center);
        state.grasp_position_offset = world_to_local(object_pose, center);
        state.grasp_rotation_offset =
            palm_relative_rotation(palm.orientation, object_pose.orientation);

        let live = live_constellation(hands, hand, self.config.palm_normal_offset);
        for i in 0..CONSTELLATION_SIZE {
            state.start_constellation[i] = world_to_local(object_pose, live[i]);
        }

        tracing::debug!(
            target: "grasp",
            "{:?} hand started grasp with {} fingers at {:?}",
            hand,
            state.started_count(),
            center
        );
    }

    fn join_fingers(&self, state: &mut GraspState, hand: Hand) -> bool {
        let mut joined = false;
        for finger in Finger::ALL {
            let grasp = &mut state.fingers[finger.index()];
            if grasp.overlapping && !grasp.started {
                grasp.begin();
                joined = true;
                tracing::debug!(target: "grasp", "{:?} {:?} joined grasp", hand, finger);
            }
        }
        joined
    }

    fn should_release(&self, state: &GraspState) -> bool {
        let margin = self.config.release_curl_margin;
        let threshold = self.config.release_velocity_threshold;

        let thumb = &state.fingers[Finger::Thumb.index()];
        if thumb.started && thumb.is_released(margin, threshold) {
            return true;
        }

        let started = state.fingers.iter().filter(|f| f.started);
        let started_count = started.clone().count();
        let released_count = started
            .filter(|f| f.is_released(margin, threshold))
            .count();
        started_count > 0 && released_count == started_count
    }
}
