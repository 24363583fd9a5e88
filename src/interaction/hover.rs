//! 悬停反馈
//!
//! 在渲染帧上运行，与抓取状态无关。每只被追踪的手从食指捏合中心出发，
//! 对对象全部碰撞体求最近点：在内部距离为0，否则为到表面的距离。
//! 距离严格小于阈值才算悬停；两只手都悬停时报告更近的那只。

use super::collision::{CollisionQuery, VolumeId};
use super::hand::{Finger, HandPoseSource};
use crate::xr::Hand;
use glam::Vec3;

/// 悬停状态变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverChange {
    Started(Hand),
    Ended(Hand),
}

/// 悬停查询所需的对象几何信息
#[derive(Debug, Clone, Copy)]
pub struct HoverTarget<'a> {
    pub volumes: &'a [VolumeId],
    /// 质心位置，用于包围球剔除
    pub center: Vec3,
    /// 包围半径；不大于0时不剔除
    pub bounding_radius: f32,
}

/// 距离是否算悬停（严格小于阈值）
pub fn is_within_hover(distance: f32, threshold: f32) -> bool {
    distance < threshold
}

/// 查询点到对象表面的距离；被包围球剔除或无碰撞体时返回 `None`
pub fn hover_distance<C: CollisionQuery + ?Sized>(
    collision: &C,
    target: &HoverTarget<'_>,
    point: Vec3,
    threshold: f32,
) -> Option<f32> {
    if target.bounding_radius > 0.0
        && point.distance(target.center) > target.bounding_radius + threshold
    {
        return None;
    }
    collision
        .closest_point(target.volumes, point)
        .map(|closest| closest.distance_from(point))
}

/// 每个对象的悬停状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverState {
    hovering: [bool; 2],
    distances: [f32; 2],
}

impl Default for HoverState {
    fn default() -> Self {
        Self {
            hovering: [false; 2],
            distances: [f32::INFINITY; 2],
        }
    }
}

impl HoverState {
    /// 更新两只手的悬停状态，返回本帧的变化
    pub fn update<H, C>(
        &mut self,
        hands: &H,
        collision: &C,
        target: &HoverTarget<'_>,
        threshold: f32,
    ) -> [Option<HoverChange>; 2]
    where
        H: HandPoseSource + ?Sized,
        C: CollisionQuery + ?Sized,
    {
        let mut changes = [None; 2];
        for hand in Hand::BOTH {
            let distance = if hands.is_tracking(hand) {
                let point = hands.pinch_info(hand, Finger::Index).center;
                hover_distance(collision, target, point, threshold).unwrap_or(f32::INFINITY)
            } else {
                f32::INFINITY
            };

            let hovering = is_within_hover(distance, threshold);
            let i = hand.index();
            if hovering != self.hovering[i] {
                changes[i] = Some(if hovering {
                    HoverChange::Started(hand)
                } else {
                    HoverChange::Ended(hand)
                });
            }
            self.hovering[i] = hovering;
            self.distances[i] = distance;
        }
        changes
    }

    pub fn is_hovering(&self) -> bool {
        self.hovering.iter().any(|h| *h)
    }

    pub fn is_hand_hovering(&self, hand: Hand) -> bool {
        self.hovering[hand.index()]
    }

    /// 正在悬停的手中距离最近的一只
    pub fn hover_hand(&self) -> Option<Hand> {
        Hand::BOTH
            .into_iter()
            .filter(|h| self.hovering[h.index()])
            .min_by(|a, b| self.distances[a.index()].total_cmp(&self.distances[b.index()]))
    }

    /// 最近悬停手的距离
    pub fn distance(&self) -> Option<f32> {
        self.hover_hand().map(|h| self.distances[h.index()])
    }

    /// 0（阈值处）到 1（表面）；未悬停为0
    pub fn t_value(&self, threshold: f32) -> f32 {
        match self.distance() {
            Some(distance) if threshold > 0.0 => (1.0 - distance / threshold).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// 清空（重生时使用），返回需要补发的结束事件
    pub(crate) fn reset(&mut self) -> [Option<HoverChange>; 2] {
        let mut changes = [None; 2];
        for hand in Hand::BOTH {
            if self.hovering[hand.index()] {
                changes[hand.index()] = Some(HoverChange::Ended(hand));
            }
        }
        *self = Self::default();
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::hand::{HandFrame, HandSet, PinchInfo};
    use crate::interaction::test_support::SphereWorld;
    use crate::xr::Pose;

    fn hands_with_pinch(left: Option<Vec3>, right: Option<Vec3>) -> HandSet {
        let make = |point: Option<Vec3>| match point {
            Some(center) => {
                let mut frame = HandFrame::open_at(Pose::IDENTITY);
                frame.set_pinch(
                    Finger::Index,
                    PinchInfo {
                        center,
                        distance: 0.05,
                        amount: 0.4,
                    },
                );
                frame
            }
            None => HandFrame::untracked(),
        };
        HandSet::new(make(left), make(right))
    }

    fn world() -> SphereWorld {
        let mut world = SphereWorld::new();
        world.add_sphere(VolumeId(3), Vec3::ZERO, 0.25);
        world
    }

    const TARGET: HoverTarget<'static> = HoverTarget {
        volumes: &[VolumeId(3)],
        center: Vec3::ZERO,
        bounding_radius: 0.25,
    };

    #[test]
    fn test_hover_start_and_end() {
        let world = world();
        let mut state = HoverState::default();

        let hands = hands_with_pinch(Some(Vec3::new(0.3, 0.0, 0.0)), None);
        let changes = state.update(&hands, &world, &TARGET, 0.1);
        assert_eq!(changes[0], Some(HoverChange::Started(Hand::Left)));
        assert_eq!(changes[1], None);
        assert!(state.is_hovering());
        assert!((state.t_value(0.1) - 0.5).abs() < 1e-4);

        let hands = hands_with_pinch(Some(Vec3::new(1.0, 0.0, 0.0)), None);
        let changes = state.update(&hands, &world, &TARGET, 0.1);
        assert_eq!(changes[0], Some(HoverChange::Ended(Hand::Left)));
        assert_eq!(state.t_value(0.1), 0.0);
    }

    #[test]
    fn test_inside_is_zero_distance() {
        let world = world();
        let mut state = HoverState::default();
        let hands = hands_with_pinch(Some(Vec3::new(0.1, 0.0, 0.0)), None);
        state.update(&hands, &world, &TARGET, 0.1);
        assert_eq!(state.distance(), Some(0.0));
        assert_eq!(state.t_value(0.1), 1.0);
    }

    #[test]
    fn test_nearer_hand_is_reported() {
        let world = world();
        let mut state = HoverState::default();
        let hands = hands_with_pinch(
            Some(Vec3::new(0.32, 0.0, 0.0)),
            Some(Vec3::new(0.0, 0.27, 0.0)),
        );
        state.update(&hands, &world, &TARGET, 0.1);
        assert_eq!(state.hover_hand(), Some(Hand::Right));
    }

    #[test]
    fn test_untracked_hand_ends_hover() {
        let world = world();
        let mut state = HoverState::default();
        state.update(
            &hands_with_pinch(Some(Vec3::new(0.3, 0.0, 0.0)), None),
            &world,
            &TARGET,
            0.1,
        );
        let changes = state.update(&hands_with_pinch(None, None), &world, &TARGET, 0.1);
        assert_eq!(changes[0], Some(HoverChange::Ended(Hand::Left)));
    }

    #[test]
    fn test_bounding_radius_culls_far_points() {
        let world = world();
        let point = Vec3::new(2.0, 0.0, 0.0);
        assert_eq!(hover_distance(&world, &TARGET, point, 0.1), None);

        let unculled = HoverTarget {
            bounding_radius: 0.0,
            ..TARGET
        };
        let distance = hover_distance(&world, &unculled, point, 0.1).unwrap();
        assert!((distance - 1.75).abs() < 1e-5);
    }
}
