//! 抓取交互的端到端场景测试

use super::body::{BodyId, SimpleBody};
use super::collision::{OverlapBuffer, VolumeId};
use super::detector::GraspDetector;
use super::hand::{Finger, HandFrame, HandPoseSource, HandSet, PinchInfo};
use super::solver::{solve_average, HandContribution};
use super::state::GraspState;
use super::test_support::SphereWorld;
use super::{GraspEngine, GraspEvent, ObjectDesc, ObjectId, PoseSolveMethod};
use crate::config::{DetectorConfig, GraspConfig};
use crate::xr::{Hand, Pose};
use glam::{Quat, Vec3};
use proptest::prelude::*;

const DT: f32 = 1.0 / 90.0;
const OBJECT_POS: Vec3 = Vec3::new(0.0, 1.0, 0.3);
const PALM_POS: Vec3 = Vec3::new(0.0, 1.0, 0.1);
const BODY: BodyId = BodyId(1);
const VOLUME: VolumeId = VolumeId(10);

struct Rig {
    engine: GraspEngine,
    world: SphereWorld,
    hands: HandSet,
    id: ObjectId,
}

impl Rig {
    fn new(config: GraspConfig, body: SimpleBody) -> Self {
        let mut world = SphereWorld::new();
        world.add_body(BODY, body, VOLUME, 0.05);
        let mut engine = GraspEngine::new(config);
        let id = engine
            .register_object(ObjectDesc::new(BODY, vec![VOLUME]), &world)
            .unwrap();

        let mut hands = HandSet::default();
        for hand in Hand::BOTH {
            let mut frame = HandFrame::open_at(Pose::from_position(PALM_POS));
            frame.set_curls(0.6);
            frame.tracked = false;
            hands.set(hand, frame);
        }
        Self {
            engine,
            world,
            hands,
            id,
        }
    }

    fn dynamic() -> Self {
        Self::new(
            GraspConfig::default(),
            SimpleBody::dynamic(Pose::from_position(OBJECT_POS)),
        )
    }

    /// 拇指与食指夹住对象
    fn grip(&mut self, hand: Hand) {
        let frame = self.hands.get_mut(hand);
        frame.tracked = true;
        frame.set_fingertip(Finger::Thumb, OBJECT_POS + Vec3::X * 0.02);
        frame.set_fingertip(Finger::Index, OBJECT_POS - Vec3::X * 0.02);
        frame.refresh_pinches(0.01, 0.08);
    }

    fn tick(&mut self) {
        self.engine.fixed_update(&self.hands, &mut self.world, DT);
    }

    fn body(&self) -> &SimpleBody {
        &self.world.bodies[&BODY]
    }

    fn state(&self, hand: Hand) -> &GraspState {
        self.engine.grasp_state(self.id, hand).unwrap()
    }

    /// 去掉每步都会产生的移动事件
    fn transitions(&mut self) -> Vec<GraspEvent> {
        self.engine
            .drain_events()
            .into_iter()
            .filter(|e| !matches!(e, GraspEvent::GraspMoved { .. }))
            .collect()
    }
}

fn rotation_close(a: Quat, b: Quat, tolerance: f32) -> bool {
    (a.dot(b).abs() - 1.0).abs() < tolerance
}

#[test]
fn test_single_hand_grasp_hold_and_release_cycle() {
    let mut rig = Rig::dynamic();
    let cooldown = rig.engine.config().detector.regrasp_cooldown;
    rig.grip(Hand::Left);

    for tick in 0..50 {
        rig.tick();
        assert!(rig.engine.is_grasped(rig.id).unwrap(), "tick {}", tick);
    }
    assert_eq!(
        rig.transitions(),
        vec![GraspEvent::Grasped {
            object: rig.id,
            hand: Hand::Left
        }]
    );
    assert!(!rig.body().gravity);

    // 第50步：弯曲度回落 0.1
    rig.hands.get_mut(Hand::Left).set_curls(0.5);
    rig.tick();
    assert!(!rig.engine.is_grasped(rig.id).unwrap());
    assert_eq!(rig.state(Hand::Left).regrasp_timer(), cooldown);
    assert!(rig.body().gravity);
    assert!(matches!(
        rig.transitions().as_slice(),
        [GraspEvent::Ungrasped { hand: Hand::Left, .. }]
    ));

    // 手移开后冷却逐步归零
    let mut frame = HandFrame::open_at(Pose::from_position(Vec3::new(0.0, 1.0, -1.0)));
    frame.set_curls(0.5);
    rig.hands.set(Hand::Left, frame);
    let ticks = (cooldown / DT).ceil() as usize;
    for _ in 0..ticks - 1 {
        rig.tick();
    }
    assert!(rig.state(Hand::Left).regrasp_timer() > 0.0);
    rig.tick();
    assert_eq!(rig.state(Hand::Left).regrasp_timer(), 0.0);
}

#[test]
fn test_two_hand_attach_and_detach_events() {
    let mut rig = Rig::dynamic();
    rig.grip(Hand::Left);
    rig.grip(Hand::Right);
    rig.tick();

    let id = rig.id;
    assert_eq!(
        rig.transitions(),
        vec![
            GraspEvent::Grasped {
                object: id,
                hand: Hand::Left
            },
            GraspEvent::HandAttached {
                object: id,
                hand: Hand::Right
            },
        ]
    );

    rig.hands.get_mut(Hand::Right).set_curls(0.3);
    rig.tick();
    assert_eq!(
        rig.transitions(),
        vec![GraspEvent::HandDetached {
            object: id,
            hand: Hand::Right
        }]
    );
    assert!(rig.engine.is_grasped(id).unwrap());
    assert!(!rig.body().gravity);

    rig.hands.get_mut(Hand::Left).set_curls(0.3);
    rig.tick();
    assert!(matches!(
        rig.transitions().as_slice(),
        [GraspEvent::Ungrasped { hand: Hand::Left, .. }]
    ));
    assert!(!rig.engine.is_grasped(id).unwrap());
}

#[test]
fn test_throw_boost_scales_hand_velocity() {
    let mut config = GraspConfig::default();
    config.motion.throw_boost = true;
    config.motion.throw_velocity_power = 9.3;
    let mut rig = Rig::new(config, SimpleBody::dynamic(Pose::from_position(OBJECT_POS)));

    rig.grip(Hand::Left);
    rig.tick();
    rig.transitions();

    let frame = rig.hands.get_mut(Hand::Left);
    frame.linear_velocity = Vec3::new(2.0, 0.0, 0.0);
    frame.set_curls(0.3);
    rig.tick();

    let events = rig.transitions();
    let [GraspEvent::Ungrasped {
        release_velocity, ..
    }] = events.as_slice()
    else {
        panic!("expected a single release, got {:?}", events);
    };
    assert!((*release_velocity - Vec3::new(18.6, 0.0, 0.0)).length() < 1e-4);
    assert!((rig.body().linear_velocity - Vec3::new(18.6, 0.0, 0.0)).length() < 1e-4);
}

#[test]
fn test_release_without_throw_boost_keeps_simulated_velocity() {
    let mut config = GraspConfig::default();
    config.motion.throw_boost = false;
    config.motion.throw_velocity_power = 9.3;
    let mut rig = Rig::new(config, SimpleBody::dynamic(Pose::from_position(OBJECT_POS)));

    rig.grip(Hand::Left);
    rig.tick();

    let simulated = Vec3::new(0.3, -0.1, 0.0);
    rig.world.bodies.get_mut(&BODY).unwrap().linear_velocity = simulated;
    let frame = rig.hands.get_mut(Hand::Left);
    frame.linear_velocity = Vec3::new(2.0, 0.0, 0.0);
    frame.set_curls(0.3);
    rig.tick();

    assert!(!rig.engine.is_grasped(rig.id).unwrap());
    assert_eq!(rig.body().linear_velocity, simulated);
}

#[test]
fn test_hover_threshold_is_strict() {
    let mut world = SphereWorld::new();
    world.add_body(BODY, SimpleBody::dynamic(Pose::IDENTITY), VOLUME, 0.25);
    let mut config = GraspConfig::default();
    config.hover.hover_distance = 0.5;
    let mut engine = GraspEngine::new(config);
    let id = engine
        .register_object(ObjectDesc::new(BODY, vec![VOLUME]), &world)
        .unwrap();

    let mut frame = HandFrame::open_at(Pose::from_position(Vec3::new(0.0, 0.0, 3.0)));
    let pinch_at = |x: f32| PinchInfo {
        center: Vec3::new(x, 0.0, 0.0),
        distance: 0.05,
        amount: 0.0,
    };
    frame.set_pinch(Finger::Index, pinch_at(0.75));
    let mut hands = HandSet::new(frame, HandFrame::untracked());

    engine.frame_update(&hands, &world);
    assert!(!engine.is_hovering(id).unwrap());
    assert_eq!(engine.hover_t_value(id).unwrap(), 0.0);
    assert!(engine.drain_events().is_empty());

    hands
        .get_mut(Hand::Left)
        .set_pinch(Finger::Index, pinch_at(0.74));
    engine.frame_update(&hands, &world);
    assert!(engine.is_hovering(id).unwrap());
    assert_eq!(engine.hover_hand(id).unwrap(), Some(Hand::Left));
    assert!((engine.hover_t_value(id).unwrap() - 0.02).abs() < 1e-4);
    assert_eq!(
        engine.drain_events(),
        vec![GraspEvent::HoverStarted {
            object: id,
            hand: Hand::Left
        }]
    );

    hands.get_mut(Hand::Left).tracked = false;
    engine.frame_update(&hands, &world);
    assert!(!engine.is_hovering(id).unwrap());
    assert_eq!(
        engine.drain_events(),
        vec![GraspEvent::HoverEnded {
            object: id,
            hand: Hand::Left
        }]
    );
}

#[test]
fn test_respawn_is_idempotent() {
    let mut rig = Rig::dynamic();
    let respawn = Pose::new(Vec3::new(1.0, 0.5, 0.0), Quat::from_rotation_y(0.5));
    rig.engine.set_respawn_location(rig.id, respawn).unwrap();

    rig.grip(Hand::Left);
    rig.tick();
    assert!(rig.engine.is_grasped(rig.id).unwrap());
    rig.transitions();

    let body = rig.world.bodies.get_mut(&BODY).unwrap();
    body.position = Vec3::new(3.0, 2.0, 1.0);
    body.linear_velocity = Vec3::new(1.0, 1.0, 1.0);
    body.angular_velocity = Vec3::new(0.0, 4.0, 0.0);

    rig.engine.respawn(rig.id, &mut rig.world).unwrap();
    assert!(matches!(
        rig.transitions().as_slice(),
        [GraspEvent::Ungrasped { release_velocity, .. }] if *release_velocity == Vec3::ZERO
    ));
    let first = rig.body().clone();

    rig.engine.respawn(rig.id, &mut rig.world).unwrap();
    assert!(rig.transitions().is_empty());
    let second = rig.body().clone();

    for body in [&first, &second] {
        assert_eq!(body.position, respawn.position);
        assert_eq!(body.rotation, respawn.orientation);
        assert_eq!(body.linear_velocity, Vec3::ZERO);
        assert_eq!(body.angular_velocity, Vec3::ZERO);
        assert!(body.gravity);
    }
    assert!(!rig.engine.is_grasped(rig.id).unwrap());
    assert_eq!(rig.state(Hand::Left).regrasp_timer(), 0.0);
    assert_eq!(rig.state(Hand::Left).started_count(), 0);
}

#[test]
fn test_offsets_stay_fixed_while_hand_moves() {
    let mut rig = Rig::dynamic();
    rig.grip(Hand::Left);
    rig.tick();

    let position_offset = rig.state(Hand::Left).grasp_position_offset();
    let rotation_offset = rig.state(Hand::Left).grasp_rotation_offset();

    for i in 1..=30 {
        let t = i as f32 / 30.0;
        let palm = Pose::new(
            PALM_POS + Vec3::new(0.2 * t, 0.1 * t, 0.0),
            Quat::from_rotation_y(0.4 * t),
        );
        rig.hands.get_mut(Hand::Left).move_to(palm);
        rig.tick();
        rig.world.step(DT, Vec3::ZERO);

        assert!(rig.engine.is_grasped(rig.id).unwrap());
        let state = rig.state(Hand::Left);
        assert_eq!(state.grasp_position_offset(), position_offset);
        assert_eq!(state.grasp_rotation_offset(), rotation_offset);
    }
    assert!(rig.engine.strain(rig.id).unwrap().is_finite());
}

#[test]
fn test_kinematic_object_follows_hand_translation() {
    let mut rig = Rig::new(
        GraspConfig::default(),
        SimpleBody::kinematic(Pose::from_position(OBJECT_POS)),
    );
    rig.grip(Hand::Left);
    rig.tick();

    let shift = Vec3::new(0.1, -0.05, 0.2);
    rig.hands
        .get_mut(Hand::Left)
        .move_to(Pose::from_position(PALM_POS + shift));
    rig.tick();

    assert!((rig.body().position - (OBJECT_POS + shift)).length() < 1e-5);
    assert!(rotation_close(rig.body().rotation, Quat::IDENTITY, 1e-5));
}

#[test]
fn test_rigid_fit_recovers_hand_motion() {
    let mut config = GraspConfig::default();
    config.solver.method = PoseSolveMethod::RigidFit;
    let start = Pose::new(OBJECT_POS, Quat::from_rotation_x(0.2));
    let mut rig = Rig::new(config, SimpleBody::kinematic(start));
    rig.grip(Hand::Left);
    rig.tick();
    assert!(rig.engine.is_grasped(rig.id).unwrap());

    let palm = Pose::from_position(PALM_POS);
    let moved = Pose::new(PALM_POS + Vec3::new(0.1, 0.05, 0.0), Quat::from_rotation_y(0.3));
    rig.hands.get_mut(Hand::Left).move_to(moved);
    rig.tick();

    let expected = moved.mul_pose(&palm.inverse()).mul_pose(&start);
    assert!((rig.body().position - expected.position).length() < 1e-4);
    assert!(rotation_close(rig.body().rotation, expected.orientation, 1e-4));
}

#[test]
fn test_rigid_fit_through_dyn_hand_source() {
    let mut config = GraspConfig::default();
    config.solver.method = PoseSolveMethod::RigidFit;
    let mut rig = Rig::new(config, SimpleBody::kinematic(Pose::from_position(OBJECT_POS)));
    rig.grip(Hand::Left);

    let shift = Vec3::new(0.0, 0.1, 0.0);
    for moved in [false, true] {
        if moved {
            rig.hands
                .get_mut(Hand::Left)
                .move_to(Pose::from_position(PALM_POS + shift));
        }
        let hands: &dyn HandPoseSource = &rig.hands;
        rig.engine.fixed_update(hands, &mut rig.world, DT);
    }

    assert!(rig.engine.is_grasped(rig.id).unwrap());
    assert!((rig.body().position - (OBJECT_POS + shift)).length() < 1e-4);
}

#[test]
fn test_untracked_hand_holds_object_in_place() {
    let mut rig = Rig::dynamic();
    rig.grip(Hand::Left);
    rig.tick();
    rig.transitions();

    rig.world.bodies.get_mut(&BODY).unwrap().linear_velocity = Vec3::new(0.0, -1.0, 0.0);
    rig.hands.get_mut(Hand::Left).tracked = false;
    for _ in 0..20 {
        rig.tick();
    }
    assert!(rig.engine.is_grasped(rig.id).unwrap());
    assert_eq!(rig.body().linear_velocity, Vec3::ZERO);
    assert!(rig.transitions().is_empty());
}

#[test]
fn test_suspended_hand_reports_no_strain() {
    let mut rig = Rig::dynamic();
    rig.grip(Hand::Left);
    rig.tick();

    // 对象不积分，手前移后拉伸等于位移
    rig.hands
        .get_mut(Hand::Left)
        .move_to(Pose::from_position(PALM_POS + Vec3::new(0.2, 0.0, 0.0)));
    rig.tick();
    let strain = rig.engine.hand_strain(rig.id, Hand::Left).unwrap();
    assert!((strain - 0.2).abs() < 1e-4, "strain was {}", strain);

    rig.hands.get_mut(Hand::Left).tracked = false;
    for _ in 0..50 {
        rig.tick();
    }
    assert!(rig.engine.is_grasped(rig.id).unwrap());
    assert_eq!(rig.engine.hand_strain(rig.id, Hand::Left).unwrap(), 0.0);
    assert_eq!(rig.engine.strain(rig.id).unwrap(), 0.0);
}

#[test]
fn test_averaging_coincident_hands_matches_single_hand() {
    let object = Pose::new(OBJECT_POS, Quat::from_rotation_z(0.3));
    let left = HandContribution {
        hand: Hand::Left,
        palm: Pose::new(PALM_POS, Quat::from_rotation_y(0.4)),
        live_center: OBJECT_POS + Vec3::new(0.01, 0.02, 0.0),
        position_offset: Vec3::new(0.0, 0.0, -0.03),
        rotation_offset: Quat::from_rotation_x(0.25),
        start_constellation: [Vec3::ZERO; 5],
        live_constellation: [Vec3::ZERO; 5],
    };
    let right = HandContribution {
        hand: Hand::Right,
        ..left
    };

    let single = solve_average(&object, &[left]).unwrap();
    let both = solve_average(&object, &[left, right]).unwrap();
    assert!((single.position - both.position).length() < 1e-5);
    assert!(rotation_close(single.orientation, both.orientation, 1e-5));
}

fn overlap_frame(tracked: bool, overlaps: [bool; 5], curl: f32) -> HandFrame {
    let mut frame = HandFrame::open_at(Pose::from_position(PALM_POS));
    frame.set_curls(curl);
    frame.tracked = tracked;
    for finger in Finger::ALL {
        let point = if overlaps[finger.index()] {
            OBJECT_POS
        } else {
            Vec3::new(0.0, 1.0, -2.0)
        };
        frame.set_fingertip(finger, point);
    }
    frame
}

proptest! {
    #[test]
    fn prop_grasp_starts_exactly_on_thumb_plus_opposing_finger(
        ticks in proptest::collection::vec(
            (any::<bool>(), proptest::array::uniform5(any::<bool>()), 0.2f32..1.0),
            1..80,
        )
    ) {
        let config = DetectorConfig::default();
        let detector = GraspDetector::new(&config);
        let mut world = SphereWorld::new();
        world.add_sphere(VOLUME, OBJECT_POS, 0.05);
        let object = Pose::from_position(OBJECT_POS);
        let mut state = GraspState::default();
        let mut buffer = OverlapBuffer::new();

        for (tracked, overlaps, curl) in ticks {
            let was_grasping = state.is_grasping();
            // 本步开头冷却递减后的值
            let cooled = (state.regrasp_timer() - DT).max(0.0) < 1e-5;
            let hands = HandSet::new(
                overlap_frame(tracked, overlaps, curl),
                HandFrame::untracked(),
            );
            detector.update(
                &mut state,
                &hands,
                Hand::Left,
                &world,
                &[VOLUME],
                &object,
                DT,
                &mut buffer,
            );

            let thumb = overlaps[Finger::Thumb.index()];
            let opposing = Finger::OPPOSING.iter().any(|f| overlaps[f.index()]);
            if was_grasping {
                if !state.is_grasping() {
                    prop_assert!(tracked);
                    prop_assert_eq!(state.regrasp_timer(), config.regrasp_cooldown);
                }
            } else {
                let should_start = tracked && thumb && opposing && cooled;
                prop_assert_eq!(state.is_grasping(), should_start);
            }
        }
    }
}
