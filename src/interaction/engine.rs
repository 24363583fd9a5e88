//! 抓取引擎
//!
//! 持有全部可抓取对象，按两种节奏推进：
//!
//! - [`GraspEngine::fixed_update`]：固定物理步。按对象ID顺序，对每个对象先完成两只手的
//!   抓取检测与状态转换（含松手），再求解、约束并驱动刚体。
//! - [`GraspEngine::frame_update`]：渲染帧。只更新悬停，可以被跳过或在两个固定步
//!   之间运行多次，不触碰抓取状态。
//!
//! 手部数据每次调用时传入，引擎不持有任何全局手部实例。每帧更新从不返回错误，
//! 故障降级为"本步不改变运动"并通过 `tracing` 记录。

use super::body::{GraspWorld, RigidBody};
use super::collision::{CollisionQuery, OverlapBuffer};
use super::constraint::Constraint;
use super::detector::{GraspDetector, HandTransition};
use super::events::{GraspEvent, GraspEventBus};
use super::hand::HandPoseSource;
use super::hover::{HoverChange, HoverTarget};
use super::motion::MotionDriver;
use super::object::{GraspableObject, ObjectDesc};
use super::solver::{GraspPoseSolver, HandContribution};
use super::state::GraspState;
use super::strain::hand_strain;
use super::ObjectId;
use crate::config::GraspConfig;
use crate::core::error::{GraspError, GraspResult};
use crate::xr::{Hand, Pose};
use glam::Vec3;
use std::collections::BTreeMap;

/// 抓取引擎
pub struct GraspEngine {
    config: GraspConfig,
    solver: GraspPoseSolver,
    objects: BTreeMap<ObjectId, GraspableObject>,
    next_id: u32,
    events: GraspEventBus,
    overlap_buffer: OverlapBuffer,
}

impl GraspEngine {
    pub fn new(config: GraspConfig) -> Self {
        let solver = GraspPoseSolver::new(config.solver.method);
        Self {
            config,
            solver,
            objects: BTreeMap::new(),
            next_id: 1,
            events: GraspEventBus::new(),
            overlap_buffer: OverlapBuffer::new(),
        }
    }

    pub fn config(&self) -> &GraspConfig {
        &self.config
    }

    pub fn events(&self) -> &GraspEventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut GraspEventBus {
        &mut self.events
    }

    /// 分发本帧积累的事件
    pub fn process_events(&mut self) {
        self.events.process_events();
    }

    /// 取走本帧积累的事件
    pub fn drain_events(&mut self) -> Vec<GraspEvent> {
        self.events.drain()
    }

    // ========================================================================
    // 对象管理
    // ========================================================================

    /// 注册可抓取对象
    pub fn register_object<W: GraspWorld + ?Sized>(
        &mut self,
        desc: ObjectDesc,
        world: &W,
    ) -> GraspResult<ObjectId> {
        let body = world.body(desc.body).ok_or(GraspError::BodyNotFound(desc.body))?;
        if desc.volumes.is_empty() {
            return Err(GraspError::InvalidParameter(
                "graspable object needs at least one collision volume".to_string(),
            ));
        }

        let id = ObjectId(self.next_id);
        self.next_id += 1;

        let object = GraspableObject::new(id, desc, body.pose(), body.use_gravity());
        tracing::info!(
            target: "grasp",
            "Registered graspable {:?} (body {:?}, {} volumes, radius {:.3})",
            id,
            object.body,
            object.volumes.len(),
            object.bounding_radius
        );
        self.objects.insert(id, object);
        Ok(id)
    }

    /// 注销对象；刚体本身不受影响
    pub fn unregister_object(&mut self, id: ObjectId) -> GraspResult<GraspableObject> {
        let object = self
            .objects
            .remove(&id)
            .ok_or(GraspError::ObjectNotFound(id))?;
        tracing::info!(target: "grasp", "Unregistered graspable {:?}", id);
        Ok(object)
    }

    pub fn object(&self, id: ObjectId) -> Option<&GraspableObject> {
        self.objects.get(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &GraspableObject> {
        self.objects.values()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn get(&self, id: ObjectId) -> GraspResult<&GraspableObject> {
        self.objects.get(&id).ok_or(GraspError::ObjectNotFound(id))
    }

    fn get_mut(&mut self, id: ObjectId) -> GraspResult<&mut GraspableObject> {
        self.objects
            .get_mut(&id)
            .ok_or(GraspError::ObjectNotFound(id))
    }

    // ========================================================================
    // 更新
    // ========================================================================

    /// 固定物理步
    pub fn fixed_update<H, W>(&mut self, hands: &H, world: &mut W, dt: f32)
    where
        H: HandPoseSource + ?Sized,
        W: GraspWorld + ?Sized,
    {
        if !(dt > 0.0) || !dt.is_finite() {
            tracing::warn!(target: "grasp", "Skipping fixed update with invalid dt {}", dt);
            return;
        }

        let Self {
            config,
            solver,
            objects,
            events,
            overlap_buffer,
            ..
        } = self;

        let tick = TickContext {
            config,
            solver,
            detector: GraspDetector::new(&config.detector),
            driver: MotionDriver::new(&config.motion),
        };

        for object in objects.values_mut() {
            tick.step_object(object, hands, world, dt, events, overlap_buffer);
        }
    }

    /// 渲染帧：更新悬停
    pub fn frame_update<H, C>(&mut self, hands: &H, collision: &C)
    where
        H: HandPoseSource + ?Sized,
        C: CollisionQuery + ?Sized,
    {
        let threshold = self.config.hover.hover_distance;
        for object in self.objects.values_mut() {
            let target = HoverTarget {
                volumes: &object.volumes,
                center: object.last_pose.position,
                bounding_radius: object.bounding_radius,
            };
            let changes = object.hover.update(hands, collision, &target, threshold);
            push_hover_events(&mut self.events, object.id, changes);
        }
    }

    // ========================================================================
    // 查询
    // ========================================================================

    pub fn is_grasped(&self, id: ObjectId) -> GraspResult<bool> {
        Ok(self.get(id)?.is_grasped)
    }

    pub fn is_hovering(&self, id: ObjectId) -> GraspResult<bool> {
        Ok(self.get(id)?.hover.is_hovering())
    }

    /// 悬停强度：0（阈值处）到 1（表面）
    pub fn hover_t_value(&self, id: ObjectId) -> GraspResult<f32> {
        Ok(self
            .get(id)?
            .hover
            .t_value(self.config.hover.hover_distance))
    }

    /// 最近的悬停手
    pub fn hover_hand(&self, id: ObjectId) -> GraspResult<Option<Hand>> {
        Ok(self.get(id)?.hover.hover_hand())
    }

    /// 对象整体拉伸量（各手最大值）
    pub fn strain(&self, id: ObjectId) -> GraspResult<f32> {
        Ok(self.get(id)?.strain.max())
    }

    pub fn hand_strain(&self, id: ObjectId, hand: Hand) -> GraspResult<f32> {
        Ok(self.get(id)?.strain.hand(hand))
    }

    pub fn grasp_state(&self, id: ObjectId, hand: Hand) -> GraspResult<&GraspState> {
        Ok(self.get(id)?.grasp_state(hand))
    }

    // ========================================================================
    // 命令
    // ========================================================================

    pub fn set_respawn_location(&mut self, id: ObjectId, pose: Pose) -> GraspResult<()> {
        if !pose.is_finite() {
            return Err(GraspError::InvalidParameter(format!(
                "respawn pose must be finite, got {:?}",
                pose
            )));
        }
        self.get_mut(id)?.respawn_pose = pose;
        Ok(())
    }

    /// 重生：强制松手（不抛掷），清空悬停与冷却，刚体回到重生姿态且速度归零
    pub fn respawn<W: GraspWorld + ?Sized>(&mut self, id: ObjectId, world: &mut W) -> GraspResult<()> {
        let object = self
            .objects
            .get_mut(&id)
            .ok_or(GraspError::ObjectNotFound(id))?;
        let body = world
            .body_mut(object.body)
            .ok_or(GraspError::BodyNotFound(object.body))?;

        if object.is_grasped {
            let holders: Vec<Hand> = object.grasping_hands().collect();
            if let Some((last, others)) = holders.split_last() {
                for hand in others {
                    self.events.push_event(GraspEvent::HandDetached {
                        object: id,
                        hand: *hand,
                    });
                }
                self.events.push_event(GraspEvent::Ungrasped {
                    object: id,
                    hand: *last,
                    release_velocity: Vec3::ZERO,
                    release_angular_velocity: Vec3::ZERO,
                });
            }
        }

        for state in object.grasp.iter_mut() {
            state.reset();
        }
        let hover_changes = object.hover.reset();
        push_hover_events(&mut self.events, id, hover_changes);
        object.strain.reset();
        object.is_grasped = false;
        object.first_drive = false;

        body.set_pose(object.respawn_pose);
        body.set_linear_velocity(Vec3::ZERO);
        body.set_angular_velocity(Vec3::ZERO);
        body.set_use_gravity(object.default_gravity);
        object.last_pose = object.respawn_pose;

        tracing::debug!(target: "grasp", "Respawned {:?} at {:?}", id, object.respawn_pose.position);
        Ok(())
    }

    /// 设置或清除姿态约束
    pub fn set_constraint(
        &mut self,
        id: ObjectId,
        constraint: Option<Box<dyn Constraint>>,
    ) -> GraspResult<()> {
        self.get_mut(id)?.constraint = constraint;
        Ok(())
    }

    /// 设置未抓取时的重力开关；对象未被抓取时在下一个固定步生效
    pub fn set_default_gravity(&mut self, id: ObjectId, enabled: bool) -> GraspResult<()> {
        self.get_mut(id)?.default_gravity = enabled;
        Ok(())
    }
}

fn push_hover_events(
    events: &mut GraspEventBus,
    object: ObjectId,
    changes: [Option<HoverChange>; 2],
) {
    for change in changes.into_iter().flatten() {
        let event = match change {
            HoverChange::Started(hand) => {
                tracing::debug!(target: "hover", "{:?} hand hovering {:?}", hand, object);
                GraspEvent::HoverStarted { object, hand }
            }
            HoverChange::Ended(hand) => {
                tracing::debug!(target: "hover", "{:?} hand left {:?}", hand, object);
                GraspEvent::HoverEnded { object, hand }
            }
        };
        events.push_event(event);
    }
}

/// 一次固定步内共享的只读上下文
struct TickContext<'a> {
    config: &'a GraspConfig,
    solver: &'a GraspPoseSolver,
    detector: GraspDetector<'a>,
    driver: MotionDriver<'a>,
}

impl TickContext<'_> {
    fn step_object<H, W>(
        &self,
        object: &mut GraspableObject,
        hands: &H,
        world: &mut W,
        dt: f32,
        events: &mut GraspEventBus,
        buffer: &mut OverlapBuffer,
    ) where
        H: HandPoseSource + ?Sized,
        W: GraspWorld + ?Sized,
    {
        let Some(body) = world.body(object.body) else {
            tracing::warn!(
                target: "grasp",
                "Graspable {:?} lost its rigid body {:?}",
                object.id,
                object.body
            );
            return;
        };
        let pose = body.pose();
        let body_gravity = body.use_gravity();
        object.last_pose = pose;

        if !object.is_grasped && body_gravity != object.default_gravity {
            if let Some(body) = world.body_mut(object.body) {
                body.set_use_gravity(object.default_gravity);
            }
        }

        // 1. 两只手的抓取检测（含松手）在驱动之前全部完成
        let mut transitions = [HandTransition::None; 2];
        for hand in Hand::BOTH {
            transitions[hand.index()] = self.detector.update(
                &mut object.grasp[hand.index()],
                hands,
                hand,
                &*world,
                &object.volumes,
                &pose,
                dt,
                buffer,
            );
        }

        self.apply_transitions(object, &transitions, hands, world, events);

        if !object.is_grasped {
            return;
        }

        // 2. 拉伸量：基于驱动前的姿态
        for hand in Hand::BOTH {
            let state = &object.grasp[hand.index()];
            // 暂停中的手没有实时抓取中心，拉伸记为0
            let strain = if state.is_grasping() && hands.is_tracking(hand) {
                hand_strain(state, &hands.palm_pose(hand), &pose)
            } else {
                0.0
            };
            object.strain.set(hand, strain);
        }

        // 3. 求解、约束、驱动
        let mut contributions: [Option<HandContribution>; 2] = [None, None];
        for hand in Hand::BOTH {
            let state = &object.grasp[hand.index()];
            if state.is_grasping() && hands.is_tracking(hand) {
                contributions[hand.index()] = Some(HandContribution::from_state(
                    hand,
                    state,
                    hands,
                    self.config.detector.palm_normal_offset,
                ));
            }
        }
        let solved = match contributions {
            [Some(left), Some(right)] => self.solver.solve(&pose, &[left, right]),
            [Some(single), None] | [None, Some(single)] => self.solver.solve(&pose, &[single]),
            [None, None] => None,
        };

        let Some(body) = world.body_mut(object.body) else {
            return;
        };

        let Some(target) = solved else {
            if object.grasping_hands().next().is_none() {
                tracing::warn!(
                    target: "grasp",
                    "{:?} is marked grasped but no hand holds it; holding pose",
                    object.id
                );
            } else {
                tracing::trace!(target: "grasp", "{:?} suspended: grasping hands untracked", object.id);
            }
            if !body.is_kinematic() {
                body.set_linear_velocity(Vec3::ZERO);
                body.set_angular_velocity(Vec3::ZERO);
            }
            return;
        };

        let target = match &object.constraint {
            Some(constraint) => constraint.apply(target),
            None => target,
        };

        let outcome = self.driver.drive(body, &target, dt, object.first_drive);
        object.first_drive = false;
        tracing::trace!(
            target: "grasp::motion",
            "{:?} driven toward {:?} (strength {:.2})",
            object.id,
            target.position,
            outcome.strength
        );
        events.push_event(GraspEvent::GraspMoved { object: object.id });
    }

    fn apply_transitions<H, W>(
        &self,
        object: &mut GraspableObject,
        transitions: &[HandTransition; 2],
        hands: &H,
        world: &mut W,
        events: &mut GraspEventBus,
    ) where
        H: HandPoseSource + ?Sized,
        W: GraspWorld + ?Sized,
    {
        let id = object.id;
        let still_grasping = object.grasp.iter().any(|s| s.is_grasping());

        let mut releases_left = transitions
            .iter()
            .filter(|t| **t == HandTransition::Released)
            .count();
        for hand in Hand::BOTH {
            if transitions[hand.index()] != HandTransition::Released {
                continue;
            }
            releases_left -= 1;
            if still_grasping || releases_left > 0 {
                events.push_event(GraspEvent::HandDetached { object: id, hand });
            } else if object.is_grasped {
                self.release_object(object, hand, hands, world, events);
            }
        }

        for hand in Hand::BOTH {
            if transitions[hand.index()] != HandTransition::Started {
                continue;
            }
            if object.is_grasped {
                tracing::debug!(target: "grasp", "{:?} hand attached to {:?}", hand, id);
                events.push_event(GraspEvent::HandAttached { object: id, hand });
            } else {
                object.is_grasped = true;
                object.first_drive = true;
                if let Some(body) = world.body_mut(object.body) {
                    body.set_use_gravity(false);
                }
                tracing::debug!(target: "grasp", "{:?} grasped by {:?} hand", id, hand);
                events.push_event(GraspEvent::Grasped { object: id, hand });
            }
        }
    }

    fn release_object<H, W>(
        &self,
        object: &mut GraspableObject,
        hand: Hand,
        hands: &H,
        world: &mut W,
        events: &mut GraspEventBus,
    ) where
        H: HandPoseSource + ?Sized,
        W: GraspWorld + ?Sized,
    {
        object.is_grasped = false;
        object.first_drive = false;
        object.strain.reset();

        let (release_velocity, release_angular_velocity) = match world.body_mut(object.body) {
            Some(body) => {
                let velocity = self.driver.release(
                    body,
                    hands.linear_velocity(hand),
                    hands.angular_velocity(hand),
                );
                body.set_use_gravity(object.default_gravity);
                velocity
            }
            None => (Vec3::ZERO, Vec3::ZERO),
        };

        tracing::debug!(
            target: "grasp",
            "{:?} released by {:?} hand with velocity {:?}",
            object.id,
            hand,
            release_velocity
        );
        events.push_event(GraspEvent::Ungrasped {
            object: object.id,
            hand,
            release_velocity,
            release_angular_velocity,
        });
    }
}
