//! bevy_ecs 集成
//!
//! 两种节奏分成两个调度：
//! - 固定调度：注册新对象、抓取固定步、物理步、同步变换，按累积时间可能一帧运行多次
//! - 帧调度：悬停更新、事件转发，每帧一次

use crate::config::GraspConfig;
use crate::interaction::{GraspEngine, GraspEvent, HandSet, ObjectDesc, ObjectId, RigidBody as _};
use crate::physics::{
    Collider3D, ColliderDesc3D, PhysicsWorld3D, RigidBody3D, RigidBodyDesc3D,
};
use crate::xr::Pose;
use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};

/// 单帧最多追赶的固定步数
pub const MAX_FIXED_STEPS_PER_FRAME: u32 = 8;

#[derive(Component, Clone, Copy, Debug)]
pub struct Transform {
    pub pos: Vec3,
    pub rot: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            pos: Vec3::ZERO,
            rot: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Resource)]
pub struct Time {
    pub delta_seconds: f32,
    pub elapsed_seconds: f64,
    pub fixed_time_step: f64,
    /// 固定步之间的插值系数
    pub alpha: f64,
}

impl Default for Time {
    fn default() -> Self {
        Self {
            delta_seconds: 0.0,
            elapsed_seconds: 0.0,
            fixed_time_step: 1.0 / 90.0,
            alpha: 0.0,
        }
    }
}

/// 待创建的可抓取对象：刚体 + 碰撞体 + 抓取参数
#[derive(Component, Clone, Debug)]
pub struct GraspableDesc {
    pub body: RigidBodyDesc3D,
    pub colliders: Vec<ColliderDesc3D>,
    pub respawn_pose: Option<Pose>,
    pub default_gravity: Option<bool>,
}

impl GraspableDesc {
    pub fn new(body: RigidBodyDesc3D, collider: ColliderDesc3D) -> Self {
        Self {
            body,
            colliders: vec![collider],
            respawn_pose: None,
            default_gravity: None,
        }
    }
}

/// 已注册到抓取引擎的对象
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Graspable {
    pub id: ObjectId,
}

/// 抓取引擎资源
#[derive(Resource)]
pub struct GraspEngineResource(pub GraspEngine);

/// 本帧的手部输入
#[derive(Resource, Default)]
pub struct HandInput(pub HandSet);

/// 转发到 bevy 事件系统的抓取事件
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct GraspEventMessage(pub GraspEvent);

// --- Systems ---

pub fn init_graspables_system(
    mut commands: Commands,
    mut physics: ResMut<PhysicsWorld3D>,
    mut engine: ResMut<GraspEngineResource>,
    query: Query<(Entity, &GraspableDesc), Without<Graspable>>,
) {
    let mut added = false;
    for (entity, desc) in query.iter() {
        let body = physics.add_body(&desc.body);
        let handles = desc
            .colliders
            .iter()
            .filter_map(|collider| physics.add_collider(body, collider))
            .map(crate::physics::collider_handle)
            .collect::<Vec<_>>();
        added = true;

        let mut object = ObjectDesc::new(body, physics.body_volumes(body));
        if let Some(radius) = physics.bounding_radius(body) {
            object = object.with_bounding_radius(radius);
        }
        if let Some(pose) = desc.respawn_pose {
            object = object.with_respawn_pose(pose);
        }
        if let Some(gravity) = desc.default_gravity {
            object = object.with_default_gravity(gravity);
        }

        match engine.0.register_object(object, &*physics) {
            Ok(id) => {
                commands.entity(entity).insert((
                    Graspable { id },
                    RigidBody3D {
                        handle: crate::physics::body_handle(body),
                    },
                    Collider3D { handles },
                    Transform {
                        pos: desc.body.position,
                        rot: desc.body.rotation,
                        ..Default::default()
                    },
                ));
            }
            Err(e) => {
                tracing::warn!(target: "grasp", "Failed to register graspable {:?}: {}", entity, e);
                physics.remove_body(body);
                commands.entity(entity).remove::<GraspableDesc>();
            }
        }
    }
    if added {
        physics.refresh_queries();
    }
}

pub fn grasp_fixed_update_system(
    mut engine: ResMut<GraspEngineResource>,
    mut physics: ResMut<PhysicsWorld3D>,
    hands: Res<HandInput>,
    time: Res<Time>,
) {
    engine
        .0
        .fixed_update(&hands.0, &mut *physics, time.fixed_time_step as f32);
}

pub fn physics_step_system(mut physics: ResMut<PhysicsWorld3D>, time: Res<Time>) {
    physics.integration_parameters.dt = time.fixed_time_step as f32;
    physics.step();
}

pub fn hover_update_system(
    mut engine: ResMut<GraspEngineResource>,
    physics: Res<PhysicsWorld3D>,
    hands: Res<HandInput>,
) {
    engine.0.frame_update(&hands.0, &*physics);
}

pub fn sync_body_to_transform_system(
    physics: Res<PhysicsWorld3D>,
    mut query: Query<(&RigidBody3D, &mut Transform)>,
) {
    for (rb_comp, mut transform) in query.iter_mut() {
        if let Some(rb) = physics.rigid_body_set.get(rb_comp.handle) {
            let pose = rb.pose();
            transform.pos = pose.position;
            transform.rot = pose.orientation;
        }
    }
}

pub fn forward_grasp_events_system(
    mut engine: ResMut<GraspEngineResource>,
    mut writer: EventWriter<GraspEventMessage>,
) {
    let pending = engine.0.events().pending().to_vec();
    engine.0.process_events();
    for event in pending {
        writer.send(GraspEventMessage(event));
    }
}

// --- App ---

/// 持有 World 与两个调度的最小应用
pub struct GraspApp {
    pub world: World,
    pub fixed_schedule: Schedule,
    pub frame_schedule: Schedule,
    accumulator: f64,
}

impl GraspApp {
    pub fn new(config: GraspConfig) -> Self {
        let mut world = World::new();
        world.insert_resource(Time {
            fixed_time_step: f64::from(config.simulation.fixed_time_step),
            ..Default::default()
        });
        world.insert_resource(PhysicsWorld3D::with_settings(
            Vec3::from_array(config.simulation.gravity),
            config.simulation.fixed_time_step,
        ));
        world.insert_resource(HandInput::default());
        world.insert_resource(GraspEngineResource(GraspEngine::new(config)));
        world.init_resource::<Events<GraspEventMessage>>();

        let mut fixed_schedule = Schedule::default();
        fixed_schedule.add_systems(
            (
                init_graspables_system,
                grasp_fixed_update_system,
                physics_step_system,
                sync_body_to_transform_system,
            )
                .chain(),
        );

        let mut frame_schedule = Schedule::default();
        frame_schedule.add_systems((hover_update_system, forward_grasp_events_system).chain());

        Self {
            world,
            fixed_schedule,
            frame_schedule,
            accumulator: 0.0,
        }
    }

    pub fn spawn_graspable(&mut self, desc: GraspableDesc) -> Entity {
        self.world.spawn(desc).id()
    }

    /// 注销对象并删除其刚体
    pub fn despawn_graspable(&mut self, entity: Entity) -> bool {
        let Some(graspable) = self.world.get::<Graspable>(entity).copied() else {
            return false;
        };
        let body = self.world.get::<RigidBody3D>(entity).map(|rb| rb.handle);
        if let Err(e) = self
            .world
            .resource_mut::<GraspEngineResource>()
            .0
            .unregister_object(graspable.id)
        {
            tracing::warn!(target: "grasp", "Despawning {:?}: {}", entity, e);
        }
        if let Some(handle) = body {
            self.world
                .resource_mut::<PhysicsWorld3D>()
                .remove_body(crate::physics::body_id(handle));
        }
        self.world.despawn(entity)
    }

    pub fn set_hands(&mut self, hands: HandSet) {
        self.world.resource_mut::<HandInput>().0 = hands;
    }

    pub fn engine(&self) -> &GraspEngine {
        &self.world.resource::<GraspEngineResource>().0
    }

    pub fn engine_mut(&mut self) -> &mut GraspEngine {
        &mut self.world.resource_mut::<GraspEngineResource>().into_inner().0
    }

    /// 推进一帧，返回本帧运行的固定步数
    pub fn update(&mut self, dt: f32) -> u32 {
        self.world
            .resource_mut::<Events<GraspEventMessage>>()
            .update();

        let step = {
            let mut time = self.world.resource_mut::<Time>();
            time.delta_seconds = dt;
            time.elapsed_seconds += f64::from(dt);
            time.fixed_time_step
        };

        self.accumulator += f64::from(dt.max(0.0));
        let mut steps = 0;
        while self.accumulator >= step && steps < MAX_FIXED_STEPS_PER_FRAME {
            self.fixed_schedule.run(&mut self.world);
            self.accumulator -= step;
            steps += 1;
        }
        if self.accumulator >= step {
            tracing::warn!(
                target: "physics",
                "Dropping {:.3}s of simulation after {} fixed steps",
                self.accumulator,
                steps
            );
            self.accumulator = 0.0;
        }
        self.world.resource_mut::<Time>().alpha = self.accumulator / step;

        self.frame_schedule.run(&mut self.world);
        steps
    }

    /// 本帧转发的抓取事件
    pub fn grasp_events(&self) -> Vec<GraspEvent> {
        self.world
            .resource::<Events<GraspEventMessage>>()
            .iter_current_update_events()
            .map(|message| message.0)
            .collect()
    }
}
