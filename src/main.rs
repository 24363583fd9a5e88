//! 无界面演示：一只手伸向桌上的盒子，抓起、搬运并扔出

use glam::{Quat, Vec3};
use grasp_engine::config::GraspConfig;
use grasp_engine::core::{init_logging, GraspResult};
use grasp_engine::interaction::{Finger, GraspEngine, GraspEvent, HandFrame, HandSet, ObjectDesc};
use grasp_engine::physics::{ColliderDesc3D, PhysicsWorld3D, RigidBodyDesc3D, Shape3D};
use grasp_engine::xr::{Hand, Pose};

const BOX_POS: Vec3 = Vec3::new(0.0, 1.0, 0.3);

fn main() {
    if let Err(e) = run() {
        eprintln!("Grasp demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> GraspResult<()> {
    let mut config = GraspConfig::load_or_default();
    config.apply_env_overrides();
    config.validate()?;
    init_logging(&config.logging);

    let dt = config.simulation.fixed_time_step;
    let mut physics =
        PhysicsWorld3D::with_settings(Vec3::from_array(config.simulation.gravity), dt);

    let table = physics.add_body(&RigidBodyDesc3D::fixed(Pose::from_position(Vec3::new(
        0.0, 0.9, 0.3,
    ))));
    physics.add_collider(table, &ColliderDesc3D::new(Shape3D::Cuboid(Vec3::new(0.5, 0.05, 0.5))));

    let cube = physics.add_body(&RigidBodyDesc3D::dynamic(Pose::from_position(BOX_POS)));
    physics.add_collider(cube, &ColliderDesc3D::new(Shape3D::Cuboid(Vec3::splat(0.05))));
    physics.refresh_queries();

    let mut engine = GraspEngine::new(config);
    let radius = physics.bounding_radius(cube).unwrap_or(0.0);
    let id = engine.register_object(
        ObjectDesc::new(cube, physics.body_volumes(cube)).with_bounding_radius(radius),
        &physics,
    )?;
    let events = engine.events_mut().subscribe();

    let mut hands = HandSet::default();
    let mut previous_palm = Pose::from_position(Vec3::new(0.0, 1.0, -0.3));
    let total_ticks: u32 = 360;

    for tick in 0..total_ticks {
        let palm = scripted_palm(tick);
        let frame = hands.get_mut(Hand::Right);
        if tick == 0 {
            *frame = HandFrame::open_at(palm);
            frame.set_curls(0.2);
        } else {
            frame.move_to(palm);
        }
        frame.linear_velocity = (palm.position - previous_palm.position) / dt;
        previous_palm = palm;

        match tick {
            // 手到位后合拢拇指与食指
            60 => {
                frame.set_curls(0.6);
                frame.set_fingertip(Finger::Thumb, BOX_POS + Vec3::X * 0.045);
                frame.set_fingertip(Finger::Index, BOX_POS - Vec3::X * 0.045);
                frame.refresh_pinches(0.01, 0.08);
            }
            // 挥手途中张开
            180 => frame.set_curls(0.2),
            _ => {}
        }

        engine.fixed_update(&hands, &mut physics, dt);
        physics.step();
        engine.frame_update(&hands, &physics);
        engine.process_events();

        for event in events.try_iter() {
            match event {
                GraspEvent::GraspMoved { .. } => {}
                GraspEvent::Ungrasped {
                    release_velocity, ..
                } => tracing::info!(target: "grasp", "tick {}: thrown at {:?}", tick, release_velocity),
                other => tracing::info!(target: "grasp", "tick {}: {:?}", tick, other),
            }
        }

        if tick % 30 == 0 {
            if let Some(pose) = physics.body_pose(cube) {
                tracing::info!(
                    target: "grasp",
                    "tick {:>3}: box at {:?}, strain {:.3}",
                    tick,
                    pose.position,
                    engine.strain(id)?
                );
            }
        }
    }

    if let Some(pose) = physics.body_pose(cube) {
        println!("Box came to rest at {:?}", pose.position);
    }
    Ok(())
}

/// 前60步伸向盒子，60~120停住，120~180抬起并向右摆，之后继续摆动
fn scripted_palm(tick: u32) -> Pose {
    let reach_start = Vec3::new(0.0, 1.0, -0.3);
    let grasp_palm = Vec3::new(0.0, 1.0, 0.1);
    match tick {
        0..=59 => Pose::from_position(reach_start.lerp(grasp_palm, tick as f32 / 60.0)),
        60..=119 => Pose::from_position(grasp_palm),
        _ => {
            let t = (tick - 120) as f32 / 60.0;
            Pose::new(
                grasp_palm + Vec3::new(0.4 * t, 0.2 * t, 0.0),
                Quat::from_rotation_y(-0.3 * t.min(1.0)),
            )
        }
    }
}
