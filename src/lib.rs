//! # Grasp Engine
//!
//! Physics-based hand grasping for VR hand tracking, built with Rust.
//!
//! ## Features
//!
//! - **Grasp detection**: per-hand, per-finger state machine with curl hysteresis and regrasp cooldown
//! - **Pose solving**: multi-hand averaging or rigid-fit (Kabsch) over a five-point hand constellation
//! - **Motion driving**: velocity-based driving with speed clamping, distance easing and throw boost
//! - **Hover and strain**: proximity feedback and grasp-lag signals for visuals and haptics
//! - **Physics**: Rapier3D backend; any physics engine fits behind the `GraspWorld` trait
//! - **ECS**: bevy_ecs systems for the fixed-tick / render-frame split
//!
//! ## Architecture Design
//!
//! The core never touches global state:
//! - **Hand data** comes in through [`interaction::HandPoseSource`] on every call
//! - **Physics** is reached only through [`interaction::GraspWorld`] and [`interaction::RigidBody`]
//! - **Events** are queued and fanned out through [`interaction::GraspEventBus`]
//!
//! ### Example
//!
//! ```ignore
//! use grasp_engine::config::GraspConfig;
//! use grasp_engine::interaction::{GraspEngine, ObjectDesc};
//!
//! let mut engine = GraspEngine::new(GraspConfig::load_or_default());
//! let id = engine.register_object(ObjectDesc::new(body, volumes), &physics)?;
//! engine.fixed_update(&hands, &mut physics, 1.0 / 90.0);
//! engine.frame_update(&hands, &physics);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Errors, logging and shared macros
//! - [`config`]: Configuration loading and validation
//! - [`xr`]: Poses, hand sides and joint-based hand tracking
//! - [`interaction`]: Grasp detection, solving, driving, hover and strain
//! - [`physics`]: Rapier physics backend
//! - [`ecs`]: bevy_ecs integration

/// Core functionality: errors, logging, macros
pub mod core;
/// Configuration system
pub mod config;
/// XR support: poses and hand tracking
pub mod xr;
/// Hand-object interaction
pub mod interaction;
/// Physics backend using Rapier
pub mod physics;
/// Entity Component System integration
pub mod ecs;

pub use crate::config::GraspConfig;
pub use crate::core::{GraspError, GraspResult};
pub use crate::interaction::{GraspEngine, GraspEvent, ObjectId};
