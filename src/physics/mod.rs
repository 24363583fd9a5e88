//! Rapier 物理后端
//!
//! [`PhysicsWorld3D`] 同时实现碰撞查询与刚体访问，可直接交给抓取引擎。

pub mod physics3d;

pub use physics3d::{
    body_handle, body_id, collider_handle, volume_id, Collider3D, ColliderDesc3D, PhysicsWorld3D,
    RigidBody3D, RigidBodyDesc3D, Shape3D,
};
