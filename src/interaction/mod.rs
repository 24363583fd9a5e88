// ============================================================================
// 抓取交互核心
// 手指重叠检测、抓取状态机、多手姿态求解、运动驱动、悬停与拉伸反馈
// ============================================================================
//
// 数据流：
//   HandPoseSource -> detector（每只手）-> { solver, hover } -> motion -> 刚体
//   事件经 GraspEventBus 分发给外部的视觉/音频协作者。
//
// 两种节奏：
//   - fixed_update：固定物理步长，负责检测、求解、驱动、拉伸与冷却计时
//   - frame_update：渲染帧，只负责悬停

use serde::{Deserialize, Serialize};

pub mod body;
pub mod collision;
pub mod constraint;
pub mod detector;
pub mod easing;
pub mod engine;
pub mod events;
pub mod hand;
pub mod hover;
pub mod kabsch;
pub mod motion;
pub mod object;
pub mod solver;
pub mod state;
pub mod strain;

#[cfg(test)]
pub(crate) mod test_support;
#[cfg(test)]
mod tests;

pub use body::{BodyId, GraspWorld, RigidBody, SimpleBody};
pub use collision::{ClosestPoint, CollisionQuery, OverlapBuffer, VolumeId, OVERLAP_BUFFER_CAPACITY};
pub use constraint::{Constraint, HingeConstraint, LinearRailConstraint};
pub use easing::{EasingCurve, EasingKey};
pub use engine::GraspEngine;
pub use events::{GraspEvent, GraspEventBus, GraspEventHandler};
pub use hand::{Finger, HandFrame, HandPoseSource, HandSet, PinchInfo};
pub use object::{GraspableObject, ObjectDesc};
pub use solver::GraspPoseSolver;
pub use state::{Constellation, FingerGrasp, GraspState};

/// 可抓取对象ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

/// 姿态求解方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseSolveMethod {
    /// 各手贡献的位置与朝向取平均
    Average,
    /// 对抓取星座做最小二乘刚性拟合，退化时回退到平均
    RigidFit,
}
