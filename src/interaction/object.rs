//! 可抓取对象

use super::body::BodyId;
use super::collision::VolumeId;
use super::constraint::Constraint;
use super::hover::HoverState;
use super::state::GraspState;
use super::strain::StrainState;
use super::ObjectId;
use crate::xr::{Hand, Pose};

/// 注册可抓取对象的描述
#[derive(Debug, Clone)]
pub struct ObjectDesc {
    pub body: BodyId,
    /// 属于该对象的全部碰撞体
    pub volumes: Vec<VolumeId>,
    /// 质心到最远碰撞体顶点的距离；不提供时悬停不做包围球剔除
    pub bounding_radius: Option<f32>,
    /// 重生姿态；不提供时取注册时的刚体姿态
    pub respawn_pose: Option<Pose>,
    /// 未被抓取时是否受重力；不提供时取注册时刚体的设置
    pub default_gravity: Option<bool>,
}

impl ObjectDesc {
    pub fn new(body: BodyId, volumes: Vec<VolumeId>) -> Self {
        Self {
            body,
            volumes,
            bounding_radius: None,
            respawn_pose: None,
            default_gravity: None,
        }
    }

    pub fn with_bounding_radius(mut self, radius: f32) -> Self {
        self.bounding_radius = Some(radius);
        self
    }

    pub fn with_respawn_pose(mut self, pose: Pose) -> Self {
        self.respawn_pose = Some(pose);
        self
    }

    pub fn with_default_gravity(mut self, enabled: bool) -> Self {
        self.default_gravity = Some(enabled);
        self
    }
}

/// 一个被管理的刚体对象
///
/// 每只手一份 [`GraspState`]，只在该对象自己的固定步更新中被修改。
pub struct GraspableObject {
    pub(crate) id: ObjectId,
    pub(crate) body: BodyId,
    pub(crate) volumes: Vec<VolumeId>,
    pub(crate) bounding_radius: f32,
    pub(crate) respawn_pose: Pose,
    pub(crate) constraint: Option<Box<dyn Constraint>>,
    pub(crate) default_gravity: bool,
    pub(crate) grasp: [GraspState; 2],
    pub(crate) is_grasped: bool,
    /// 抓取开始后尚未驱动过
    pub(crate) first_drive: bool,
    pub(crate) hover: HoverState,
    pub(crate) strain: StrainState,
    /// 最近一次固定步开始时的刚体姿态
    pub(crate) last_pose: Pose,
}

impl GraspableObject {
    pub(crate) fn new(id: ObjectId, desc: ObjectDesc, body_pose: Pose, body_gravity: bool) -> Self {
        Self {
            id,
            body: desc.body,
            volumes: desc.volumes,
            bounding_radius: desc.bounding_radius.unwrap_or(0.0).max(0.0),
            respawn_pose: desc.respawn_pose.unwrap_or(body_pose),
            constraint: None,
            default_gravity: desc.default_gravity.unwrap_or(body_gravity),
            grasp: [GraspState::default(), GraspState::default()],
            is_grasped: false,
            first_drive: false,
            hover: HoverState::default(),
            strain: StrainState::default(),
            last_pose: body_pose,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn volumes(&self) -> &[VolumeId] {
        &self.volumes
    }

    pub fn bounding_radius(&self) -> f32 {
        self.bounding_radius
    }

    pub fn respawn_pose(&self) -> Pose {
        self.respawn_pose
    }

    pub fn default_gravity(&self) -> bool {
        self.default_gravity
    }

    pub fn has_constraint(&self) -> bool {
        self.constraint.is_some()
    }

    pub fn grasp_state(&self, hand: Hand) -> &GraspState {
        &self.grasp[hand.index()]
    }

    pub fn is_grasped(&self) -> bool {
        self.is_grasped
    }

    pub fn hover(&self) -> &HoverState {
        &self.hover
    }

    pub fn strain(&self) -> &StrainState {
        &self.strain
    }

    /// 正在抓取的手
    pub fn grasping_hands(&self) -> impl Iterator<Item = Hand> + '_ {
        Hand::BOTH
            .into_iter()
            .filter(move |h| self.grasp[h.index()].is_grasping())
    }
}
