//! 碰撞查询接口
//!
//! 每个物理步对每根手指都要做一次球体重叠查询，所以结果写入固定容量的
//! [`OverlapBuffer`]，整个查询过程不做堆分配。

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// 单次重叠查询最多返回的碰撞体数量
pub const OVERLAP_BUFFER_CAPACITY: usize = 5;

/// 碰撞体ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeId(pub u64);

/// 固定容量的重叠结果缓冲区
///
/// 超出容量的结果直接丢弃；只要截断后的结果里有目标对象的碰撞体就算重叠。
#[derive(Debug, Clone, Copy)]
pub struct OverlapBuffer {
    ids: [VolumeId; OVERLAP_BUFFER_CAPACITY],
    len: usize,
}

impl Default for OverlapBuffer {
    fn default() -> Self {
        Self {
            ids: [VolumeId(0); OVERLAP_BUFFER_CAPACITY],
            len: 0,
        }
    }
}

impl OverlapBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// 写入一个结果，缓冲区已满时返回 `false`
    pub fn push(&mut self, id: VolumeId) -> bool {
        if self.len == OVERLAP_BUFFER_CAPACITY {
            return false;
        }
        self.ids[self.len] = id;
        self.len += 1;
        true
    }

    pub fn is_full(&self) -> bool {
        self.len == OVERLAP_BUFFER_CAPACITY
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[VolumeId] {
        &self.ids[..self.len]
    }

    /// 结果中是否有任一碰撞体属于 `volumes`
    pub fn contains_any(&self, volumes: &[VolumeId]) -> bool {
        self.as_slice().iter().any(|id| volumes.contains(id))
    }
}

/// 最近点查询结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    /// 表面上的最近点（点在内部时为查询点本身）
    pub point: Vec3,
    /// 查询点是否在碰撞体内部
    pub is_inside: bool,
}

impl ClosestPoint {
    /// 到表面的距离，内部为0
    pub fn distance_from(&self, query: Vec3) -> f32 {
        if self.is_inside {
            0.0
        } else {
            self.point.distance(query)
        }
    }
}

/// 碰撞查询后端
pub trait CollisionQuery {
    /// 查询与球体重叠的碰撞体，写入 `out` 并返回写入数量
    fn overlap_sphere(&self, center: Vec3, radius: f32, out: &mut OverlapBuffer) -> usize;

    /// 在一组碰撞体上求最近点；`volumes` 为空或全部失效时返回 `None`
    fn closest_point(&self, volumes: &[VolumeId], point: Vec3) -> Option<ClosestPoint>;
}
