use serde::{Deserialize, Serialize};

/// 缓动关键点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EasingKey {
    /// 剩余距离（米）
    pub distance: f32,
    /// 混合强度 (0.0 - 1.0)
    pub strength: f32,
}

/// 距离 -> 混合强度曲线
///
/// 关键点按距离升序排列，相邻关键点之间线性插值，两端外取端点值。
/// 抓取开始后对象离目标越远强度越低，避免外部手部突然快速移动时速度突变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EasingCurve {
    keys: Vec<EasingKey>,
}

impl Default for EasingCurve {
    fn default() -> Self {
        Self::from_pairs(&[(0.0, 1.0), (0.05, 1.0), (0.25, 0.5), (1.0, 0.2)])
    }
}

impl EasingCurve {
    /// 由 (距离, 强度) 对构造，自动按距离排序
    pub fn from_pairs(pairs: &[(f32, f32)]) -> Self {
        let mut curve = Self { keys: Vec::new() };
        for &(distance, strength) in pairs {
            curve.add_key(distance, strength);
        }
        curve
    }

    /// 恒定强度
    pub fn constant(strength: f32) -> Self {
        Self::from_pairs(&[(0.0, strength)])
    }

    /// 添加关键点，按距离有序插入
    pub fn add_key(&mut self, distance: f32, strength: f32) {
        let index = self
            .keys
            .partition_point(|k| k.distance.total_cmp(&distance).is_le());
        self.keys.insert(index, EasingKey { distance, strength });
    }

    pub fn keys(&self) -> &[EasingKey] {
        &self.keys
    }

    /// 采样指定距离的强度
    pub fn sample(&self, distance: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 1.0;
        };

        if !(distance > first.distance) {
            return first.strength;
        }
        if distance >= last.distance {
            return last.strength;
        }

        for pair in self.keys.windows(2) {
            let (k0, k1) = (pair[0], pair[1]);
            if distance >= k0.distance && distance <= k1.distance {
                let span = k1.distance - k0.distance;
                if span <= f32::EPSILON {
                    return k1.strength;
                }
                let t = (distance - k0.distance) / span;
                return k0.strength + (k1.strength - k0.strength) * t;
            }
        }

        last.strength
    }

    /// 验证曲线
    pub fn validate(&self) -> Result<(), String> {
        if self.keys.is_empty() {
            return Err("curve has no keys".to_string());
        }
        for key in &self.keys {
            if !key.distance.is_finite() || key.distance < 0.0 {
                return Err(format!("invalid key distance {}", key.distance));
            }
            if !(0.0..=1.0).contains(&key.strength) {
                return Err(format!("key strength {} outside [0, 1]", key.strength));
            }
        }
        if self.keys.windows(2).any(|w| w[1].distance < w[0].distance) {
            return Err("keys must be sorted by distance".to_string());
        }
        Ok(())
    }
}
