use super::{ConfigError, ConfigResult};
use crate::impl_default;
use serde::{Deserialize, Serialize};

/// 手部追踪配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandTrackingConfig {
    /// 最小置信度阈值（低于此值认为追踪无效）
    pub min_confidence: f32,
    /// 捏合程度为1时的拇指-指尖距离
    pub pinch_min_distance: f32,
    /// 捏合程度为0时的拇指-指尖距离
    pub pinch_max_distance: f32,
    /// 完全弯曲时各关节弯折角之和（弧度）
    pub max_curl_angle: f32,
}

impl_default!(HandTrackingConfig {
    min_confidence: 0.5,
    pinch_min_distance: 0.01,
    pinch_max_distance: 0.08,
    max_curl_angle: 4.0,
});

impl HandTrackingConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::ValidationError(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        if !(self.pinch_min_distance >= 0.0) || self.pinch_max_distance <= self.pinch_min_distance
        {
            return Err(ConfigError::ValidationError(
                "pinch distances must satisfy 0 <= min < max".to_string(),
            ));
        }
        if !(self.max_curl_angle > 0.0) {
            return Err(ConfigError::ValidationError(
                "max_curl_angle must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
