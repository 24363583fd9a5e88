use super::{ConfigError, ConfigResult};
use crate::impl_default;
use serde::{Deserialize, Serialize};

/// 抓取检测配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// 指尖重叠查询半径（米）
    pub fingertip_radius: f32,

    /// 松手后重新抓取的冷却时间（秒）
    pub regrasp_cooldown: f32,

    /// 弯曲度相对抓取时快照回落超过该值视为松开
    pub release_curl_margin: f32,

    /// 单帧弯曲度下降超过该值视为松开（弯曲度单位/帧）
    pub release_velocity_threshold: f32,

    /// 星座第五点沿掌心法线的偏移（米）
    pub palm_normal_offset: f32,
}

impl_default!(DetectorConfig {
    fingertip_radius: 0.01,
    regrasp_cooldown: 0.125,
    release_curl_margin: 0.05,
    release_velocity_threshold: 0.08,
    palm_normal_offset: 0.05,
});

impl DetectorConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.fingertip_radius > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "fingertip_radius must be positive, got {}",
                self.fingertip_radius
            )));
        }
        if !(self.regrasp_cooldown >= 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "regrasp_cooldown must not be negative, got {}",
                self.regrasp_cooldown
            )));
        }
        if !(0.0..=1.0).contains(&self.release_curl_margin) {
            return Err(ConfigError::ValidationError(format!(
                "release_curl_margin must be within [0, 1], got {}",
                self.release_curl_margin
            )));
        }
        if !(0.0..=1.0).contains(&self.release_velocity_threshold) {
            return Err(ConfigError::ValidationError(format!(
                "release_velocity_threshold must be within [0, 1], got {}",
                self.release_velocity_threshold
            )));
        }
        if !(self.palm_normal_offset > 0.0) {
            return Err(ConfigError::ValidationError(
                "palm_normal_offset must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
