use super::{ConfigError, ConfigResult};
use crate::impl_default;
use serde::{Deserialize, Serialize};

/// 悬停反馈配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoverConfig {
    /// 悬停距离阈值（米），严格小于该值才算悬停
    pub hover_distance: f32,
}

impl_default!(HoverConfig {
    hover_distance: 0.1,
});

impl HoverConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.hover_distance > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "hover_distance must be positive, got {}",
                self.hover_distance
            )));
        }
        Ok(())
    }
}
