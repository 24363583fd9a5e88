use super::{ConfigError, ConfigResult};
use crate::impl_default;
use crate::interaction::easing::EasingCurve;
use serde::{Deserialize, Serialize};

/// 运动驱动配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    /// 最大移动速度（米/秒），线速度与角速度按同一比例缩放
    pub max_movement_speed: f32,

    /// 松手时是否用手部速度覆盖刚体速度
    pub throw_boost: bool,

    /// 松手线速度增益
    pub throw_velocity_power: f32,

    /// 松手角速度增益
    pub throw_angular_power: f32,

    /// 剩余距离 -> 混合强度曲线
    #[serde(default)]
    pub easing: EasingCurve,
}

impl_default!(MotionConfig {
    max_movement_speed: 12.0,
    throw_boost: true,
    throw_velocity_power: 1.5,
    throw_angular_power: 1.0,
    easing: EasingCurve::default(),
});

impl MotionConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.max_movement_speed > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "max_movement_speed must be positive, got {}",
                self.max_movement_speed
            )));
        }
        if !(self.throw_velocity_power >= 0.0) || !(self.throw_angular_power >= 0.0) {
            return Err(ConfigError::ValidationError(
                "throw gains must not be negative".to_string(),
            ));
        }
        self.easing
            .validate()
            .map_err(|reason| ConfigError::ValidationError(format!("easing: {}", reason)))
    }
}
