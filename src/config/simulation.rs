use super::{ConfigError, ConfigResult};
use crate::impl_default;
use crate::interaction::PoseSolveMethod;
use serde::{Deserialize, Serialize};

/// 姿态求解配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// 求解方法
    pub method: PoseSolveMethod,
}

impl_default!(SolverConfig {
    method: PoseSolveMethod::Average,
});

/// 固定步长模拟配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// 固定物理步长（秒）
    pub fixed_time_step: f32,

    /// 重力加速度
    pub gravity: [f32; 3],
}

impl_default!(SimulationConfig {
    fixed_time_step: 1.0 / 90.0,
    gravity: [0.0, -9.81, 0.0],
});

impl SimulationConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.fixed_time_step > 0.0) || self.fixed_time_step > 0.1 {
            return Err(ConfigError::ValidationError(format!(
                "fixed_time_step must be within (0, 0.1], got {}",
                self.fixed_time_step
            )));
        }
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(ConfigError::ValidationError(
                "gravity must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
