/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量和运行时动态调整。
/// 所有阈值、增益与时间常数都集中在这里，抓取核心本身不读文件。
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod detector;
pub mod hover;
pub mod motion;
pub mod simulation;
pub mod tracking;

pub use detector::DetectorConfig;
pub use hover::HoverConfig;
pub use motion::MotionConfig;
pub use simulation::{SimulationConfig, SolverConfig};
pub use tracking::HandTrackingConfig;

use crate::impl_default;
use crate::interaction::PoseSolveMethod;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 抓取引擎主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraspConfig {
    /// 抓取检测
    #[serde(default)]
    pub detector: DetectorConfig,

    /// 运动驱动
    #[serde(default)]
    pub motion: MotionConfig,

    /// 姿态求解
    #[serde(default)]
    pub solver: SolverConfig,

    /// 悬停反馈
    #[serde(default)]
    pub hover: HoverConfig,

    /// 固定步长模拟
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// 手部追踪
    #[serde(default)]
    pub tracking: HandTrackingConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GraspConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 保存为JSON文件
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Some(cooldown) = env_parse::<f32>("GRASP_REGRASP_COOLDOWN") {
            self.detector.regrasp_cooldown = cooldown;
        }
        if let Some(speed) = env_parse::<f32>("GRASP_MAX_SPEED") {
            self.motion.max_movement_speed = speed;
        }
        if let Some(boost) = env_parse::<bool>("GRASP_THROW_BOOST") {
            self.motion.throw_boost = boost;
        }
        if let Some(power) = env_parse::<f32>("GRASP_THROW_POWER") {
            self.motion.throw_velocity_power = power;
        }
        if let Some(distance) = env_parse::<f32>("GRASP_HOVER_DISTANCE") {
            self.hover.hover_distance = distance;
        }
        if let Some(step) = env_parse::<f32>("GRASP_FIXED_TIME_STEP") {
            self.simulation.fixed_time_step = step;
        }
        if let Ok(val) = env::var("GRASP_SOLVER") {
            match val.to_ascii_lowercase().as_str() {
                "average" => self.solver.method = PoseSolveMethod::Average,
                "rigid_fit" | "kabsch" => self.solver.method = PoseSolveMethod::RigidFit,
                other => {
                    tracing::warn!(target: "config", "Ignoring unknown GRASP_SOLVER value '{}'", other)
                }
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.detector.validate()?;
        self.motion.validate()?;
        self.hover.validate()?;
        self.simulation.validate()?;
        self.tracking.validate()?;
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./grasp.toml
    /// 2. ./grasp.json
    /// 3. <用户配置目录>/grasp_engine/grasp.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::from_toml_file("grasp.toml") {
            tracing::info!(target: "config", "Loaded config from grasp.toml");
            return config;
        }

        if let Ok(config) = Self::from_json_file("grasp.json") {
            tracing::info!(target: "config", "Loaded config from grasp.json");
            return config;
        }

        if let Some(config_path) = Self::user_config_path() {
            if let Ok(config) = Self::from_toml_file(&config_path) {
                tracing::info!(target: "config", "Loaded config from {:?}", config_path);
                return config;
            }
        }

        tracing::info!(target: "config", "Using default configuration");
        Self::default()
    }

    /// 用户级配置文件路径
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("grasp_engine").join("grasp.toml"))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(target: "config", "Ignoring unparsable {}='{}'", key, raw);
            None
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,

    /// 是否输出到控制台
    pub log_to_console: bool,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
    log_to_console: true,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}
