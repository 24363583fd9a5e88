//! 统一错误处理模块
//!
//! 提供抓取引擎范围内的统一错误类型定义
//!
//! ## 错误类型分层
//!
//! - **配置错误** (`config::ConfigError`): 配置文件读取、解析与验证
//! - **XR错误** (`xr::XrError`): 手部追踪数据源
//! - **求解错误** (`interaction::kabsch::FitError`): 刚性拟合退化输入
//!
//! `GraspError` 汇总以上错误，并补充按对象ID寻址的命令错误。
//! 注意：每帧的 `fixed_update` / `frame_update` 从不返回错误，
//! 故障一律降级为"本帧不改变运动"并通过 `tracing` 记录。

use crate::config::ConfigError;
use crate::interaction::kabsch::FitError;
use crate::interaction::{BodyId, ObjectId};
use crate::xr::XrError;
use thiserror::Error;

/// 抓取引擎错误类型
#[derive(Error, Debug)]
pub enum GraspError {
    #[error("Graspable object not found: {0:?}")]
    ObjectNotFound(ObjectId),

    #[error("Rigid body not found: {0:?}")]
    BodyNotFound(BodyId),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("XR error: {0}")]
    Xr(#[from] XrError),

    #[error("Rigid fit error: {0}")]
    Fit(#[from] FitError),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// 抓取引擎结果类型别名
pub type GraspResult<T> = Result<T, GraspError>;
