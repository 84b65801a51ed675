//! 工具模块
//!
//! - [`logger`] - 日志初始化、日志清理与审计宏

pub mod logger;
