//! 核心模块 - 引擎配置
//!
//! - [`Config`] - 引擎配置 (环境变量)

pub mod config;

pub use config::Config;
