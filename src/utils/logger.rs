//! 日志模块
//!
//! 统一的日志入口：业务代码通过 `crate::utils::logger::{debug, info, warn, error}` 打日志，
//! 由 `Logger::init` 按 `LogConfig` 初始化 rat_logger 终端输出。
//! `RUST_LOG` 环境变量存在时优先于配置中的级别。

use clap::ValueEnum;
use rat_logger::handler::term::TermConfig;
use rat_logger::{LevelFilter, LoggerBuilder};
use serde::Deserialize;

pub use rat_logger::{debug, error, info, trace, warn};

use crate::error::{ProbeError, ProbeResult};

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// 转换为 rat_logger 的过滤级别
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: LogLevel,
    /// 终端输出是否带颜色
    pub enable_color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            enable_color: true,
        }
    }
}

impl LogConfig {
    /// 使用指定级别创建配置
    pub fn with_level(level: LogLevel) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// 实际生效的过滤级别（`RUST_LOG` 优先）
    pub fn effective_level(&self) -> LevelFilter {
        rat_logger::parse_log_level_from_env().unwrap_or_else(|| self.level.to_level_filter())
    }
}

/// 日志初始化器
pub struct Logger;

impl Logger {
    /// 初始化全局日志
    ///
    /// 重复初始化时 rat_logger 保留已有的日志器，这里不视为错误。
    pub fn init(config: LogConfig) -> ProbeResult<()> {
        let term_config = TermConfig {
            enable_color: config.enable_color,
            ..TermConfig::default()
        };

        LoggerBuilder::new()
            .with_level(config.effective_level())
            .add_terminal_with_config(term_config)
            .init_global_logger()
            .map_err(|e| ProbeError::ConfigError(format!("日志系统初始化失败: {}", e)))
    }

    /// 退出前把缓冲中的日志全部输出
    pub fn flush() {
        use rat_logger::Logger as _;

        if let Ok(guard) = rat_logger::core::LOGGER.lock() {
            if let Some(logger) = guard.as_ref() {
                logger.force_flush();
            }
        }
    }
}
