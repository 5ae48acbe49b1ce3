//! 错误处理模块
//!
//! 抓取工具和静态服务器共用的错误类型

use thiserror::Error;

/// RAT Probe 错误类型
#[derive(Debug, Error)]
pub enum ProbeError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 网络错误（HTTP 客户端）
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// HTTP 服务端错误
    #[error("HTTP错误: {0}")]
    HyperError(String),

    /// TLS 错误（证书、私钥、握手）
    #[error("TLS错误: {0}")]
    TlsError(String),

    /// 缺少必需的响应头
    #[error("缺少响应头: {0}")]
    MissingHeader(String),

    /// 解码错误
    #[error("解码错误: {0}")]
    DecodingError(String),

    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// IO 错误
    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),
}

/// RAT Probe 结果类型
pub type ProbeResult<T> = Result<T, ProbeError>;

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        ProbeError::NetworkError(err.to_string())
    }
}

impl From<hyper::Error> for ProbeError {
    fn from(err: hyper::Error) -> Self {
        ProbeError::HyperError(err.to_string())
    }
}

impl From<toml::de::Error> for ProbeError {
    fn from(err: toml::de::Error) -> Self {
        ProbeError::ConfigError(err.to_string())
    }
}

impl From<rustls::Error> for ProbeError {
    fn from(err: rustls::Error) -> Self {
        ProbeError::TlsError(err.to_string())
    }
}
