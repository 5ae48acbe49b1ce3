//! 配置文件模块
//!
//! TOML 配置文件，所有字段可选。优先级：命令行参数 > 配置文件 > 内置默认值。
//!
//! ```toml
//! [server]
//! root = "."
//! port = 8713
//! idle_timeout_secs = 10
//!
//! [fetcher]
//! output_dir = "samples"
//! verify = true
//!
//! [[fetcher.cases]]
//! name = "gzip"
//! url = "https://postman-echo.com/gzip"
//! ```

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::client::{FetcherConfig, SampleCase};
use crate::error::{ProbeError, ProbeResult};
use crate::server::{ServerConfig, TlsConfig};
use crate::utils::logger::LogLevel;

/// 配置文件顶层结构
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub fetcher: FetcherSection,
}

impl ProbeConfig {
    /// 从文件加载
    pub fn from_file(path: &Path) -> ProbeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::ConfigError(format!("无法读取配置文件 {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ProbeResult<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// `[server]` 段
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// 根目录，其余相对路径都基于它
    pub root: Option<PathBuf>,
    pub bind: Option<IpAddr>,
    pub port: Option<u16>,
    pub idle_timeout_secs: Option<u64>,
    pub static_dir: Option<PathBuf>,
    pub index_file: Option<String>,
    pub cert_path: Option<PathBuf>,
    pub key_path: Option<PathBuf>,
    /// 为 false 时使用明文 HTTP
    pub tls: Option<bool>,
    pub log_level: Option<LogLevel>,
}

impl ServerSection {
    /// 把配置文件中的值覆盖到 `config` 上，相对路径以 `root` 为基准
    pub fn apply_to(&self, config: &mut ServerConfig, root: &Path) -> ProbeResult<()> {
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secs) = self.idle_timeout_secs {
            if secs == 0 {
                return Err(ProbeError::ConfigError("idle_timeout_secs 必须大于 0".to_string()));
            }
            config.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(static_dir) = &self.static_dir {
            config.static_dir = root.join(static_dir);
        }
        if let Some(index_file) = &self.index_file {
            config.index_file = index_file.clone();
        }

        if self.tls == Some(false) {
            config.tls = None;
        } else {
            let mut tls = config.tls.take().unwrap_or_else(|| TlsConfig::from_root(root));
            if let Some(cert_path) = &self.cert_path {
                tls.cert_path = root.join(cert_path);
            }
            if let Some(key_path) = &self.key_path {
                tls.key_path = root.join(key_path);
            }
            config.tls = Some(tls);
        }
        Ok(())
    }
}

/// `[fetcher]` 段
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetcherSection {
    pub output_dir: Option<PathBuf>,
    pub chunk_size: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub accept_encoding: Option<String>,
    pub verify: Option<bool>,
    pub accept_invalid_certs: Option<bool>,
    pub log_level: Option<LogLevel>,
    /// 非空时替换内置用例
    #[serde(default)]
    pub cases: Vec<SampleCase>,
}

impl FetcherSection {
    pub fn apply_to(&self, config: &mut FetcherConfig) -> ProbeResult<()> {
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(chunk_size) = self.chunk_size {
            if chunk_size == 0 {
                return Err(ProbeError::ConfigError("chunk_size 必须大于 0".to_string()));
            }
            config.chunk_size = chunk_size;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(accept_encoding) = &self.accept_encoding {
            config.accept_encoding = accept_encoding.clone();
        }
        if let Some(verify) = self.verify {
            config.verify = verify;
        }
        if let Some(accept_invalid_certs) = self.accept_invalid_certs {
            config.accept_invalid_certs = accept_invalid_certs;
        }
        if !self.cases.is_empty() {
            for case in &self.cases {
                if case.name.is_empty() || case.name.contains(['/', '\\']) {
                    return Err(ProbeError::ConfigError(format!("无效的用例名称: '{}'", case.name)));
                }
            }
            config.cases = self.cases.clone();
        }
        Ok(())
    }
}
