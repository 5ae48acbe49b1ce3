//! 服务器配置模块

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认监听端口
pub const DEFAULT_PORT: u16 = 8713;
/// 默认空闲连接超时
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
/// 请求目录时使用的默认文件
pub const DEFAULT_INDEX_FILE: &str = "index.html";
/// 静态文件目录（相对根目录）
pub const DEFAULT_STATIC_DIR: &str = "static";
/// 证书路径（相对根目录）
pub const DEFAULT_CERT_PATH: &str = "data/CA/cert.pem";
/// 私钥路径（相对根目录）
pub const DEFAULT_KEY_PATH: &str = "data/CA/key.pem";

/// TLS 证书配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl TlsConfig {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    /// 使用根目录下的默认证书位置
    pub fn from_root(root: &Path) -> Self {
        Self::new(root.join(DEFAULT_CERT_PATH), root.join(DEFAULT_KEY_PATH))
    }
}

/// 静态文件服务器配置
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 监听地址
    pub bind_addr: IpAddr,
    /// 监听端口，0 表示由系统分配
    pub port: u16,
    /// 静态文件根目录
    pub static_dir: PathBuf,
    /// 目录默认文件
    pub index_file: String,
    /// 空闲连接超时
    pub idle_timeout: Duration,
    /// TLS 配置，`None` 表示明文 HTTP
    pub tls: Option<TlsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_root(Path::new("."))
    }
}

impl ServerConfig {
    /// 以 `root` 为根目录创建默认配置：`root/static`、`root/data/CA/*.pem`、`0.0.0.0:8713`
    pub fn from_root(root: &Path) -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            static_dir: root.join(DEFAULT_STATIC_DIR),
            index_file: DEFAULT_INDEX_FILE.to_string(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            tls: Some(TlsConfig::from_root(root)),
        }
    }

    /// 获取监听地址
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    pub fn scheme(&self) -> &'static str {
        if self.tls.is_some() { "https" } else { "http" }
    }
}

/// 生成便于访问的 URL，绑定到全部网卡时显示为 localhost
pub fn display_url(scheme: &str, addr: SocketAddr) -> String {
    if addr.ip().is_unspecified() {
        format!("{}://localhost:{}", scheme, addr.port())
    } else {
        format!("{}://{}", scheme, addr)
    }
}
