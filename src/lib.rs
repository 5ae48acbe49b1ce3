//! RAT Probe
//!
//! 两个互相独立的小工具：
//!
//! - `client`：抓取 HTTP 编码采样响应，分别保存原始字节和解码后的字节；
//! - `server`：本地测试用的 HTTPS 静态文件服务器，带空闲连接超时。

pub mod client;
pub mod compression;
pub mod config;
pub mod error;
pub mod server;
pub mod utils;

pub use client::{FetcherConfig, ResponseFetcher, SampleCase, SavedFile};
pub use compression::{CompressionType, StreamDecoder};
pub use config::ProbeConfig;
pub use error::{ProbeError, ProbeResult};
pub use server::{ServerConfig, StaticServer, TlsConfig};
