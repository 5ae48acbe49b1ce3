//! 基于 rustls 的证书管理器
//!
//! 使用 rustls + ring 作为加密后端，启动时加载一次证书和私钥

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::ServerConfig;
use rustls_pemfile::{certs, private_key};
use tokio_rustls::TlsAcceptor;

use crate::error::{ProbeError, ProbeResult};
use crate::server::config::TlsConfig;
use crate::utils::crypto_provider::ensure_crypto_provider_installed;
use crate::utils::logger::{debug, info};

/// Rustls 证书管理器
#[derive(Clone)]
pub struct RustlsCertManager {
    server_config: Arc<ServerConfig>,
    /// 证书链长度
    chain_len: usize,
}

impl RustlsCertManager {
    /// 从证书/私钥文件创建管理器
    pub fn from_config(tls_config: &TlsConfig) -> ProbeResult<Self> {
        info!("🔐 加载证书: {}", tls_config.cert_path.display());

        let mut cert_reader = open_pem(&tls_config.cert_path, "证书")?;
        let mut key_reader = open_pem(&tls_config.key_path, "私钥")?;

        Self::from_readers(&mut cert_reader, &mut key_reader)
    }

    /// 从内存中的 PEM 数据创建管理器
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> ProbeResult<Self> {
        let mut cert_reader = BufReader::new(cert_pem);
        let mut key_reader = BufReader::new(key_pem);
        Self::from_readers(&mut cert_reader, &mut key_reader)
    }

    fn from_readers(
        cert_reader: &mut dyn std::io::BufRead,
        key_reader: &mut dyn std::io::BufRead,
    ) -> ProbeResult<Self> {
        ensure_crypto_provider_installed();

        let cert_chain: Vec<CertificateDer<'static>> = certs(cert_reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ProbeError::TlsError(format!("解析证书失败: {}", e)))?;

        if cert_chain.is_empty() {
            return Err(ProbeError::TlsError("证书为空".to_string()));
        }

        let key: PrivateKeyDer<'static> = private_key(key_reader)
            .map_err(|e| ProbeError::TlsError(format!("解析私钥失败: {}", e)))?
            .ok_or_else(|| ProbeError::TlsError("私钥文件为空".to_string()))?;

        let chain_len = cert_chain.len();
        let mut server_config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(cert_chain, key)?;

        // 同时支持 HTTP/2 和 HTTP/1.1
        server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

        debug!("✅ 证书加载完成，证书链长度: {}", chain_len);

        Ok(Self {
            server_config: Arc::new(server_config),
            chain_len,
        })
    }

    /// 获取 ServerConfig
    pub fn get_server_config(&self) -> Arc<ServerConfig> {
        self.server_config.clone()
    }

    /// 创建 TLS 接收器
    pub fn acceptor(&self) -> TlsAcceptor {
        TlsAcceptor::from(self.server_config.clone())
    }

    pub fn chain_len(&self) -> usize {
        self.chain_len
    }
}

fn open_pem(path: &Path, what: &str) -> ProbeResult<BufReader<File>> {
    let file = File::open(path)
        .map_err(|e| ProbeError::TlsError(format!("打开{}文件失败 {}: {}", what, path.display(), e)))?;
    Ok(BufReader::new(file))
}

/// ALPN 协议检查工具
pub struct AlpnProtocol;

impl AlpnProtocol {
    /// 检查是否为 HTTP/2 连接
    pub fn is_http2(protocol: &Option<Vec<u8>>) -> bool {
        matches!(protocol, Some(p) if p == b"h2")
    }

    /// 检查是否为 HTTP/1.1 连接
    pub fn is_http11(protocol: &Option<Vec<u8>>) -> bool {
        matches!(protocol, Some(p) if p == b"http/1.1") || protocol.is_none()
    }

    /// 日志中使用的协议名
    pub fn describe(protocol: &Option<Vec<u8>>) -> &'static str {
        if Self::is_http2(protocol) {
            "h2"
        } else if Self::is_http11(protocol) {
            "http/1.1"
        } else {
            "unknown"
        }
    }
}
