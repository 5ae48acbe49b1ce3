//! 静态文件服务器模块
//!
//! 本地测试用的 HTTPS 静态文件服务器：启动时加载证书，
//! 所有路径都映射到静态目录，空闲连接超时后关闭。

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tokio_rustls::TlsAcceptor;

use crate::error::ProbeResult;
use crate::utils::logger::{debug, error, info, warn};

pub mod cert_manager;
pub mod config;
pub mod http_server;
pub mod idle_stream;
pub mod mime_types;
pub mod static_files;

pub use cert_manager::RustlsCertManager;
pub use config::{ServerConfig, TlsConfig};
pub use idle_stream::IdleTimeoutStream;
pub use static_files::StaticFileHandler;

use http_server::{handle_connection, is_client_disconnect};
use idle_stream::is_idle_timeout;

/// 静态文件服务器
pub struct StaticServer {
    listener: TcpListener,
    config: ServerConfig,
    handler: Arc<StaticFileHandler>,
    tls_acceptor: Option<TlsAcceptor>,
}

impl StaticServer {
    /// 加载证书并绑定监听地址
    ///
    /// 启用 TLS 时证书或私钥加载失败直接返回错误。
    pub async fn bind(config: ServerConfig) -> ProbeResult<Self> {
        let tls_acceptor = match &config.tls {
            Some(tls_config) => Some(RustlsCertManager::from_config(tls_config)?.acceptor()),
            None => {
                warn!("⚠️ 未启用 TLS，使用明文 HTTP");
                None
            }
        };

        if !config.static_dir.is_dir() {
            warn!("⚠️ 静态目录不存在: {}", config.static_dir.display());
        }

        let listener = TcpListener::bind(config.addr()).await?;
        let handler = Arc::new(StaticFileHandler::new(
            config.static_dir.clone(),
            config.index_file.clone(),
        ));

        Ok(Self {
            listener,
            config,
            handler,
            tls_acceptor,
        })
    }

    /// 实际监听地址（端口为 0 时由系统分配）
    pub fn local_addr(&self) -> ProbeResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// 便于访问的 URL
    pub fn url(&self) -> ProbeResult<String> {
        Ok(config::display_url(self.config.scheme(), self.local_addr()?))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// 运行直到收到 Ctrl+C
    pub async fn run(self) -> ProbeResult<()> {
        self.run_until(async {
            if let Err(e) = signal::ctrl_c().await {
                error!("❌ 无法监听 Ctrl+C 信号: {}", e);
                std::future::pending::<()>().await;
            }
            info!("🛑 收到 Ctrl+C 信号，正在关闭服务器...");
        })
        .await
    }

    /// 运行直到 `shutdown` 完成；进行中的连接不等待
    pub async fn run_until<F>(self, shutdown: F) -> ProbeResult<()>
    where
        F: Future<Output = ()>,
    {
        info!("🚀 静态文件服务器已启动: {}", self.url()?);
        info!("   📁 静态目录: {}", self.config.static_dir.display());
        info!("   ⏱️ 空闲超时: {:?}", self.config.idle_timeout);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, remote_addr)) => self.spawn_connection(stream, remote_addr),
                        Err(e) => warn!("⚠️ 接受连接失败: {}", e),
                    }
                }
                _ = &mut shutdown => {
                    info!("👋 服务器已停止");
                    return Ok(());
                }
            }
        }
    }

    fn spawn_connection(&self, stream: tokio::net::TcpStream, remote_addr: SocketAddr) {
        debug!("🔗 [服务端] 新连接: {}", remote_addr);

        if let Err(e) = stream.set_nodelay(true) {
            debug!("设置 TCP_NODELAY 失败: {}", e);
        }

        let stream = Box::pin(IdleTimeoutStream::new(stream, self.config.idle_timeout));
        let handler = self.handler.clone();
        let tls_acceptor = self.tls_acceptor.clone();

        tokio::spawn(async move {
            match handle_connection(stream, remote_addr, handler, tls_acceptor).await {
                Ok(()) => debug!("🔌 [服务端] 连接关闭: {}", remote_addr),
                Err(e) if is_idle_timeout(&*e) => {
                    debug!("⏱️ [服务端] 连接空闲超时，已关闭: {}", remote_addr)
                }
                Err(e) if is_client_disconnect(&*e) => {
                    debug!("🔌 [服务端] 客户端断开连接: {} ({})", remote_addr, e)
                }
                Err(e) => warn!("❌ [服务端] 连接处理失败: {}: {}", remote_addr, e),
            }
        });
    }
}
