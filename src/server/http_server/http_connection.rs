//! HTTP 连接处理模块
//!
//! 处理 HTTP/1.1 和 HTTP/2 连接（可选 TLS），请求交给静态文件处理器

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::Request;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::TlsAcceptor;

use crate::server::cert_manager::AlpnProtocol;
use crate::server::static_files::StaticFileHandler;
use crate::utils::logger::{debug, info, warn};

pub type ConnectionError = Box<dyn std::error::Error + Send + Sync>;

/// 处理一个已接受的连接
///
/// `tls_acceptor` 为 `None` 时按明文 HTTP 处理。
pub async fn handle_connection<S>(
    stream: S,
    remote_addr: SocketAddr,
    handler: Arc<StaticFileHandler>,
    tls_acceptor: Option<TlsAcceptor>,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    match tls_acceptor {
        Some(acceptor) => handle_tls_connection(stream, remote_addr, handler, acceptor).await,
        None => serve_http(stream, remote_addr, handler).await,
    }
}

/// TLS 握手后按 ALPN 结果交给 hyper
pub async fn handle_tls_connection<S>(
    stream: S,
    remote_addr: SocketAddr,
    handler: Arc<StaticFileHandler>,
    acceptor: TlsAcceptor,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    debug!("🔐 [服务端] 开始 TLS 握手: {}", remote_addr);

    let tls_stream = acceptor.accept(stream).await?;

    let (_, conn) = tls_stream.get_ref();
    let alpn_protocol = conn.alpn_protocol().map(|p| p.to_vec());
    debug!(
        "✅ [服务端] TLS 握手成功: {} (ALPN: {})",
        remote_addr,
        AlpnProtocol::describe(&alpn_protocol)
    );

    serve_http(tls_stream, remote_addr, handler).await
}

/// 使用 hyper auto builder 处理 HTTP/1.1 与 HTTP/2
async fn serve_http<S>(
    stream: S,
    remote_addr: SocketAddr,
    handler: Arc<StaticFileHandler>,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);
    let service = service_fn(move |req: Request<Incoming>| {
        let handler = handler.clone();
        async move {
            // 静态文件只看请求头，请求体直接丢弃
            let (parts, _body) = req.into_parts();
            let req = Request::from_parts(parts, ());
            let method = req.method().clone();
            let path = req.uri().path().to_string();
            let version = req.version();

            let response = handler.handle(&req).await;

            let status = response.status();
            if status.is_server_error() {
                warn!("{} {} {:?} -> {} ({})", method, path, version, status.as_u16(), remote_addr);
            } else {
                info!("{} {} {:?} -> {} ({})", method, path, version, status.as_u16(), remote_addr);
            }
            Ok::<_, Infallible>(response)
        }
    });

    AutoBuilder::new(TokioExecutor::new())
        .serve_connection(io, service)
        .await
}

/// 客户端主动断开之类的正常结束
pub fn is_client_disconnect(err: &(dyn std::error::Error + 'static)) -> bool {
    let msg = err.to_string();
    msg.contains("connection closed")
        || msg.contains("broken pipe")
        || msg.contains("connection reset")
        || msg.contains("unexpected end of file")
        || msg.contains("IncompleteMessage")
        || msg.contains("CANCELED")
}
