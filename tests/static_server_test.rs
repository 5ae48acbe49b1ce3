//! 静态文件服务器集成测试
//!
//! 使用 rcgen 生成的自签名证书和临时目录启动服务器，端口由系统分配

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use rat_probe::error::ProbeError;
use rat_probe::server::{ServerConfig, StaticServer};
use reqwest::StatusCode;
use reqwest::header;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

const INDEX_HTML: &str = "<html><body><h1>rat_probe</h1></body></html>";
const SITE_CSS: &str = "body { color: #333; }";

struct TestSite {
    _dir: TempDir,
    addr: SocketAddr,
    scheme: &'static str,
    _shutdown: oneshot::Sender<()>,
}

impl TestSite {
    fn url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.addr, path)
    }
}

fn write_site(root: &Path) {
    let static_dir = root.join("static");
    std::fs::create_dir_all(static_dir.join("css")).unwrap();
    std::fs::create_dir_all(static_dir.join("docs")).unwrap();
    std::fs::write(static_dir.join("index.html"), INDEX_HTML).unwrap();
    std::fs::write(static_dir.join("css").join("site.css"), SITE_CSS).unwrap();
    std::fs::write(static_dir.join("docs").join("index.html"), "docs").unwrap();
    std::fs::write(root.join("secret.txt"), "top secret").unwrap();
}

fn write_certificate(root: &Path) {
    let ca_dir = root.join("data").join("CA");
    std::fs::create_dir_all(&ca_dir).unwrap();

    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    std::fs::write(ca_dir.join("cert.pem"), cert.serialize_pem().unwrap()).unwrap();
    std::fs::write(ca_dir.join("key.pem"), cert.serialize_private_key_pem()).unwrap();
}

async fn start_site(tls: bool, idle_timeout: Duration) -> TestSite {
    let dir = tempfile::tempdir().unwrap();
    write_site(dir.path());
    if tls {
        write_certificate(dir.path());
    }

    let mut config = ServerConfig::from_root(dir.path());
    config.bind_addr = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.port = 0;
    config.idle_timeout = idle_timeout;
    if !tls {
        config.tls = None;
    }

    let server = StaticServer::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(server.run_until(async move {
        let _ = shutdown_rx.await;
    }));

    TestSite {
        _dir: dir,
        addr,
        scheme: if tls { "https" } else { "http" },
        _shutdown: shutdown_tx,
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_https_root_serves_index() {
    let site = start_site(true, Duration::from_secs(10)).await;

    let response = client().get(site.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.version(), reqwest::Version::HTTP_2, "ALPN 应该协商到 h2");
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/html; charset=utf-8"
    );
    assert_eq!(response.text().await.unwrap(), INDEX_HTML);
}

#[tokio::test]
async fn test_https_missing_file_is_404() {
    let site = start_site(true, Duration::from_secs(10)).await;

    let response = client().get(site.url("/no/such/file.txt")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.text().await.unwrap().contains("404 Not Found"));
}

#[tokio::test]
async fn test_idle_connection_closed_during_handshake() {
    let site = start_site(true, Duration::from_millis(300)).await;

    // 连上之后什么都不发，服务器应在空闲超时后关闭连接
    let mut stream = TcpStream::connect(site.addr).await.unwrap();
    let mut buf = [0u8; 16];
    let result = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf)).await;

    match result {
        Ok(Ok(0)) | Ok(Err(_)) => {}
        Ok(Ok(n)) => panic!("空闲连接不应收到数据，收到 {} 字节", n),
        Err(_) => panic!("空闲连接在 5 秒内没有被关闭"),
    }
}

#[tokio::test]
async fn test_idle_keep_alive_connection_closed() {
    let site = start_site(false, Duration::from_millis(300)).await;

    let mut stream = TcpStream::connect(site.addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    // keep-alive 连接在响应之后保持空闲，read_to_end 只有在服务器关闭连接后才会返回
    let mut received = Vec::new();
    let result = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut received)).await;
    assert!(result.is_ok(), "keep-alive 连接在空闲超时后没有被关闭");

    let text = String::from_utf8_lossy(&received);
    assert!(text.starts_with("HTTP/1.1 200 OK"), "unexpected response: {}", text);
    assert!(text.ends_with(INDEX_HTML));
}

#[tokio::test]
async fn test_directory_redirect_and_content_type() {
    let site = start_site(false, Duration::from_secs(10)).await;
    let client = client();

    let response = client.get(site.url("/docs?lang=zh")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[header::LOCATION], "/docs/?lang=zh");

    let response = client.get(site.url("/docs/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "docs");

    let response = client.get(site.url("/css/site.css")).send().await.unwrap();
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css; charset=utf-8");
    assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
    assert_eq!(response.text().await.unwrap(), SITE_CSS);
}

#[tokio::test]
async fn test_traversal_and_method_rejected() {
    let site = start_site(false, Duration::from_secs(10)).await;
    let client = client();

    // %2f 不会被客户端规范化，解码后得到 ../secret.txt
    let response = client.get(site.url("/..%2fsecret.txt")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = client.post(site.url("/")).body("x").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "GET, HEAD");
}

#[tokio::test]
async fn test_head_range_and_etag() {
    let site = start_site(false, Duration::from_secs(10)).await;
    let client = client();

    let head = client.head(site.url("/index.html")).send().await.unwrap();
    assert_eq!(head.status(), StatusCode::OK);
    assert_eq!(
        head.headers()[header::CONTENT_LENGTH],
        INDEX_HTML.len().to_string().as_str()
    );
    let etag = head.headers()[header::ETAG].clone();
    assert!(head.bytes().await.unwrap().is_empty());

    let partial = client
        .get(site.url("/index.html"))
        .header(header::RANGE, "bytes=0-5")
        .send()
        .await
        .unwrap();
    assert_eq!(partial.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        partial.headers()[header::CONTENT_RANGE],
        format!("bytes 0-5/{}", INDEX_HTML.len()).as_str()
    );
    assert_eq!(partial.text().await.unwrap(), &INDEX_HTML[..6]);

    let cached = client
        .get(site.url("/index.html"))
        .header(header::IF_NONE_MATCH, etag)
        .send()
        .await
        .unwrap();
    assert_eq!(cached.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn test_missing_certificate_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_site(dir.path());

    let mut config = ServerConfig::from_root(dir.path());
    config.bind_addr = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.port = 0;

    let err = StaticServer::bind(config).await.err().unwrap();
    assert!(matches!(err, ProbeError::TlsError(_)));
}
