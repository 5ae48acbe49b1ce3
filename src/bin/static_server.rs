//! 本地 HTTPS 静态文件测试服务器
//!
//! 默认读取 `data/CA/cert.pem` / `data/CA/key.pem`，
//! 以 `static/` 为根目录在 `0.0.0.0:8713` 上提供服务。

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rat_probe::config::ProbeConfig;
use rat_probe::error::ProbeResult;
use rat_probe::server::{ServerConfig, StaticServer};
use rat_probe::utils::logger::{LogConfig, LogLevel, Logger, error};

#[derive(Parser)]
#[command(name = "static_server")]
#[command(about = "本地测试用的 HTTPS 静态文件服务器", long_about = None)]
#[command(version)]
struct Cli {
    /// 根目录（证书和静态目录相对于它）
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// TOML 配置文件
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 监听地址
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// 监听端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 空闲连接超时（秒）
    #[arg(long)]
    idle_timeout_secs: Option<u64>,

    /// 使用明文 HTTP
    #[arg(long)]
    no_tls: bool,

    /// 日志级别
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// 关闭终端日志颜色
    #[arg(long)]
    no_color: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => ProbeConfig::from_file(path)?,
        None => ProbeConfig::default(),
    };
    let section = file_config.server;

    let level = cli.log_level.or(section.log_level).unwrap_or(LogLevel::Info);
    Logger::init(LogConfig {
        enable_color: !cli.no_color,
        ..LogConfig::with_level(level)
    })?;

    let root = cli
        .root
        .or_else(|| section.root.clone())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut config = ServerConfig::from_root(&root);
    section.apply_to(&mut config, &root)?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(secs) = cli.idle_timeout_secs {
        if secs == 0 {
            return Err("--idle-timeout-secs 必须大于 0".into());
        }
        config.idle_timeout = Duration::from_secs(secs);
    }
    if cli.no_tls {
        config.tls = None;
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(serve(config));
    if let Err(e) = &result {
        error!("❌ 服务器运行失败: {}", e);
    }
    Logger::flush();
    Ok(result?)
}

async fn serve(config: ServerConfig) -> ProbeResult<()> {
    StaticServer::bind(config).await?.run().await
}
