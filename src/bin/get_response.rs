//! 编码采样抓取工具
//!
//! 默认依次抓取 deflate / gzip / br 三个地址，
//! 在当前目录生成 `{name}_decoded.bin` 和 `{name}_raw.bin`。

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rat_probe::client::{FetcherConfig, ResponseFetcher, SaveMode, SavedFile};
use rat_probe::config::ProbeConfig;
use rat_probe::error::ProbeResult;
use rat_probe::utils::logger::{LogConfig, LogLevel, Logger, error, info};

#[derive(Parser)]
#[command(name = "get_response")]
#[command(about = "下载 HTTP 编码采样响应，分别保存原始字节和解码后的字节", long_about = None)]
#[command(version)]
struct Cli {
    /// 输出目录
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// TOML 配置文件
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 单次请求超时（秒）
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// 写完后校验原始文件解码结果与解码文件一致
    #[arg(long)]
    verify: bool,

    /// 接受无效证书（本地自签名服务器）
    #[arg(long)]
    insecure: bool,

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

    let level = cli
        .log_level
        .or(file_config.fetcher.log_level)
        .unwrap_or(LogLevel::Info);
    Logger::init(LogConfig {
        enable_color: !cli.no_color,
        ..LogConfig::with_level(level)
    })?;

    let mut config = FetcherConfig::default();
    file_config.fetcher.apply_to(&mut config)?;
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(secs) = cli.timeout_secs {
        config.timeout = Some(Duration::from_secs(secs));
    }
    if cli.verify {
        config.verify = true;
    }
    if cli.insecure {
        config.accept_invalid_certs = true;
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = match runtime.block_on(fetch(config)) {
        Ok(reports) => {
            for report in &reports {
                let kind = match report.mode {
                    SaveMode::Raw => "raw",
                    SaveMode::Decoded => "decoded",
                };
                info!(
                    "📄 {} [{}] {} 字节 ({}, chunked={})",
                    report.path.display(),
                    kind,
                    report.bytes_written,
                    report.content_encoding,
                    report.chunked
                );
            }
            Ok(())
        }
        Err(e) => {
            error!("❌ 采样失败: {}", e);
            Err(e.into())
        }
    };
    Logger::flush();
    result
}

async fn fetch(config: FetcherConfig) -> ProbeResult<Vec<SavedFile>> {
    ResponseFetcher::new(config)?.run().await
}
