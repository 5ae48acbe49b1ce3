//! 响应采样抓取器
//!
//! 对每个用例各发起两次 GET：一次把解码后的响应体写入 `{name}_decoded.bin`，
//! 一次把未解码的原始响应体写入 `{name}_raw.bin`。
//! HTTP 客户端的自动解压被关闭，解码统一交给 `compression` 模块完成。

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_ENCODING, HeaderMap, HeaderValue, TRANSFER_ENCODING};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::sample_case::{SampleCase, default_cases};
use crate::compression::{ContentEncoding, StreamDecoder};
use crate::error::{ProbeError, ProbeResult};
use crate::utils::logger::{debug, info, warn};

/// 每次写文件的块大小
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// 默认声明的可接受编码
pub const DEFAULT_ACCEPT_ENCODING: &str = "gzip, deflate, br";

/// 抓取器配置
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// 输出目录
    pub output_dir: PathBuf,
    /// 写文件块大小
    pub chunk_size: usize,
    /// 单次请求超时，`None` 表示不限制
    pub timeout: Option<Duration>,
    /// 请求携带的 Accept-Encoding
    pub accept_encoding: String,
    /// 要执行的用例
    pub cases: Vec<SampleCase>,
    /// 写完后校验原始文件解码结果与解码文件一致
    pub verify: bool,
    /// 接受无效证书（仅用于本地自签名测试服务器）
    pub accept_invalid_certs: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: None,
            accept_encoding: DEFAULT_ACCEPT_ENCODING.to_string(),
            cases: default_cases(),
            verify: false,
            accept_invalid_certs: false,
        }
    }
}

/// 写入的是哪一种文件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Raw,
    Decoded,
}

/// 单个输出文件的写入报告
#[derive(Debug, Clone)]
pub struct SavedFile {
    pub case_name: String,
    pub mode: SaveMode,
    pub path: PathBuf,
    pub bytes_written: u64,
    /// 写文件调用次数
    pub write_calls: usize,
    /// 响应中的 Content-Encoding 原值
    pub content_encoding: String,
    /// 响应是否使用了 `Transfer-Encoding: chunked`
    pub chunked: bool,
}

/// 响应采样抓取器
pub struct ResponseFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
}

impl ResponseFetcher {
    /// 创建抓取器
    pub fn new(config: FetcherConfig) -> ProbeResult<Self> {
        if config.chunk_size == 0 {
            return Err(ProbeError::InvalidArgument("chunk_size 必须大于 0".to_string()));
        }

        let mut headers = HeaderMap::new();
        let accept_encoding = HeaderValue::from_str(&config.accept_encoding).map_err(|e| {
            ProbeError::InvalidArgument(format!("无效的 Accept-Encoding '{}': {}", config.accept_encoding, e))
        })?;
        headers.insert(ACCEPT_ENCODING, accept_encoding);

        let mut builder = reqwest::Client::builder()
            .no_gzip()
            .no_brotli()
            .no_deflate()
            .default_headers(headers)
            .user_agent(concat!("rat_probe/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// 依次执行所有用例：先写解码文件，再写原始文件
    pub async fn run(&self) -> ProbeResult<Vec<SavedFile>> {
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let mut reports = Vec::with_capacity(self.config.cases.len() * 2);
        for case in &self.config.cases {
            info!("🚀 开始采样: {} -> {}", case.name, case.url);

            let decoded = self.save_decoded(case).await?;
            let raw = self.save_raw(case).await?;

            if self.config.verify {
                verify_saved(&raw, &decoded).await?;
                info!("✅ 校验通过: {}", case.name);
            }

            reports.push(decoded);
            reports.push(raw);
        }

        info!("🎉 全部采样完成，共 {} 个用例", self.config.cases.len());
        Ok(reports)
    }

    /// 把未解码的响应体写入 `{name}_raw.bin`
    ///
    /// chunked 响应按帧读取，每次最多写入 `chunk_size` 字节；
    /// 其他响应一次读完整个响应体并一次写入。
    pub async fn save_raw(&self, case: &SampleCase) -> ProbeResult<SavedFile> {
        let response = self.request(&case.url).await?;
        print_headers(response.headers());
        let content_encoding = content_encoding_of(response.headers())?;
        let chunked = is_chunked(response.headers());

        let path = case.raw_path(&self.config.output_dir);
        println!("save {}", case.raw_file_name());

        let mut file = File::create(&path).await?;
        let mut bytes_written = 0u64;
        let mut write_calls = 0usize;

        if chunked {
            println!("write chunked data");
            let mut stream = response.bytes_stream();
            while let Some(frame) = stream.next().await {
                let frame = frame?;
                for piece in frame.chunks(self.config.chunk_size) {
                    file.write_all(piece).await?;
                    bytes_written += piece.len() as u64;
                    write_calls += 1;
                }
            }
        } else {
            let body = response.bytes().await?;
            file.write_all(&body).await?;
            bytes_written = body.len() as u64;
            write_calls = 1;
        }
        file.flush().await?;

        debug!("💾 原始响应体已写入 {}: {} 字节, {} 次写入", path.display(), bytes_written, write_calls);

        Ok(SavedFile {
            case_name: case.name.clone(),
            mode: SaveMode::Raw,
            path,
            bytes_written,
            write_calls,
            content_encoding,
            chunked,
        })
    }

    /// 把解码后的响应体写入 `{name}_decoded.bin`，每次最多写入 `chunk_size` 字节
    pub async fn save_decoded(&self, case: &SampleCase) -> ProbeResult<SavedFile> {
        let response = self.request(&case.url).await?;
        let content_encoding = content_encoding_of(response.headers())?;
        let chunked = is_chunked(response.headers());

        let path = case.decoded_path(&self.config.output_dir);
        println!("save {}", case.decoded_file_name());

        let mut file = File::create(&path).await?;
        let mut writer = BlockWriter::new(self.config.chunk_size);
        let mut decoder = decoder_for(&content_encoding);

        let mut stream = response.bytes_stream();
        while let Some(frame) = stream.next().await {
            let decoded = decoder.feed(&frame?)?;
            writer.push(&mut file, &decoded).await?;
        }
        let tail = decoder.finish()?;
        writer.push(&mut file, &tail).await?;
        writer.flush(&mut file).await?;
        file.flush().await?;

        debug!(
            "💾 解码响应体已写入 {}: {} 字节, {} 次写入",
            path.display(),
            writer.bytes_written,
            writer.write_calls
        );

        Ok(SavedFile {
            case_name: case.name.clone(),
            mode: SaveMode::Decoded,
            path,
            bytes_written: writer.bytes_written,
            write_calls: writer.write_calls,
            content_encoding,
            chunked,
        })
    }

    async fn request(&self, url: &str) -> ProbeResult<reqwest::Response> {
        debug!("📤 GET {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            warn!("⚠️ {} 返回状态码 {}", url, response.status());
        } else {
            debug!("📥 {} {:?} {}", url, response.version(), response.status());
        }

        Ok(response)
    }
}

fn print_headers(headers: &HeaderMap) {
    for (name, value) in headers {
        println!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
}

/// 取出并打印 Content-Encoding；头部必须存在，取值不做校验
fn content_encoding_of(headers: &HeaderMap) -> ProbeResult<String> {
    let value = headers
        .get(CONTENT_ENCODING)
        .ok_or_else(|| ProbeError::MissingHeader(CONTENT_ENCODING.to_string()))?;
    let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
    println!("Content-Encoding: {}", value);
    Ok(value)
}

/// 按 Content-Encoding 逐层解码，剥不掉的编码原样保留
fn decoder_for(content_encoding: &str) -> StreamDecoder {
    let encoding = ContentEncoding::parse(content_encoding);
    let undecodable = encoding.undecodable();
    if !undecodable.is_empty() {
        warn!("⚠️ 无法解码的 Content-Encoding: {}，保留这部分编码的原始字节", undecodable.join(", "));
    }
    StreamDecoder::for_encoding(&encoding)
}

/// `Transfer-Encoding` 是否为 chunked
pub fn is_chunked(headers: &HeaderMap) -> bool {
    headers
        .get(TRANSFER_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("chunked"))
        .unwrap_or(false)
}

/// 按固定块大小写文件，不足一块的数据留到下一次或 flush 时写出
struct BlockWriter {
    block_size: usize,
    pending: Vec<u8>,
    bytes_written: u64,
    write_calls: usize,
}

impl BlockWriter {
    fn new(block_size: usize) -> Self {
        Self {
            block_size,
            pending: Vec::with_capacity(block_size),
            bytes_written: 0,
            write_calls: 0,
        }
    }

    async fn push(&mut self, file: &mut File, data: &[u8]) -> ProbeResult<()> {
        self.pending.extend_from_slice(data);
        while self.pending.len() >= self.block_size {
            let block: Vec<u8> = self.pending.drain(..self.block_size).collect();
            self.write(file, &block).await?;
        }
        Ok(())
    }

    async fn flush(&mut self, file: &mut File) -> ProbeResult<()> {
        if !self.pending.is_empty() {
            let block = std::mem::take(&mut self.pending);
            self.write(file, &block).await?;
        }
        Ok(())
    }

    async fn write(&mut self, file: &mut File, block: &[u8]) -> ProbeResult<()> {
        file.write_all(block).await?;
        self.bytes_written += block.len() as u64;
        self.write_calls += 1;
        Ok(())
    }
}

/// 用一次性解码复核原始文件，结果必须与解码文件一致
async fn verify_saved(raw: &SavedFile, decoded: &SavedFile) -> ProbeResult<()> {
    let raw_bytes = tokio::fs::read(&raw.path).await?;
    let decoded_bytes = tokio::fs::read(&decoded.path).await?;

    let expected = decoder_for(&raw.content_encoding).decode_all(&raw_bytes)?;
    if expected != decoded_bytes {
        return Err(ProbeError::DecodingError(format!(
            "{} 与 {} 内容不一致 ({} vs {} 字节)",
            display_name(&raw.path),
            display_name(&decoded.path),
            expected.len(),
            decoded_bytes.len()
        )));
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
