//! 压缩器模块
//!
//! 一次性压缩/解压整块数据。抓取工具的校验步骤用它来复核落盘的原始字节，
//! 测试用它来构造带编码的响应体。

use std::io::Write;

use flate2::Compression;
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};

use super::decoder::StreamDecoder;
use super::types::CompressionType;
use crate::error::{ProbeError, ProbeResult};

/// 默认压缩级别
pub const DEFAULT_LEVEL: u32 = 6;

/// 压缩器
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    /// 压缩级别 (1-9，越大压缩率越高但速度越慢)
    pub level: u32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self { level: DEFAULT_LEVEL }
    }
}

impl Compressor {
    /// 创建指定级别的压缩器
    pub fn new(level: u32) -> Self {
        Self {
            level: level.clamp(1, 9),
        }
    }

    /// 压缩数据
    pub fn compress(&self, data: &[u8], algorithm: CompressionType) -> ProbeResult<Vec<u8>> {
        match algorithm {
            CompressionType::None => Ok(data.to_vec()),
            CompressionType::Gzip => self.compress_gzip(data),
            CompressionType::Deflate => self.compress_deflate(data),
            CompressionType::Brotli => self.compress_brotli(data),
        }
    }

    /// 解压数据
    pub fn decompress(&self, data: &[u8], algorithm: CompressionType) -> ProbeResult<Vec<u8>> {
        StreamDecoder::new(algorithm).decode_all(data)
    }

    // Gzip 压缩
    fn compress_gzip(&self, data: &[u8]) -> ProbeResult<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| ProbeError::DecodingError(format!("Gzip compression error: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| ProbeError::DecodingError(format!("Gzip finish error: {}", e)))
    }

    // HTTP 的 deflate 指 zlib 封装格式
    fn compress_deflate(&self, data: &[u8]) -> ProbeResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| ProbeError::DecodingError(format!("Deflate compression error: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| ProbeError::DecodingError(format!("Deflate finish error: {}", e)))
    }

    /// 裸 deflate 压缩（没有 zlib 头，部分服务器会这样发送）
    pub fn compress_raw_deflate(&self, data: &[u8]) -> ProbeResult<Vec<u8>> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .map_err(|e| ProbeError::DecodingError(format!("Deflate compression error: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| ProbeError::DecodingError(format!("Deflate finish error: {}", e)))
    }

    // Brotli 压缩
    fn compress_brotli(&self, data: &[u8]) -> ProbeResult<Vec<u8>> {
        use brotli::enc::BrotliEncoderParams;

        let mut params = BrotliEncoderParams::default();
        params.quality = self.level as i32;
        params.lgwin = 22; // 窗口大小，推荐 20-22

        let mut output = Vec::new();
        brotli::BrotliCompress(&mut &data[..], &mut output, &params)
            .map_err(|e| ProbeError::DecodingError(format!("Brotli compression error: {}", e)))?;
        Ok(output)
    }
}
