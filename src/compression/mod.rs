//! 压缩模块
//!
//! 支持 HTTP 常见的内容编码：Gzip、Deflate（zlib 封装或裸 deflate）和 Brotli。
//! 抓取工具用流式解码器还原响应体，整块压缩/解压用于校验和测试。

pub mod compressor;
pub mod decoder;
pub mod types;

// 重新导出主要的公共类型
pub use compressor::Compressor;
pub use decoder::StreamDecoder;
pub use types::{CompressionType, ContentCoding, ContentEncoding};
