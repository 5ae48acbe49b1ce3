//! 流式解码器
//!
//! 按帧喂入原始（Content-Encoding 编码过的）响应体，边喂边产出解码后的字节。

use std::io::Write;

use brotli::writer::DecompressorWriter;
use flate2::write::{DeflateDecoder, GzDecoder, ZlibDecoder};

use super::types::{CompressionType, ContentEncoding};
use crate::error::{ProbeError, ProbeResult};

/// Brotli 解码器内部缓冲大小
const BROTLI_BUFFER_SIZE: usize = 4096;

enum DecoderState {
    Identity(Vec<u8>),
    Gzip(GzDecoder<Vec<u8>>),
    Zlib(ZlibDecoder<Vec<u8>>),
    RawDeflate(DeflateDecoder<Vec<u8>>),
    Brotli(Box<DecompressorWriter<Vec<u8>>>),
    /// deflate 在拿到前两个字节之前无法判断是否带 zlib 头
    DeflateSniff(Vec<u8>),
}

impl DecoderState {
    fn new(algorithm: CompressionType) -> Self {
        match algorithm {
            CompressionType::None => Self::Identity(Vec::new()),
            CompressionType::Gzip => Self::Gzip(GzDecoder::new(Vec::new())),
            CompressionType::Deflate => Self::DeflateSniff(Vec::new()),
            CompressionType::Brotli => {
                Self::Brotli(Box::new(DecompressorWriter::new(Vec::new(), BROTLI_BUFFER_SIZE)))
            }
        }
    }

    /// 根据数据头判断 deflate 的具体格式
    fn deflate_for(prefix: &[u8]) -> Self {
        if is_zlib_header(prefix) {
            Self::Zlib(ZlibDecoder::new(Vec::new()))
        } else {
            Self::RawDeflate(DeflateDecoder::new(Vec::new()))
        }
    }
}

/// 判断数据是否以合法的 zlib 头开始（RFC 1950：CM=8 且 CMF/FLG 校验通过）
pub fn is_zlib_header(data: &[u8]) -> bool {
    if data.len() < 2 {
        return false;
    }
    let cmf = data[0];
    let flg = data[1];
    cmf & 0x0f == 8 && ((u16::from(cmf) << 8) | u16::from(flg)) % 31 == 0
}

/// 单层解码器
struct LayerDecoder {
    algorithm: CompressionType,
    state: DecoderState,
    total_in: u64,
}

impl LayerDecoder {
    fn new(algorithm: CompressionType) -> Self {
        Self {
            algorithm,
            state: DecoderState::new(algorithm),
            total_in: 0,
        }
    }

    fn feed(&mut self, data: &[u8]) -> ProbeResult<Vec<u8>> {
        self.total_in += data.len() as u64;

        if let DecoderState::DeflateSniff(pending) = &mut self.state {
            pending.extend_from_slice(data);
            if pending.len() < 2 {
                return Ok(Vec::new());
            }
            let pending = std::mem::take(pending);
            self.state = DecoderState::deflate_for(&pending);
            self.write_state(&pending)?;
        } else {
            self.write_state(data)?;
        }

        Ok(self.drain())
    }

    fn finish(mut self) -> ProbeResult<Vec<u8>> {
        if self.total_in == 0 {
            return Ok(Vec::new());
        }

        if let DecoderState::DeflateSniff(pending) = &mut self.state {
            let pending = std::mem::take(pending);
            self.state = DecoderState::deflate_for(&pending);
            self.write_state(&pending)?;
        }

        let algorithm = self.algorithm;
        let incomplete =
            |e: std::io::Error| ProbeError::DecodingError(format!("{} 数据流不完整: {}", algorithm, e));

        match &mut self.state {
            DecoderState::Gzip(decoder) => decoder.try_finish().map_err(incomplete)?,
            DecoderState::Zlib(decoder) => decoder.try_finish().map_err(incomplete)?,
            DecoderState::RawDeflate(decoder) => decoder.try_finish().map_err(incomplete)?,
            DecoderState::Brotli(decoder) => decoder.close().map_err(incomplete)?,
            DecoderState::Identity(_) | DecoderState::DeflateSniff(_) => {}
        }

        Ok(self.drain())
    }

    fn write_state(&mut self, data: &[u8]) -> ProbeResult<()> {
        let result = match &mut self.state {
            DecoderState::Identity(out) => {
                out.extend_from_slice(data);
                Ok(())
            }
            DecoderState::Gzip(decoder) => decoder.write_all(data),
            DecoderState::Zlib(decoder) => decoder.write_all(data),
            DecoderState::RawDeflate(decoder) => decoder.write_all(data),
            DecoderState::Brotli(decoder) => decoder.write_all(data),
            DecoderState::DeflateSniff(pending) => {
                pending.extend_from_slice(data);
                Ok(())
            }
        };

        result.map_err(|e| ProbeError::DecodingError(format!("{} 解码失败: {}", self.algorithm, e)))
    }

    fn drain(&mut self) -> Vec<u8> {
        match &mut self.state {
            DecoderState::Identity(out) => std::mem::take(out),
            DecoderState::Gzip(decoder) => std::mem::take(decoder.get_mut()),
            DecoderState::Zlib(decoder) => std::mem::take(decoder.get_mut()),
            DecoderState::RawDeflate(decoder) => std::mem::take(decoder.get_mut()),
            DecoderState::Brotli(decoder) => std::mem::take(decoder.get_mut()),
            DecoderState::DeflateSniff(_) => Vec::new(),
        }
    }
}

/// 流式内容解码器
///
/// 可以串联多层解码：每一层的输出作为下一层的输入。没有任何层时原样输出。
pub struct StreamDecoder {
    layers: Vec<LayerDecoder>,
    total_in: u64,
    total_out: u64,
}

impl StreamDecoder {
    /// 创建单一算法的解码器
    pub fn new(algorithm: CompressionType) -> Self {
        Self::layered(&[algorithm])
    }

    /// 按解码顺序（最外层在前）创建多层解码器，identity 层被跳过
    pub fn layered(algorithms: &[CompressionType]) -> Self {
        Self {
            layers: algorithms
                .iter()
                .filter(|algorithm| **algorithm != CompressionType::None)
                .map(|algorithm| LayerDecoder::new(*algorithm))
                .collect(),
            total_in: 0,
            total_out: 0,
        }
    }

    /// 按 `Content-Encoding` 创建解码器，剥不掉的编码保持原样
    pub fn for_encoding(encoding: &ContentEncoding) -> Self {
        Self::layered(&encoding.decode_layers())
    }

    /// 按解码顺序排列的算法
    pub fn algorithms(&self) -> Vec<CompressionType> {
        self.layers.iter().map(|layer| layer.algorithm).collect()
    }

    /// 已喂入的编码字节数
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// 已产出的解码字节数
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// 喂入一段编码数据，返回目前可用的解码数据
    pub fn feed(&mut self, data: &[u8]) -> ProbeResult<Vec<u8>> {
        self.total_in += data.len() as u64;

        let mut chunk = data.to_vec();
        for layer in &mut self.layers {
            if chunk.is_empty() {
                break;
            }
            chunk = layer.feed(&chunk)?;
        }

        self.total_out += chunk.len() as u64;
        Ok(chunk)
    }

    /// 结束数据流，逐层收尾并返回剩余的解码数据
    pub fn finish(self) -> ProbeResult<Vec<u8>> {
        let mut carry = Vec::new();
        for mut layer in self.layers {
            let mut out = if carry.is_empty() {
                Vec::new()
            } else {
                layer.feed(&carry)?
            };
            out.extend(layer.finish()?);
            carry = out;
        }
        Ok(carry)
    }

    /// 一次性解码整块数据
    pub fn decode_all(mut self, data: &[u8]) -> ProbeResult<Vec<u8>> {
        let mut decoded = self.feed(data)?;
        decoded.extend(self.finish()?);
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::Compressor;

    const SAMPLE: &[u8] = b"{\"gzipped\":true,\"headers\":{\"host\":\"postman-echo.com\"},\"method\":\"GET\"}";

    fn decode_in_pieces(algorithm: CompressionType, encoded: &[u8], piece: usize) -> Vec<u8> {
        let mut decoder = StreamDecoder::new(algorithm);
        let mut out = Vec::new();
        for chunk in encoded.chunks(piece) {
            out.extend(decoder.feed(chunk).unwrap());
        }
        out.extend(decoder.finish().unwrap());
        out
    }

    #[test]
    fn test_gzip_in_small_pieces() {
        let encoded = Compressor::default().compress(SAMPLE, CompressionType::Gzip).unwrap();
        assert_eq!(decode_in_pieces(CompressionType::Gzip, &encoded, 7), SAMPLE);
    }

    #[test]
    fn test_deflate_zlib_wrapped_with_single_byte_first_frame() {
        let encoded = Compressor::default().compress(SAMPLE, CompressionType::Deflate).unwrap();
        assert!(is_zlib_header(&encoded));
        assert_eq!(decode_in_pieces(CompressionType::Deflate, &encoded, 1), SAMPLE);
    }

    #[test]
    fn test_raw_deflate_detected() {
        let encoded = Compressor::default().compress_raw_deflate(SAMPLE).unwrap();
        assert!(!is_zlib_header(&encoded));
        assert_eq!(decode_in_pieces(CompressionType::Deflate, &encoded, 16), SAMPLE);
    }

    #[test]
    fn test_brotli() {
        let encoded = Compressor::default().compress(SAMPLE, CompressionType::Brotli).unwrap();
        assert_eq!(decode_in_pieces(CompressionType::Brotli, &encoded, 5), SAMPLE);
    }

    #[test]
    fn test_identity_passthrough_and_counters() {
        let mut decoder = StreamDecoder::new(CompressionType::None);
        assert_eq!(decoder.feed(b"abc").unwrap(), b"abc");
        assert_eq!(decoder.total_in(), 3);
        assert_eq!(decoder.total_out(), 3);
        assert!(decoder.finish().unwrap().is_empty());
    }

    #[test]
    fn test_stacked_layers() {
        let compressor = Compressor::default();
        let inner = compressor.compress(SAMPLE, CompressionType::Gzip).unwrap();
        let outer = compressor.compress(&inner, CompressionType::Brotli).unwrap();

        let encoding = ContentEncoding::parse("gzip, br");
        let mut decoder = StreamDecoder::for_encoding(&encoding);
        assert_eq!(
            decoder.algorithms(),
            vec![CompressionType::Brotli, CompressionType::Gzip]
        );

        let mut out = Vec::new();
        for chunk in outer.chunks(3) {
            out.extend(decoder.feed(chunk).unwrap());
        }
        out.extend(decoder.finish().unwrap());
        assert_eq!(out, SAMPLE);
    }

    #[test]
    fn test_unknown_encoding_passes_through() {
        let decoder = StreamDecoder::for_encoding(&ContentEncoding::parse("zstd"));
        assert!(decoder.algorithms().is_empty());
        assert_eq!(decoder.decode_all(b"\x28\xb5\x2f\xfd opaque").unwrap(), b"\x28\xb5\x2f\xfd opaque");
    }

    #[test]
    fn test_empty_body() {
        let decoder = StreamDecoder::new(CompressionType::Gzip);
        assert!(decoder.finish().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_gzip_rejected() {
        let mut decoder = StreamDecoder::new(CompressionType::Gzip);
        let result = decoder.feed(b"definitely not gzip data");
        assert!(matches!(result, Err(ProbeError::DecodingError(_))));
    }
}
