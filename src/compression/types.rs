//! 压缩算法类型模块

use std::fmt;

/// 压缩算法类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionType {
    /// 不压缩（identity）
    None,
    /// Gzip 压缩
    Gzip,
    /// Deflate 压缩（zlib 封装或裸 deflate）
    Deflate,
    /// Brotli 压缩
    Brotli,
}

impl CompressionType {
    /// 获取压缩算法名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "identity",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
            Self::Brotli => "br",
        }
    }

    /// 从字符串解析压缩类型
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" | "identity" => Some(Self::None),
            "gzip" | "x-gzip" => Some(Self::Gzip),
            "deflate" => Some(Self::Deflate),
            "br" | "brotli" => Some(Self::Brotli),
            _ => None,
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// `Content-Encoding` 中的单个编码
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentCoding {
    Known(CompressionType),
    /// 不认识的编码，原样保留小写名称
    Unknown(String),
}

/// 解析后的 `Content-Encoding` 头部
///
/// 编码按头部中的顺序保存（也就是服务器施加的顺序），identity 被忽略。
/// 解码时从最后一层往前剥，遇到不认识的编码就停下，剩余部分原样保留。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentEncoding {
    codings: Vec<ContentCoding>,
}

impl ContentEncoding {
    /// 解析头部值，永远不会失败
    pub fn parse(value: &str) -> Self {
        let codings = value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .filter_map(|part| match CompressionType::from_str(part) {
                Some(CompressionType::None) => None,
                Some(known) => Some(ContentCoding::Known(known)),
                None => Some(ContentCoding::Unknown(part.to_ascii_lowercase())),
            })
            .collect();
        Self { codings }
    }

    /// 按施加顺序排列的编码
    pub fn codings(&self) -> &[ContentCoding] {
        &self.codings
    }

    /// 能够剥掉的编码层，按解码顺序（最外层在前）
    pub fn decode_layers(&self) -> Vec<CompressionType> {
        self.codings
            .iter()
            .rev()
            .map_while(|coding| match coding {
                ContentCoding::Known(known) => Some(*known),
                ContentCoding::Unknown(_) => None,
            })
            .collect()
    }

    /// 剥不掉的编码（按施加顺序），为空表示可以完整解码
    pub fn undecodable(&self) -> Vec<&str> {
        let decodable = self.decode_layers().len();
        let remaining = self.codings.len() - decodable;
        self.codings[..remaining]
            .iter()
            .map(|coding| match coding {
                ContentCoding::Known(known) => known.name(),
                ContentCoding::Unknown(name) => name.as_str(),
            })
            .collect()
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.codings.is_empty() {
            return write!(f, "identity");
        }
        let names: Vec<&str> = self
            .codings
            .iter()
            .map(|coding| match coding {
                ContentCoding::Known(known) => known.name(),
                ContentCoding::Unknown(name) => name.as_str(),
            })
            .collect();
        write!(f, "{}", names.join(", "))
    }
}
