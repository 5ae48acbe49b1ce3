//! 文件扩展名到 Content-Type 的映射
//!
//! 类型表来自 `new_mime_guess`，文本类型统一补上 utf-8 字符集。

use std::path::Path;

use new_mime_guess::MimeGuess;

/// 未知扩展名使用的类型
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// 根据文件路径推断类型（扩展名不区分大小写）
pub fn from_path(path: &Path) -> String {
    let mime = MimeGuess::from_path(path).first_or_octet_stream();
    if mime.type_().as_str() == "text" && mime.get_param("charset").is_none() {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_types_get_charset() {
        assert_eq!(from_path(Path::new("static/index.html")), "text/html; charset=utf-8");
        assert_eq!(from_path(Path::new("css/site.css")), "text/css; charset=utf-8");
        assert_eq!(from_path(Path::new("report.csv")), "text/csv; charset=utf-8");
        assert_eq!(from_path(Path::new("README.md")), "text/markdown; charset=utf-8");
    }

    #[test]
    fn test_binary_types() {
        assert_eq!(from_path(Path::new("logo.PNG")), "image/png");
        assert_eq!(from_path(Path::new("bundle.zip")), "application/zip");
        assert_eq!(from_path(Path::new("font.ttf")), "font/ttf");
        assert_eq!(from_path(Path::new("photo.avif")), "image/avif");
        assert_eq!(from_path(Path::new("app.wasm")), "application/wasm");
    }

    #[test]
    fn test_unknown_and_missing_extension() {
        assert_eq!(from_path(Path::new("gzip_raw.bin")), DEFAULT_MIME_TYPE);
        assert_eq!(from_path(Path::new("sample.unknownext")), DEFAULT_MIME_TYPE);
        assert_eq!(from_path(Path::new("Makefile")), DEFAULT_MIME_TYPE);
    }
}
