//! 采样用例

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// 一个采样用例：名称决定输出文件名，URL 是要抓取的地址
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SampleCase {
    pub name: String,
    pub url: String,
}

impl SampleCase {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// `{name}_raw.bin`
    pub fn raw_file_name(&self) -> String {
        format!("{}_raw.bin", self.name)
    }

    /// `{name}_decoded.bin`
    pub fn decoded_file_name(&self) -> String {
        format!("{}_decoded.bin", self.name)
    }

    pub fn raw_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.raw_file_name())
    }

    pub fn decoded_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.decoded_file_name())
    }
}

/// 内置的三个用例，按顺序执行
pub fn default_cases() -> Vec<SampleCase> {
    vec![
        SampleCase::new("deflate", "https://postman-echo.com/deflate"),
        SampleCase::new("gzip", "https://postman-echo.com/gzip"),
        SampleCase::new("br", "https://zhuanlan.zhihu.com/p/166359481"),
    ]
}
