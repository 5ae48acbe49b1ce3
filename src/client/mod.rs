//! 客户端模块
//!
//! 抓取 HTTP 编码采样响应并落盘

pub mod fetcher;
pub mod sample_case;

pub use fetcher::{FetcherConfig, ResponseFetcher, SaveMode, SavedFile};
pub use sample_case::{SampleCase, default_cases};
