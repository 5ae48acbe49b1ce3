//! 证书管理模块

pub mod rustls_cert;

pub use rustls_cert::{AlpnProtocol, RustlsCertManager};
