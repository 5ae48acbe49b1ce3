//! HTTP 服务器连接层

pub mod http_connection;

pub use http_connection::{handle_connection, handle_tls_connection, is_client_disconnect};
