use std::sync::Once;

static CRYPTO_PROVIDER_INIT: Once = Once::new();

/// 确保 rustls 的 ring 加密后端只安装一次
///
/// 无论被调用多少次，进程级默认 CryptoProvider 只会设置一次；
/// 如果其他组件已经抢先安装了 provider，则沿用已有的。
pub fn ensure_crypto_provider_installed() {
    CRYPTO_PROVIDER_INIT.call_once(|| {
        if rustls::crypto::ring::default_provider().install_default().is_err() {
            crate::utils::logger::debug!("🔐 CryptoProvider 已由其他组件安装，沿用现有实现");
        } else {
            crate::utils::logger::debug!("🔐 ring CryptoProvider 已安装");
        }
    });
}
