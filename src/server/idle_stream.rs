//! 空闲超时流
//!
//! 包装底层连接：读写有进展时重置计时器，
//! 连接在等待 I/O 期间超过空闲时间没有任何进展则返回 `TimedOut` 错误，
//! 上层（TLS 握手、hyper 连接）随之结束并关闭连接。

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{Instant, Sleep, sleep};

pin_project! {
    /// 带空闲超时的流
    pub struct IdleTimeoutStream<S> {
        #[pin]
        inner: S,
        #[pin]
        deadline: Sleep,
        timeout: Duration,
    }
}

impl<S> IdleTimeoutStream<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self {
            inner,
            deadline: sleep(timeout),
            timeout,
        }
    }
}

fn touch(deadline: Pin<&mut Sleep>, timeout: Duration) {
    deadline.reset(Instant::now() + timeout);
}

fn poll_idle<T>(deadline: Pin<&mut Sleep>, cx: &mut Context<'_>) -> Poll<io::Result<T>> {
    match deadline.poll(cx) {
        Poll::Ready(()) => Poll::Ready(Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "connection idle timeout",
        ))),
        Poll::Pending => Poll::Pending,
    }
}

impl<S: AsyncRead> AsyncRead for IdleTimeoutStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        match this.inner.poll_read(cx, buf) {
            Poll::Ready(result) => {
                touch(this.deadline, *this.timeout);
                Poll::Ready(result)
            }
            Poll::Pending => poll_idle(this.deadline, cx),
        }
    }
}

impl<S: AsyncWrite> AsyncWrite for IdleTimeoutStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, io::Error>> {
        let this = self.project();
        match this.inner.poll_write(cx, buf) {
            Poll::Ready(result) => {
                touch(this.deadline, *this.timeout);
                Poll::Ready(result)
            }
            Poll::Pending => poll_idle(this.deadline, cx),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        let this = self.project();
        match this.inner.poll_flush(cx) {
            Poll::Ready(result) => Poll::Ready(result),
            Poll::Pending => poll_idle(this.deadline, cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        self.project().inner.poll_shutdown(cx)
    }
}

/// 判断错误链中是否包含空闲超时
pub fn is_idle_timeout(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::TimedOut {
                return true;
            }
        }
        current = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    #[tokio::test]
    async fn test_idle_read_times_out() {
        let (client, _server) = duplex(64);
        let mut stream = Box::pin(IdleTimeoutStream::new(client, Duration::from_millis(50)));

        let mut buf = [0u8; 8];
        let err = stream.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(is_idle_timeout(&err));
    }

    #[tokio::test]
    async fn test_activity_resets_deadline() {
        let (client, mut server) = duplex(64);
        let mut stream = Box::pin(IdleTimeoutStream::new(client, Duration::from_millis(200)));

        tokio::spawn(async move {
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_millis(100)).await;
                server.write_all(b"x").await.unwrap();
            }
        });

        // 总耗时超过超时时间，但每次读之间都有数据到达
        let mut buf = [0u8; 1];
        for _ in 0..3 {
            stream.read_exact(&mut buf).await.unwrap();
        }
        assert_eq!(&buf, b"x");
    }

    #[test]
    fn test_other_errors_are_not_timeouts() {
        let err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert!(!is_idle_timeout(&err));
    }
}
