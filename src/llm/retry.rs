//! 传输层重试包装
//!
//! 只兜底网络 / API 层面的失败，固定次数，失败间隔短暂退避；
//! 与流水线控制器的 SQL 重试是两个独立的循环，互不感知。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message};

/// 对任意 LlmClient 加固定次数重试；max_retries 为失败后的追加尝试数
pub struct RetryingLlmClient {
    inner: Arc<dyn LlmClient>,
    max_retries: u32,
}

impl RetryingLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>, max_retries: u32) -> Self {
        Self { inner, max_retries }
    }
}

#[async_trait]
impl LlmClient for RetryingLlmClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.inner.token_usage()
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let mut attempt = 0;
        loop {
            match self.inner.complete(messages).await {
                Ok(content) => return Ok(content),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "LLM 调用失败，重试");
                    tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// 前 fail_times 次返回错误，之后成功
    struct FlakyClient {
        fail_times: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LlmClient for FlakyClient {
        async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Err(LlmError::Request("connection reset".into()))
            } else {
                Ok("ok".into())
            }
        }
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let inner = Arc::new(FlakyClient {
            fail_times: 2,
            calls: AtomicU32::new(0),
        });
        let client = RetryingLlmClient::new(inner.clone(), 2);
        let out = client.complete(&[Message::user("hi")]).await.unwrap();
        assert_eq!(out, "ok");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let inner = Arc::new(FlakyClient {
            fail_times: 10,
            calls: AtomicU32::new(0),
        });
        let client = RetryingLlmClient::new(inner.clone(), 2);
        assert!(client.complete(&[Message::user("hi")]).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }
}
