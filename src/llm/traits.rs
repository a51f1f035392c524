//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient；
//! 控制器只依赖 complete，一次调用对应一次模型推理。

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::Message;

/// LLM 调用错误（传输层；重试耗尽后向上传播，请求整体失败）
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("LLM 请求失败: {0}")]
    Request(String),

    #[error("LLM 返回内容为空")]
    EmptyResponse,
}

/// LLM 客户端 trait：非流式完成与 token 统计
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 发送整段对话，返回模型的一条回复文本
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
