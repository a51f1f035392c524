//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）、传输层重试、嵌入

pub mod deepseek;
pub mod embedding;
pub mod message;
pub mod mock;
pub mod openai;
pub mod retry;
pub mod traits;

pub use deepseek::{create_deepseek_client, DEEPSEEK_CHAT, DEEPSEEK_REASONER};
pub use embedding::{EmbeddingProvider, OpenAiEmbedder};
pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use retry::RetryingLlmClient;
pub use traits::{LlmClient, LlmError};
