//! ReAct 模式：模型自主决定检索、查库或作答
//!
//! 会话是一串只增不改的消息；模型每轮要么输出 JSON 工具调用，要么输出
//! 纯文本作为最终回答。步数封顶，超限即请求级失败。

pub mod controller;
pub mod events;
pub mod tools;

pub use controller::{AgentRun, ReActController, MAX_AGENT_STEPS};
pub use events::AgentEvent;
pub use tools::{parse_model_output, AgentToolbox, ModelOutput, ToolCall, ToolInvocation};
