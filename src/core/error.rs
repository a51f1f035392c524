//! 请求级错误类型
//!
//! 只有无法降级成自然语言回答的情况才会走到这里：LLM 传输层彻底失败、
//! ReAct 步数超限、启动期的配置 / 连接 / 索引加载问题。
//! SQL 执行失败与策略拦截不属于错误，由控制器转入答案总结。

use thiserror::Error;

use crate::llm::LlmError;

/// 一次问答请求可能出现的致命错误
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM 调用失败: {0}")]
    Llm(#[from] LlmError),

    /// ReAct 步数达到上限仍未产出最终回答，整个请求作废
    #[error("ReAct 步数达到上限 ({0})，本次请求终止")]
    ToolLoopExhausted(usize),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("数据库连接失败: {0}")]
    Database(String),

    #[error("索引文档加载失败: {0}")]
    IndexLoad(String),
}
