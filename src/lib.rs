//! Innsight - 酒店管理数据问答智能体
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与组件装配
//! - **db**: 只读查询网关（语句白名单 + MySQL 执行）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）与嵌入
//! - **pipeline**: 固定四阶段流水线（检索 -> 生成 -> 执行 -> 总结），带有限次自我修正
//! - **react**: ReAct 智能体循环（模型自主决定检索 / 查库 / 作答）
//! - **retrieval**: 语义索引检索与上下文拼装

pub mod config;
pub mod core;
pub mod db;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod react;
pub mod retrieval;
