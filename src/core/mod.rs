//! 核心层：错误类型与按配置装配组件

pub mod builder;
pub mod error;

pub use builder::{build_gateway, build_llm, build_retriever};
pub use error::AgentError;
