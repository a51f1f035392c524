//! 流水线模式：检索 -> 生成 -> 执行 -> 判定 -> 总结
//!
//! 有限次自我修正（最多 3 次失败），策略拦截一票否决；
//! 无论成败，最终都产出一条自然语言回答。

pub mod controller;
pub mod events;
pub mod generator;
pub mod state;
pub mod synthesizer;

pub use controller::{PipelineController, MAX_SQL_RETRIES};
pub use events::PipelineEvent;
pub use generator::SqlGenerator;
pub use state::{ConversationState, Decision, PipelineStep};
pub use synthesizer::AnswerSynthesizer;
