//! 流水线状态：一次问答请求的全部可变记录
//!
//! 每个问题各建一份，回答返回后即丢弃；字段的读写时机见各阶段实现。
//! retry_times 只增不减；error_prompt 只追加不截断。

use crate::db::SqlRow;
use crate::retrieval::QaExample;

/// 流水线各阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Retrieve,
    Generate,
    Execute,
    Decide,
    Answer,
    Done,
}

/// 判定结果：执行完一条 SQL 后去哪
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// 执行成功，去总结答案
    Success,
    /// 可修复的执行失败，回到生成阶段重写 SQL
    Retry,
    /// 策略拦截或重试预算耗尽，带着现场去总结答案
    GiveUp,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Success => "success",
            Decision::Retry => "retry",
            Decision::GiveUp => "give_up",
        }
    }
}

/// 一次流水线运行的状态记录
#[derive(Debug, Default)]
pub struct ConversationState {
    /// 用户问题，进入后不再改动
    pub question: String,
    /// 检索拼装的表结构上下文，每次检索整体覆盖
    pub schema_context: String,
    /// 命中的问答示例，运行期间只追加
    pub qa_examples: Vec<QaExample>,
    /// 最近一条候选 SQL，每次生成覆盖
    pub sql_query: String,
    /// 最近一次成功执行的行集；有错误挂起时为 None
    pub sql_result: Option<Vec<SqlRow>>,
    /// 最近一次执行失败的消息；被下一次生成消费后清空
    pub error: Option<String>,
    /// 执行失败计数；在判定阶段递增，策略拦截不计
    pub retry_times: u32,
    /// 历次失败的累积文本，原样进入下一次生成提示词
    pub error_prompt: String,
    /// 最终回答，由总结阶段一次性写入
    pub answer: String,
}

impl ConversationState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// 成功行集非空（总结阶段据此决定是否附带 SQL 与表结构）
    pub fn has_rows(&self) -> bool {
        self.sql_result.as_ref().is_some_and(|rows| !rows.is_empty())
    }
}
