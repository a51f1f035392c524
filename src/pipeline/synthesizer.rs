//! 答案总结：把执行结果（或失败现场）整理成自然语言
//!
//! 结果非空且重试预算未耗尽时，提示词附带所用 SQL 与表结构，便于模型解释来龙去脉；
//! 否则只给问题与现有结果（可能是错误描述或空集），退化为尽力解释。

use std::sync::Arc;

use crate::llm::{LlmClient, LlmError, Message};
use crate::pipeline::controller::MAX_SQL_RETRIES;
use crate::pipeline::state::ConversationState;
use crate::prompts;

/// 答案总结器：持有 LLM，一次调用产出最终回答
pub struct AnswerSynthesizer {
    llm: Arc<dyn LlmClient>,
}

impl AnswerSynthesizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// 是否附带 SQL 与表结构
    pub fn enriched(state: &ConversationState) -> bool {
        state.has_rows() && state.retry_times < MAX_SQL_RETRIES
    }

    /// 产出最终回答；输入为空也不报错，交给模型如实说明
    pub async fn summarize(&self, state: &ConversationState) -> Result<String, LlmError> {
        let mut system = prompts::TEXT2SQL_SUMMARY_SYSTEM_PROMPT.to_string();
        if Self::enriched(state) {
            system.push_str(&format!(
                "\n查询使用的sql：{}\n数据库表结构：\n{}",
                state.sql_query, state.schema_context
            ));
        }

        let result_text = match &state.sql_result {
            Some(rows) => serde_json::to_string(rows).unwrap_or_else(|_| "[]".to_string()),
            None => state.error.clone().unwrap_or_default(),
        };

        let user = prompts::fill(
            prompts::TEXT2SQL_SUMMARY_USER_PROMPT,
            &[
                ("question", state.question.as_str()),
                ("result", result_text.as_str()),
            ],
        );

        self.llm
            .complete(&[Message::system(system), Message::user(user)])
            .await
    }
}
