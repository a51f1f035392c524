//! SQL 生成：一次 LLM 调用产出一条候选语句
//!
//! 模板参数：当前时间、hotel_id / user_id、表结构上下文、问答模板（可空）、
//! 累积错误历史（可空）。这里不做任何校验，只读策略由网关把关。

use std::sync::Arc;

use crate::llm::{LlmClient, LlmError, Message};
use crate::prompts;
use crate::retrieval::{format_qa_templates, QaExample};

/// SQL 生成器：持有 LLM 与业务主体标识
pub struct SqlGenerator {
    llm: Arc<dyn LlmClient>,
    hotel_id: i64,
    user_id: i64,
}

impl SqlGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, hotel_id: i64, user_id: i64) -> Self {
        Self {
            llm,
            hotel_id,
            user_id,
        }
    }

    /// 生成一条候选 SQL；qa_examples / error_prompt 为空时对应段落整体省略
    pub async fn generate(
        &self,
        question: &str,
        schema_context: &str,
        qa_examples: &[QaExample],
        error_prompt: &str,
    ) -> Result<String, LlmError> {
        let nowdate = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let qa_block = format_qa_templates(qa_examples);
        let error_block = if error_prompt.is_empty() {
            String::new()
        } else {
            format!("之前的尝试出现过以下错误，请避免重犯：\n{}\n", error_prompt)
        };

        let user = prompts::fill(
            prompts::TEXT2SQL_GEN_USER_PROMPT,
            &[
                ("nowdate", nowdate.as_str()),
                ("hotel_id", &self.hotel_id.to_string()),
                ("user_id", &self.user_id.to_string()),
                ("schema", schema_context),
                ("qa_result", qa_block.as_str()),
                ("error_prompt", error_block.as_str()),
                ("question", question),
            ],
        );

        let raw = self
            .llm
            .complete(&[
                Message::system(prompts::TEXT2SQL_GEN_SYSTEM_PROMPT),
                Message::user(user),
            ])
            .await?;
        Ok(strip_sql_fences(&raw))
    }
}

/// 剥掉模型偶尔带上的 Markdown 代码块围栏（各剥一次）
fn strip_sql_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = if let Some(s) = trimmed.strip_prefix("```sql") {
        s
    } else if let Some(s) = trimmed.strip_prefix("```") {
        s
    } else {
        trimmed
    };
    inner.strip_suffix("```").unwrap_or(inner).trim().to_string()
}
