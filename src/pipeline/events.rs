//! 流水线过程事件：供 CLI 等前端按步展示运行进度

use serde::Serialize;

/// 各阶段完成时推送的事件（可序列化为 JSON）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// 正在检索表结构与问答示例
    Retrieving,
    /// 检索完成：命中的表数量与示例数量
    ContextReady { tables: usize, qa_examples: usize },
    /// 正在生成 SQL（attempt 为已失败次数）
    Generating { attempt: u32 },
    /// 生成完成
    SqlReady { sql: String },
    /// 正在执行 SQL
    Executing,
    /// 执行成功
    RowsReady { count: usize },
    /// 执行失败（将进入判定）
    ExecutionFailed { error: String },
    /// 判定结果：retry / success / give_up
    Decided { outcome: &'static str },
    /// 正在总结答案；enriched 表示提示词是否附带 SQL 与表结构
    Answering { enriched: bool },
    /// 运行结束
    Done,
}
