//! ReAct 过程事件：供 CLI 展示思考、工具调用与观察结果

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// 开始新一轮模型调用
    Thinking { step: usize, max_steps: usize },
    /// 模型输出的文本（最终回答或调用前的说明）
    ModelText { text: String },
    /// 模型请求调用工具
    ToolCall { tool: String, args: serde_json::Value },
    /// 工具返回（预览，避免刷屏）
    Observation { tool: String, preview: String },
    /// 注入纠偏提示（模型输出的 JSON 无法解析）
    Reprompt { reason: String },
    /// 最终回答完成
    Done,
}
