//! ReAct 主循环
//!
//! 模型调用 -> (工具调用 -> 执行 -> 写回观察 -> 再调用) 循环，
//! 模型不再请求工具时其文本即最终回答。步数硬上限 50，
//! 超限是请求级致命错误，直接上抛，绝不截断成残缺回答。

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::core::AgentError;
use crate::llm::{LlmClient, Message};
use crate::prompts;
use crate::react::events::AgentEvent;
use crate::react::tools::{
    parse_model_output, tool_schema_json, AgentToolbox, ModelOutput, ToolInvocation,
};

/// 单次请求的最大模型调用轮数
pub const MAX_AGENT_STEPS: usize = 50;
/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 一次 ReAct 运行的结果：最终回答与完整会话
#[derive(Debug)]
pub struct AgentRun {
    pub answer: String,
    pub transcript: Vec<Message>,
}

/// ReAct 控制器：持有 LLM、工具执行器与业务主体标识
pub struct ReActController {
    llm: Arc<dyn LlmClient>,
    toolbox: AgentToolbox,
    hotel_id: i64,
    user_id: i64,
    event_tx: Option<UnboundedSender<AgentEvent>>,
}

impl ReActController {
    pub fn new(llm: Arc<dyn LlmClient>, toolbox: AgentToolbox, hotel_id: i64, user_id: i64) -> Self {
        Self {
            llm,
            toolbox,
            hotel_id,
            user_id,
            event_tx: None,
        }
    }

    /// 设置事件推送通道
    pub fn with_event_tx(mut self, tx: UnboundedSender<AgentEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    /// 驱动循环直到模型给出最终回答；步数超限返回 ToolLoopExhausted
    pub async fn run(&self, question: &str) -> Result<AgentRun, AgentError> {
        let nowdate = chrono::Local::now().format("%Y-%m-%d").to_string();
        let tools_json = tool_schema_json();
        let system = prompts::fill(
            prompts::AGENT_SYSTEM_PROMPT,
            &[
                ("hotel_id", &self.hotel_id.to_string()),
                ("tools", tools_json.as_str()),
            ],
        );
        let user = prompts::fill(
            prompts::AGENT_USER_PROMPT,
            &[
                ("nowdate", nowdate.as_str()),
                ("hotel_id", &self.hotel_id.to_string()),
                ("user_id", &self.user_id.to_string()),
                ("question", question),
            ],
        );

        let mut conversation = vec![Message::system(system), Message::user(user)];

        for step in 0..MAX_AGENT_STEPS {
            self.emit(AgentEvent::Thinking {
                step,
                max_steps: MAX_AGENT_STEPS,
            });

            let output = self.llm.complete(&conversation).await?;

            match parse_model_output(&output) {
                Ok(ModelOutput::Response(text)) => {
                    self.emit(AgentEvent::ModelText { text: text.clone() });
                    self.emit(AgentEvent::Done);
                    conversation.push(Message::assistant(text.clone()));
                    return Ok(AgentRun {
                        answer: text,
                        transcript: conversation,
                    });
                }
                Ok(ModelOutput::ToolCalls(calls)) => {
                    // 原样写回模型输出，保持会话只增不改
                    conversation.push(Message::assistant(output.clone()));
                    for call in calls {
                        self.emit(AgentEvent::ToolCall {
                            tool: call.tool.clone(),
                            args: call.args.clone(),
                        });
                        let tool_name = call.tool.clone();
                        let observation = match ToolInvocation::validate(call) {
                            Ok(invocation) => self.toolbox.dispatch(invocation).await,
                            Err(reason) => {
                                tracing::warn!(tool = %tool_name, reason = %reason, "工具调用被拒绝");
                                serde_json::json!({ "code": -1, "result": reason }).to_string()
                            }
                        };
                        self.emit(AgentEvent::Observation {
                            tool: tool_name.clone(),
                            preview: preview(&observation),
                        });
                        conversation.push(Message::user(format!(
                            "Observation from {}: {}",
                            tool_name, observation
                        )));
                    }
                }
                Err(reason) => {
                    // JSON 坏了就注入纠偏提示，消耗一步，让模型重来
                    self.emit(AgentEvent::Reprompt {
                        reason: reason.clone(),
                    });
                    conversation.push(Message::assistant(output.clone()));
                    conversation.push(Message::user(format!(
                        "上一轮输出的 JSON 格式错误: {}。调用工具时你必须只输出一个合法的 JSON 对象\
                         （或其数组），格式：{{\"tool\": \"工具名\", \"args\": {{...}}}}；\
                         给出最终回答时则只输出纯文本。",
                        reason
                    )));
                }
            }
        }

        Err(AgentError::ToolLoopExhausted(MAX_AGENT_STEPS))
    }
}

fn preview(observation: &str) -> String {
    if observation.chars().count() > OBSERVATION_PREVIEW_CHARS {
        format!(
            "{}...",
            observation
                .chars()
                .take(OBSERVATION_PREVIEW_CHARS)
                .collect::<String>()
        )
    } else {
        observation.to_string()
    }
}
