//! 智能体工具：封闭的调用集合与解析、校验、分发
//!
//! 模型看到的工具签名来自 tool_schema_json（随 system 提示词下发）；
//! 模型输出的 {"tool": ..., "args": {...}}（或其数组）先解析成 ToolCall，
//! 再校验收敛为 ToolInvocation 枚举，之后才分发执行，不存在按名反射调用。

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::{QueryOutcome, SqlGateway};
use crate::retrieval::ContextRetriever;

/// 工具签名：名称、描述（供模型理解）、参数 JSON Schema
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// 全部工具签名（顺序即提示词中的展示顺序）
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "execute_query",
            description: "执行只读 SQL 查询并返回结果。只允许 SELECT / SHOW / DESCRIBE；\
                返回 code（0-成功，-1-失败，-2-不允许更改数据）与 result。",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "要执行的 SQL 语句"
                    }
                },
                "required": ["query"]
            }),
        },
        ToolSpec {
            name: "search_context",
            description: "基于语义相似度检索表结构文档与可参考的问答 SQL 模板。\
                需要理解表结构、字段含义时必须先调用此工具。",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "检索文本（用户的问题或关键词）"
                    },
                    "k": {
                        "type": "integer",
                        "description": "返回的文档数量，默认 5"
                    },
                    "min_score": {
                        "type": "number",
                        "description": "表结构命中的距离上限，默认 2.0（分数越低越相似）"
                    }
                },
                "required": ["query"]
            }),
        },
    ]
}

/// 工具签名的 JSON 描述，嵌入 system 提示词
pub fn tool_schema_json() -> String {
    let tools: Vec<Value> = tool_specs()
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "parameters": t.parameters,
            })
        })
        .collect();
    serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
}

/// 模型输出的工具调用原文（未校验）
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: Value,
}

/// 一轮模型输出的解析结果
#[derive(Debug, Clone)]
pub enum ModelOutput {
    /// 纯文本，即最终回答
    Response(String),
    /// 一个或多个工具调用，按序执行
    ToolCalls(Vec<ToolCall>),
}

/// 解析模型输出：```json 围栏或以 {/[ 开头的内容按工具调用解析，否则视为回答
///
/// JSON 解析失败返回 Err，由控制器注入纠偏提示让模型重来。
pub fn parse_model_output(output: &str) -> Result<ModelOutput, String> {
    let trimmed = output.trim();

    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```")
            .map(|end| rest[..end].trim())
            .unwrap_or_else(|| rest.trim())
    } else if trimmed.starts_with('{') || trimmed.starts_with('[') {
        trimmed
    } else {
        return Ok(ModelOutput::Response(trimmed.to_string()));
    };

    if json_str.starts_with('[') {
        let calls: Vec<ToolCall> = serde_json::from_str(json_str)
            .map_err(|e| format!("{}: {}", e, json_str))?;
        return Ok(ModelOutput::ToolCalls(calls));
    }
    let call: ToolCall =
        serde_json::from_str(json_str).map_err(|e| format!("{}: {}", e, json_str))?;
    if call.tool.is_empty() {
        Ok(ModelOutput::Response(trimmed.to_string()))
    } else {
        Ok(ModelOutput::ToolCalls(vec![call]))
    }
}

#[derive(Debug, Deserialize)]
struct ExecuteQueryArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
struct SearchContextArgs {
    query: String,
    k: Option<usize>,
    min_score: Option<f32>,
}

/// 校验后的工具调用：只可能是这两种操作之一
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    ExecuteQuery {
        query: String,
    },
    SearchContext {
        query: String,
        k: Option<usize>,
        min_score: Option<f32>,
    },
}

impl ToolInvocation {
    /// 把原文调用收敛为封闭枚举；未知工具名或参数不合法都在这里拒绝
    pub fn validate(call: ToolCall) -> Result<Self, String> {
        match call.tool.as_str() {
            "execute_query" => {
                let args: ExecuteQueryArgs = serde_json::from_value(call.args)
                    .map_err(|e| format!("execute_query 参数不合法: {}", e))?;
                Ok(ToolInvocation::ExecuteQuery { query: args.query })
            }
            "search_context" => {
                let args: SearchContextArgs = serde_json::from_value(call.args)
                    .map_err(|e| format!("search_context 参数不合法: {}", e))?;
                Ok(ToolInvocation::SearchContext {
                    query: args.query,
                    k: args.k,
                    min_score: args.min_score,
                })
            }
            other => Err(format!("未知工具: {}", other)),
        }
    }
}

/// 工具执行器：把校验过的调用分发给网关或检索器，结果统一为 JSON 文本
pub struct AgentToolbox {
    gateway: Arc<SqlGateway>,
    retriever: Arc<ContextRetriever>,
}

impl AgentToolbox {
    pub fn new(gateway: Arc<SqlGateway>, retriever: Arc<ContextRetriever>) -> Self {
        Self { gateway, retriever }
    }

    pub async fn dispatch(&self, invocation: ToolInvocation) -> String {
        match invocation {
            ToolInvocation::ExecuteQuery { query } => {
                let outcome = self.gateway.execute(&query).await;
                let result = match &outcome {
                    QueryOutcome::Rows(rows) => {
                        serde_json::to_value(rows).unwrap_or_else(|_| json!([]))
                    }
                    other => Value::String(other.payload_text()),
                };
                json!({ "code": outcome.code(), "result": result }).to_string()
            }
            ToolInvocation::SearchContext {
                query,
                k,
                min_score,
            } => {
                let ctx = self.retriever.search(&query, k, min_score).await;
                serde_json::to_value(&ctx)
                    .unwrap_or_else(|_| json!({ "qa_examples": [], "schema_hits": [] }))
                    .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_final_answer() {
        match parse_model_output("昨日收入为 3200 元。").unwrap() {
            ModelOutput::Response(text) => assert!(text.contains("3200")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn single_json_object_is_tool_call() {
        let out = parse_model_output(r#"{"tool": "execute_query", "args": {"query": "SELECT 1"}}"#)
            .unwrap();
        match out {
            ModelOutput::ToolCalls(calls) => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].tool, "execute_query");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn fenced_array_is_ordered_tool_calls() {
        let out = parse_model_output(
            "先查表结构再查数：\n```json\n[\
             {\"tool\": \"search_context\", \"args\": {\"query\": \"房态\"}},\
             {\"tool\": \"execute_query\", \"args\": {\"query\": \"SELECT 1\"}}]\n```",
        )
        .unwrap();
        match out {
            ModelOutput::ToolCalls(calls) => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].tool, "search_context");
                assert_eq!(calls[1].tool, "execute_query");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn broken_json_is_error() {
        assert!(parse_model_output(r#"{"tool": "execute_query", "args": "#).is_err());
    }

    #[test]
    fn validate_rejects_unknown_tool() {
        let call = ToolCall {
            tool: "drop_database".to_string(),
            args: json!({}),
        };
        let err = ToolInvocation::validate(call).unwrap_err();
        assert!(err.contains("未知工具"));
    }

    #[test]
    fn validate_parses_search_args() {
        let call = ToolCall {
            tool: "search_context".to_string(),
            args: json!({"query": "房态", "k": 3, "min_score": 1.5}),
        };
        assert_eq!(
            ToolInvocation::validate(call).unwrap(),
            ToolInvocation::SearchContext {
                query: "房态".to_string(),
                k: Some(3),
                min_score: Some(1.5),
            }
        );
    }

    #[test]
    fn validate_rejects_missing_query() {
        let call = ToolCall {
            tool: "execute_query".to_string(),
            args: json!({}),
        };
        assert!(ToolInvocation::validate(call).is_err());
    }
}
