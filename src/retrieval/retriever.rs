//! 上下文检索：两个语义索引 -> 生成所需的上下文包
//!
//! qa_sql 索引存问答示例（问题 -> SQL 模板），table_structure 索引存表结构文档。
//! 流水线路径：表结构取 top-k 不过滤，问答示例按距离 <= qa_max_score 过滤；
//! ReAct 工具路径：表结构按调用方给的距离上限过滤（缺省用配置值）。
//! 零命中不报错，返回空上下文。

use std::sync::Arc;

use serde::Serialize;

use crate::config::RetrievalSection;
use crate::retrieval::index::{Document, SemanticIndex};

/// 问答示例：自然语言问题 + 对应 SQL 模板
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QaExample {
    pub description: String,
    pub answer: String,
}

/// 流水线使用的上下文包
#[derive(Debug, Clone, Default)]
pub struct ContextBundle {
    pub schema_context: String,
    pub qa_examples: Vec<QaExample>,
}

/// ReAct 检索工具返回的表结构命中
#[derive(Debug, Clone, Serialize)]
pub struct SchemaHit {
    pub table_name: String,
    pub description: String,
    pub table_structure: String,
    pub score: f32,
}

/// ReAct 检索工具的完整返回
#[derive(Debug, Clone, Serialize, Default)]
pub struct RetrievedContext {
    pub qa_examples: Vec<QaExample>,
    pub schema_hits: Vec<SchemaHit>,
}

/// 将问答示例格式化为可复用的 问题-sql 模板段落；空列表返回空串
pub fn format_qa_templates(examples: &[QaExample]) -> String {
    if examples.is_empty() {
        return String::new();
    }
    let mut block =
        String::from("可参考的 问题-sql 模板，将大括号（{xxx}）中的内容替换为相应数据即可使用：\n");
    for qa in examples {
        block.push_str(&format!(
            "- 问题：{}，sql示例：{}\n",
            qa.description, qa.answer
        ));
    }
    block
}

/// 上下文检索器：组合两个索引，不持有其它状态
pub struct ContextRetriever {
    qa_index: Arc<dyn SemanticIndex>,
    schema_index: Arc<dyn SemanticIndex>,
    cfg: RetrievalSection,
}

impl ContextRetriever {
    pub fn new(
        qa_index: Arc<dyn SemanticIndex>,
        schema_index: Arc<dyn SemanticIndex>,
        cfg: RetrievalSection,
    ) -> Self {
        Self {
            qa_index,
            schema_index,
            cfg,
        }
    }

    /// 流水线路径：表结构 top-k 全收，问答示例按距离过滤
    pub async fn retrieve(&self, question: &str) -> ContextBundle {
        let qa_examples = self
            .search_qa(question, self.cfg.qa_k)
            .await
            .into_iter()
            .map(|(qa, _)| qa)
            .collect();

        let schema_hits = self.search_index(&self.schema_index, question, self.cfg.schema_k).await;
        let mut schema_context = String::new();
        for (doc, _) in &schema_hits {
            let entry = schema_entry(doc);
            tracing::info!(table = %entry.table_name, "检索到表结构");
            schema_context.push_str(&format!(
                "表名：{}\n表描述：{}\n表结构：{}\n\n",
                entry.table_name, entry.description, entry.table_structure
            ));
        }

        ContextBundle {
            schema_context,
            qa_examples,
        }
    }

    /// ReAct 工具路径：两个索引各查 k 条，表结构按 min_score 过滤
    pub async fn search(
        &self,
        query: &str,
        k: Option<usize>,
        min_score: Option<f32>,
    ) -> RetrievedContext {
        let k = k.unwrap_or(self.cfg.qa_k);
        let min_score = min_score.unwrap_or(self.cfg.schema_max_score);

        let qa_examples = self
            .search_qa(query, k)
            .await
            .into_iter()
            .map(|(qa, _)| qa)
            .collect();

        let schema_hits = self
            .search_index(&self.schema_index, query, k)
            .await
            .into_iter()
            .filter(|(_, score)| *score <= min_score)
            .map(|(doc, score)| {
                let mut hit = schema_entry(&doc);
                hit.score = score;
                tracing::info!(table = %hit.table_name, score, "检索到表结构");
                hit
            })
            .collect();

        RetrievedContext {
            qa_examples,
            schema_hits,
        }
    }

    /// 问答示例检索：统一按 qa_max_score 过滤（仅保留足够相近的模板）
    async fn search_qa(&self, query: &str, k: usize) -> Vec<(QaExample, f32)> {
        self.search_index(&self.qa_index, query, k)
            .await
            .into_iter()
            .filter(|(_, score)| *score <= self.cfg.qa_max_score)
            .map(|(doc, score)| {
                (
                    QaExample {
                        description: doc.body.clone(),
                        answer: doc.metadata.get("a").cloned().unwrap_or_default(),
                    },
                    score,
                )
            })
            .collect()
    }

    /// 索引查询失败按空命中处理，只留日志
    async fn search_index(
        &self,
        index: &Arc<dyn SemanticIndex>,
        query: &str,
        k: usize,
    ) -> Vec<(Document, f32)> {
        match index.search(query, k).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "索引检索失败，按零命中处理");
                Vec::new()
            }
        }
    }
}

fn schema_entry(doc: &Document) -> SchemaHit {
    SchemaHit {
        table_name: doc.metadata.get("table_name").cloned().unwrap_or_default(),
        description: doc.body.clone(),
        table_structure: doc
            .metadata
            .get("table_structure")
            .cloned()
            .unwrap_or_default(),
        score: 0.0,
    }
}
