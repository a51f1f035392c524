//! 语义索引抽象与内存实现
//!
//! 索引内容的生产与维护在本系统之外；这里只消费：search(query, k)
//! 返回按分数升序的 (文档, 距离) 序列，分数越低越相似。
//! InMemoryIndex 从 JSON 文档文件加载并用嵌入向量做余弦距离排序。

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::llm::EmbeddingProvider;

/// 索引文档：正文 + 命名属性
///
/// 表结构文档：body 为表描述，metadata 携带 table_name / table_structure；
/// 问答示例文档：body 为问题，metadata 携带 a（对应 SQL）。
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub body: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// 语义索引：按嵌入空间相似度排序的文档集合
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    /// 返回至多 k 条 (文档, 距离)，按距离升序（越小越相似）
    async fn search(&self, query: &str, k: usize) -> Result<Vec<(Document, f32)>, String>;
}

/// 内存向量索引：加载期逐篇嵌入，查询期余弦距离排序
pub struct InMemoryIndex {
    entries: Vec<(Document, Vec<f32>)>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl InMemoryIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            entries: Vec::new(),
            embedder,
        }
    }

    /// 添加文档（对 body 做一次嵌入）
    pub async fn add_document(&mut self, doc: Document) -> Result<(), String> {
        let embedding = self.embedder.embed(&doc.body).await?;
        if embedding.is_empty() {
            return Err("Empty embedding".to_string());
        }
        self.entries.push((doc, embedding));
        Ok(())
    }

    /// 从 JSON 文件加载文档数组：[{"body": "...", "metadata": {...}}, ...]
    pub async fn load_json(
        path: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, String> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("读取 {} 失败: {}", path.display(), e))?;
        let docs: Vec<Document> = serde_json::from_str(&raw)
            .map_err(|e| format!("解析 {} 失败: {}", path.display(), e))?;

        let mut index = Self::new(embedder);
        for doc in docs {
            index.add_document(doc).await?;
        }
        tracing::info!(path = %path.display(), docs = index.len(), "语义索引加载完成");
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SemanticIndex for InMemoryIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<(Document, f32)>, String> {
        let query_embedding = self.embedder.embed(query).await?;
        if query_embedding.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, &Document)> = self
            .entries
            .iter()
            .map(|(doc, emb)| (cosine_distance(&query_embedding, emb), doc))
            .collect();

        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, doc)| (doc.clone(), score))
            .collect())
    }
}

/// 余弦距离 = 1 - 余弦相似度；向量异常时取最大距离
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 2.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        2.0
    } else {
        1.0 - dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AxisEmbedder;

    /// "x" -> x 轴，"y" -> y 轴，其余 -> 对角线
    #[async_trait]
    impl EmbeddingProvider for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, String> {
            Ok(match text {
                t if t.contains('x') => vec![1.0, 0.0],
                t if t.contains('y') => vec![0.0, 1.0],
                _ => vec![1.0, 1.0],
            })
        }
    }

    fn doc(body: &str) -> Document {
        Document {
            body: body.to_string(),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn search_orders_by_ascending_distance() {
        let mut index = InMemoryIndex::new(Arc::new(AxisEmbedder));
        index.add_document(doc("x doc")).await.unwrap();
        index.add_document(doc("y doc")).await.unwrap();

        let hits = index.search("x query", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0.body, "x doc");
        assert!(hits[0].1 < hits[1].1);
        assert!(hits[0].1.abs() < 1e-6);
    }

    #[test]
    fn cosine_distance_identical_is_zero() {
        let a = vec![1.0, 0.0, 0.0];
        assert!(cosine_distance(&a, &a).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_distance(&a, &c) - 1.0).abs() < 0.001);
    }
}
