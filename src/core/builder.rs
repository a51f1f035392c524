//! 按配置装配组件：LLM 客户端、只读网关、上下文检索器
//!
//! 所有依赖显式构造、向下传递；测试里用替身直接替换对应 trait 即可。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::AgentError;
use crate::db::{MySqlBackend, SqlGateway};
use crate::llm::{
    create_deepseek_client, EmbeddingProvider, LlmClient, OpenAiClient, OpenAiEmbedder,
    RetryingLlmClient,
};
use crate::retrieval::{ContextRetriever, InMemoryIndex};

/// 组装 LLM 客户端：按 provider 选后端，外层包传输层重试
pub fn build_llm(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let base: Arc<dyn LlmClient> = match cfg.llm.provider.as_str() {
        "openai" => Arc::new(OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.model,
            None,
        )),
        _ => Arc::new(create_deepseek_client(Some(&cfg.llm.model))),
    };
    Arc::new(RetryingLlmClient::new(base, cfg.llm.max_retries))
}

/// 组装只读网关：建 MySQL 连接池并套上白名单校验
pub async fn build_gateway(cfg: &AppConfig) -> Result<Arc<SqlGateway>, AgentError> {
    let url = cfg
        .database
        .url
        .as_deref()
        .ok_or_else(|| AgentError::Config("database.url 未配置".to_string()))?;
    let backend = MySqlBackend::connect(url, cfg.database.max_connections)
        .await
        .map_err(|e| AgentError::Database(e.to_string()))?;
    Ok(Arc::new(SqlGateway::new(Arc::new(backend))))
}

/// 组装上下文检索器：加载两个索引文档文件并逐篇嵌入
pub async fn build_retriever(cfg: &AppConfig) -> Result<Arc<ContextRetriever>, AgentError> {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OpenAiEmbedder::new(
        cfg.retrieval.embedding_base_url.as_deref(),
        &cfg.retrieval.embedding_model,
        None,
    ));
    let qa_index = InMemoryIndex::load_json(&cfg.retrieval.qa_index_path, embedder.clone())
        .await
        .map_err(AgentError::IndexLoad)?;
    let schema_index = InMemoryIndex::load_json(&cfg.retrieval.schema_index_path, embedder)
        .await
        .map_err(AgentError::IndexLoad)?;
    Ok(Arc::new(ContextRetriever::new(
        Arc::new(qa_index),
        Arc::new(schema_index),
        cfg.retrieval.clone(),
    )))
}
