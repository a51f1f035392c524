//! 检索层：语义索引抽象、内存向量索引、上下文拼装

pub mod index;
pub mod retriever;

pub use index::{Document, InMemoryIndex, SemanticIndex};
pub use retriever::{
    format_qa_templates, ContextBundle, ContextRetriever, QaExample, RetrievedContext, SchemaHit,
};
