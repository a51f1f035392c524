//! 数据库层：查询后端抽象与只读网关（唯一允许触库的组件）

pub mod backend;
pub mod gateway;

pub use backend::{MySqlBackend, QueryBackend, SqlRow};
pub use gateway::{QueryOutcome, SqlGateway, POLICY_VIOLATION_REASON};
