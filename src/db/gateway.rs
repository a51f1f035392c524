//! 只读查询网关
//!
//! 语句首关键字必须命中只读白名单（SELECT / SHOW / DESCRIBE，不区分大小写），
//! 否则直接拦截、不触达后端；命中则执行并统一返回 QueryOutcome。
//! 网关内部绝不重试，重试策略属于控制器。

use std::sync::Arc;
use std::time::Instant;

use crate::db::backend::{QueryBackend, SqlRow};

/// 策略拦截的固定文案（写操作 / DDL 一律视为篡改数据）
pub const POLICY_VIOLATION_REASON: &str = "执行失败: 不允许篡改数据";

/// 只读语句白名单（首关键字，不区分大小写）
const READ_ONLY_KEYWORDS: [&str; 3] = ["SELECT", "SHOW", "DESCRIBE"];

/// 一次语句执行的统一结果
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// 执行成功，行已物化为「列名 -> 值」映射
    Rows(Vec<SqlRow>),
    /// 写/DDL 语句被策略拦截，语句未执行
    PolicyViolation,
    /// 数据库层异常（语法错误、表不存在等）
    ExecutionError(String),
}

impl QueryOutcome {
    /// 与检索工具约定的状态码：0 成功，-1 执行失败，-2 策略拦截
    pub fn code(&self) -> i32 {
        match self {
            QueryOutcome::Rows(_) => 0,
            QueryOutcome::ExecutionError(_) => -1,
            QueryOutcome::PolicyViolation => -2,
        }
    }

    /// 负载文本：成功为行集 JSON，失败为原因文案
    pub fn payload_text(&self) -> String {
        match self {
            QueryOutcome::Rows(rows) => {
                serde_json::to_string(rows).unwrap_or_else(|_| "[]".to_string())
            }
            QueryOutcome::PolicyViolation => POLICY_VIOLATION_REASON.to_string(),
            QueryOutcome::ExecutionError(msg) => msg.clone(),
        }
    }
}

/// 只读网关：持有后端，校验 -> 执行 -> 审计日志
pub struct SqlGateway {
    backend: Arc<dyn QueryBackend>,
}

impl SqlGateway {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self { backend }
    }

    /// 执行一条候选语句；策略拦截时后端不被调用
    pub async fn execute(&self, sql: &str) -> QueryOutcome {
        if !is_read_only(sql) {
            tracing::warn!(sql = %preview(sql), "语句被只读策略拦截");
            return QueryOutcome::PolicyViolation;
        }

        let start = Instant::now();
        let result = self.backend.fetch_rows(sql).await;
        let elapsed = start.elapsed();
        tracing::info!("查询耗时 {:.4}s", elapsed.as_secs_f64());

        let (outcome, rows) = match &result {
            Ok(r) => ("ok", r.len()),
            Err(_) => ("error", 0),
        };
        let audit = serde_json::json!({
            "event": "sql_audit",
            "outcome": outcome,
            "rows": rows,
            "duration_ms": elapsed.as_millis() as u64,
            "sql_preview": preview(sql),
        });
        tracing::info!(audit = %audit.to_string(), "gateway");

        match result {
            Ok(rows) => QueryOutcome::Rows(rows),
            Err(e) => QueryOutcome::ExecutionError(format!("执行失败: {}", e)),
        }
    }
}

/// 取语句首部连续字母作为关键字，与白名单不区分大小写比对
fn is_read_only(sql: &str) -> bool {
    let keyword: String = sql
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    READ_ONLY_KEYWORDS
        .iter()
        .any(|k| keyword.eq_ignore_ascii_case(k))
}

fn preview(sql: &str) -> String {
    let s = sql.trim();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}
