//! 查询后端：一条 SQL 进，一组「列名 -> 值」行出
//!
//! trait 作为测试接缝（网关测试用计数替身断言后端未被触达）；
//! MySqlBackend 基于 sqlx 连接池，连接按语句粒度取用、用完即还。

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row, TypeInfo};

/// 一行查询结果：列名 -> JSON 值
pub type SqlRow = BTreeMap<String, Value>;

/// 查询后端抽象
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// 执行一条语句并物化全部行；数据库异常以消息文本返回
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<SqlRow>, String>;
}

/// MySQL 后端：持有 sqlx 连接池
pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryBackend for MySqlBackend {
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<SqlRow>, String> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.to_string())?;
        Ok(rows.iter().map(row_to_map).collect())
    }
}

fn row_to_map(row: &MySqlRow) -> SqlRow {
    let mut map = SqlRow::new();
    for col in row.columns() {
        let idx = col.ordinal();
        map.insert(
            col.name().to_string(),
            decode_column(row, idx, col.type_info().name()),
        );
    }
    map
}

/// 按 MySQL 类型名解码为 JSON 值；未覆盖的类型回退为字符串
fn decode_column(row: &MySqlRow, idx: usize, type_name: &str) -> Value {
    match type_name {
        "NULL" => Value::Null,
        "BOOLEAN" => match row.try_get::<Option<bool>, _>(idx) {
            Ok(Some(v)) => Value::Bool(v),
            Ok(None) => Value::Null,
            Err(_) => fallback_string(row, idx),
        },
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            match row.try_get::<Option<i64>, _>(idx) {
                Ok(Some(v)) => Value::from(v),
                Ok(None) => Value::Null,
                Err(_) => fallback_string(row, idx),
            }
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => match row.try_get::<Option<u64>, _>(idx) {
            Ok(Some(v)) => Value::from(v),
            Ok(None) => Value::Null,
            Err(_) => fallback_string(row, idx),
        },
        "FLOAT" | "DOUBLE" => match row.try_get::<Option<f64>, _>(idx) {
            Ok(Some(v)) => serde_json::Number::from_f64(v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Ok(None) => Value::Null,
            Err(_) => fallback_string(row, idx),
        },
        // 金额类 DECIMAL 以字符串形式输出，避免精度丢失
        "DECIMAL" => match row.try_get::<Option<rust_decimal::Decimal>, _>(idx) {
            Ok(Some(v)) => Value::String(v.to_string()),
            Ok(None) => Value::Null,
            Err(_) => fallback_string(row, idx),
        },
        "DATE" => match row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
            Ok(Some(v)) => Value::String(v.format("%Y-%m-%d").to_string()),
            Ok(None) => Value::Null,
            Err(_) => fallback_string(row, idx),
        },
        "DATETIME" => match row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
            Ok(Some(v)) => Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string()),
            Ok(None) => Value::Null,
            Err(_) => fallback_string(row, idx),
        },
        "TIMESTAMP" => match row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
            Ok(Some(v)) => Value::String(v.format("%Y-%m-%d %H:%M:%S").to_string()),
            Ok(None) => Value::Null,
            Err(_) => fallback_string(row, idx),
        },
        "TIME" => match row.try_get::<Option<chrono::NaiveTime>, _>(idx) {
            Ok(Some(v)) => Value::String(v.format("%H:%M:%S").to_string()),
            Ok(None) => Value::Null,
            Err(_) => fallback_string(row, idx),
        },
        _ => fallback_string(row, idx),
    }
}

fn fallback_string(row: &MySqlRow, idx: usize) -> Value {
    match row.try_get::<Option<String>, _>(idx) {
        Ok(Some(v)) => Value::String(v),
        _ => Value::Null,
    }
}
