// MySQL executor using one connection pool per backend URI
use crate::api::middleware::AppError;
use crate::models::BackendColumn;
use crate::services::connection_pool::ConnectionPoolManager;
use crate::services::database::adapter::{BackendResult, QueryExecutor};
use mysql_async::consts::ColumnType;
use mysql_async::{prelude::*, Column, Conn, Row, Value as MySqlValue};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

pub struct MySqlExecutor {
    pools: Arc<ConnectionPoolManager>,
}

impl MySqlExecutor {
    pub fn new(pools: Arc<ConnectionPoolManager>) -> Self {
        Self { pools }
    }

    async fn get_conn(&self, database_uri: &Url) -> Result<Conn, AppError> {
        let pool = self.pools.get_or_create_pool(database_uri).await?;
        pool.get_conn().await.map_err(|e| {
            AppError::Connection(format!("Failed to get MySQL connection from pool: {}", e))
        })
    }

    fn describe(columns: &[Column]) -> Vec<BackendColumn> {
        columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let table_name = if column.org_table_ref().is_empty() {
                    column.table_str()
                } else {
                    column.org_table_str()
                };
                BackendColumn {
                    ordinal: index + 1,
                    name: column.name_str().into_owned(),
                    jdbc_type: column.column_type() as i32,
                    table_name: table_name.into_owned(),
                }
            })
            .collect()
    }

    fn row_values(row: &Row, columns: &[Column]) -> Vec<Value> {
        columns
            .iter()
            .enumerate()
            .map(|(idx, column)| match row.get_opt::<MySqlValue, usize>(idx) {
                Some(Ok(value)) => Self::mysql_value_to_json(value, column.column_type()),
                Some(Err(_)) | None => Value::Null,
            })
            .collect()
    }

    /// Convert a MySQL value to JSON. The text protocol reports every value
    /// as bytes, so numeric columns are parsed back using the column type.
    fn mysql_value_to_json(value: MySqlValue, column_type: ColumnType) -> Value {
        match value {
            MySqlValue::NULL => Value::Null,
            MySqlValue::Bytes(bytes) => {
                let text = match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => return Value::Null,
                };
                if Self::is_integer(column_type) {
                    if let Ok(i) = text.parse::<i64>() {
                        return json!(i);
                    }
                    if let Ok(u) = text.parse::<u64>() {
                        return json!(u);
                    }
                } else if Self::is_floating(column_type) {
                    if let Ok(f) = text.parse::<f64>() {
                        return json!(f);
                    }
                }
                json!(text)
            }
            MySqlValue::Int(i) => json!(i),
            MySqlValue::UInt(u) => json!(u),
            MySqlValue::Float(f) => json!(f),
            MySqlValue::Double(d) => json!(d),
            MySqlValue::Date(y, m, d, h, min, s, _) => {
                json!(format!("{:04}-{:02}-{:02} {:02}:{:02}:{:02}", y, m, d, h, min, s))
            }
            MySqlValue::Time(is_neg, d, h, m, s, _) => {
                let sign = if is_neg { "-" } else { "" };
                let total_hours = d * 24 + h as u32;
                json!(format!("{}{}:{:02}:{:02}", sign, total_hours, m, s))
            }
        }
    }

    fn is_integer(column_type: ColumnType) -> bool {
        matches!(
            column_type,
            ColumnType::MYSQL_TYPE_TINY
                | ColumnType::MYSQL_TYPE_SHORT
                | ColumnType::MYSQL_TYPE_INT24
                | ColumnType::MYSQL_TYPE_LONG
                | ColumnType::MYSQL_TYPE_LONGLONG
                | ColumnType::MYSQL_TYPE_YEAR
        )
    }

    fn is_floating(column_type: ColumnType) -> bool {
        matches!(
            column_type,
            ColumnType::MYSQL_TYPE_FLOAT
                | ColumnType::MYSQL_TYPE_DOUBLE
                | ColumnType::MYSQL_TYPE_DECIMAL
                | ColumnType::MYSQL_TYPE_NEWDECIMAL
        )
    }
}

#[async_trait::async_trait]
impl QueryExecutor for MySqlExecutor {
    async fn execute(&self, database_uri: &Url, sql: &str) -> Result<BackendResult, AppError> {
        let mut conn = self.get_conn(database_uri).await?;
        let start_time = Instant::now();

        let mut result = conn.query_iter(sql).await?;
        let columns = result.columns();
        let rows: Vec<Row> = result.collect().await?;
        result.drop_result().await?;

        let columns = columns.as_deref().unwrap_or_default();
        let rows = rows.iter().map(|row| Self::row_values(row, columns)).collect::<Vec<_>>();

        tracing::debug!(
            "Backend {} returned {} rows in {}ms",
            ConnectionPoolManager::mask_credentials(database_uri.as_str()),
            rows.len(),
            start_time.elapsed().as_millis()
        );

        Ok(BackendResult {
            columns: Self::describe(columns),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_values_follow_column_type() {
        let bytes = |s: &str| MySqlValue::Bytes(s.as_bytes().to_vec());
        assert_eq!(
            MySqlExecutor::mysql_value_to_json(bytes("42"), ColumnType::MYSQL_TYPE_LONGLONG),
            json!(42)
        );
        assert_eq!(
            MySqlExecutor::mysql_value_to_json(bytes("18446744073709551615"), ColumnType::MYSQL_TYPE_LONGLONG),
            json!(u64::MAX)
        );
        assert_eq!(
            MySqlExecutor::mysql_value_to_json(bytes("1.5"), ColumnType::MYSQL_TYPE_DOUBLE),
            json!(1.5)
        );
        assert_eq!(
            MySqlExecutor::mysql_value_to_json(bytes("42"), ColumnType::MYSQL_TYPE_VAR_STRING),
            json!("42")
        );
        assert_eq!(
            MySqlExecutor::mysql_value_to_json(MySqlValue::NULL, ColumnType::MYSQL_TYPE_LONG),
            Value::Null
        );
    }

    #[test]
    fn test_binary_values() {
        assert_eq!(
            MySqlExecutor::mysql_value_to_json(MySqlValue::Int(-3), ColumnType::MYSQL_TYPE_LONG),
            json!(-3)
        );
        assert_eq!(
            MySqlExecutor::mysql_value_to_json(
                MySqlValue::Date(2024, 1, 2, 3, 4, 5, 0),
                ColumnType::MYSQL_TYPE_DATETIME
            ),
            json!("2024-01-02 03:04:05")
        );
        assert_eq!(
            MySqlExecutor::mysql_value_to_json(
                MySqlValue::Bytes(vec![0xff, 0xfe]),
                ColumnType::MYSQL_TYPE_BLOB
            ),
            Value::Null
        );
    }
}
