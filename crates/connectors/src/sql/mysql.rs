use crate::{capability::DataSource, error::ConnectorError, profile::AnalyticalProfile};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use model::{core::value::Value, records::record_set::RecordSet};
use mysql_async::{Conn, OptsBuilder, Row, Value as MySqlValue, prelude::Queryable};
use tracing::debug;

const BACKEND: &str = "analytical-source";

/// Analytical source adapter speaking the MySQL wire protocol.
///
/// One connection per operation: opened at call start, disconnected
/// before the call returns, never pooled.
pub struct MySqlSource {
    profile: AnalyticalProfile,
}

impl MySqlSource {
    pub fn new(profile: AnalyticalProfile) -> Self {
        MySqlSource { profile }
    }

    async fn connect(&self) -> Result<Conn, ConnectorError> {
        let opts = OptsBuilder::default()
            .ip_or_hostname(self.profile.host.clone())
            .tcp_port(self.profile.port)
            .user(Some(self.profile.user.clone()))
            .pass(Some(self.profile.password.clone()))
            .db_name(self.profile.database.clone());

        Conn::new(opts).await.map_err(|err| {
            ConnectorError::Connectivity {
                backend: BACKEND,
                detail: err.to_string(),
            }
        })
    }

    /// Runs a side-effecting statement against the source.
    pub async fn execute(&self, statement: &str) -> Result<(), ConnectorError> {
        let mut conn = self.connect().await?;
        let result = conn
            .query_drop(statement)
            .await
            .map_err(|err| ConnectorError::Query {
                backend: BACKEND,
                query: statement.to_string(),
                detail: err.to_string(),
            });
        disconnect(conn).await;
        result
    }
}

#[async_trait]
impl DataSource for MySqlSource {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn read(&self, query: &str) -> Result<RecordSet, ConnectorError> {
        let mut conn = self.connect().await?;
        let result = read_all(&mut conn, query).await;
        disconnect(conn).await;
        result
    }

    async fn validate(&self) -> Result<(), ConnectorError> {
        let conn = self.connect().await?;
        disconnect(conn).await;
        Ok(())
    }
}

async fn read_all(conn: &mut Conn, query: &str) -> Result<RecordSet, ConnectorError> {
    let query_err = |err: mysql_async::Error| ConnectorError::Query {
        backend: BACKEND,
        query: query.to_string(),
        detail: err.to_string(),
    };

    let mut result = conn.query_iter(query).await.map_err(query_err)?;
    let columns: Vec<String> = result
        .columns()
        .map(|cols| cols.iter().map(|c| c.name_str().to_string()).collect())
        .unwrap_or_default();

    let rows: Vec<Row> = result.collect().await.map_err(query_err)?;

    let mut record_set = RecordSet::new(columns);
    for row in rows {
        let values = row.unwrap().into_iter().map(value_from_mysql).collect();
        record_set.push_row(values);
    }
    Ok(record_set)
}

async fn disconnect(conn: Conn) {
    if let Err(err) = conn.disconnect().await {
        debug!(error = %err, "source disconnect failed");
    }
}

fn value_from_mysql(value: MySqlValue) -> Value {
    match value {
        MySqlValue::NULL => Value::Null,
        MySqlValue::Int(v) => Value::Int(v),
        MySqlValue::UInt(v) => Value::Int(v as i64),
        MySqlValue::Float(v) => Value::Float(v as f64),
        MySqlValue::Double(v) => Value::Float(v),
        MySqlValue::Bytes(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        MySqlValue::Date(year, month, day, 0, 0, 0, 0) => {
            match NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32) {
                Some(date) => Value::Date(date),
                None => Value::Null,
            }
        }
        MySqlValue::Date(year, month, day, hour, minute, second, micros) => {
            let timestamp = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
                .and_then(|d| d.and_hms_micro_opt(hour as u32, minute as u32, second as u32, micros));
            match timestamp {
                Some(naive) => Value::Timestamp(Utc.from_utc_datetime(&naive)),
                None => Value::Null,
            }
        }
        MySqlValue::Time(neg, days, hours, minutes, seconds, micros) => {
            let sign = if neg { "-" } else { "" };
            let total_hours = days * 24 + hours as u32;
            Value::String(format!(
                "{sign}{total_hours:02}:{minutes:02}:{seconds:02}.{micros:06}"
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_values_map_to_model_values() {
        assert_eq!(value_from_mysql(MySqlValue::NULL), Value::Null);
        assert_eq!(value_from_mysql(MySqlValue::Int(-3)), Value::Int(-3));
        assert_eq!(value_from_mysql(MySqlValue::UInt(9)), Value::Int(9));
        assert_eq!(
            value_from_mysql(MySqlValue::Bytes(b"abc".to_vec())),
            Value::String("abc".into())
        );
    }

    #[test]
    fn midnight_dates_stay_dates() {
        let value = value_from_mysql(MySqlValue::Date(2024, 5, 10, 0, 0, 0, 0));
        assert_eq!(
            value,
            Value::Date(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap())
        );
    }

    #[test]
    fn datetimes_become_timestamps() {
        let value = value_from_mysql(MySqlValue::Date(2024, 5, 10, 13, 30, 0, 0));
        assert!(matches!(value, Value::Timestamp(_)));
    }
}
