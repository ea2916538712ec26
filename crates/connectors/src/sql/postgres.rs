use crate::{
    capability::{DataSink, DataSource},
    error::ConnectorError,
    profile::RelationalProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use model::{
    core::value::Value,
    records::{batch::InsertBatch, record_set::RecordSet},
};
use tokio_postgres::{Client, NoTls, Row, types::ToSql};
use tracing::{debug, warn};

const BACKEND: &str = "relational-target";

/// Largest number of bind parameters per statement on the Postgres
/// wire protocol.
const MAX_PARAMS_PER_STATEMENT: usize = u16::MAX as usize;

/// Relational target adapter over tokio-postgres.
///
/// Read, execute and insert each open their own connection and release
/// it before returning. A batch insert runs inside one explicit
/// transaction so the batch commits (or fails) as a unit even when it
/// spans several statements.
pub struct PostgresTarget {
    profile: RelationalProfile,
}

impl PostgresTarget {
    /// Fails fast when the profile names a driver this adapter does not
    /// speak.
    pub fn new(profile: RelationalProfile) -> Result<Self, ConnectorError> {
        match profile.driver.to_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" => Ok(PostgresTarget { profile }),
            other => Err(ConnectorError::Config(format!(
                "unsupported target driver '{other}'"
            ))),
        }
    }

    async fn connect(&self) -> Result<Client, ConnectorError> {
        let (client, connection) = tokio_postgres::connect(&self.profile.conn_string(), NoTls)
            .await
            .map_err(|err| ConnectorError::Connectivity {
                backend: BACKEND,
                detail: err.to_string(),
            })?;

        // The connection object drives the socket; it resolves once the
        // client is dropped at the end of the operation.
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                debug!(error = %err, "target connection closed with error");
            }
        });

        Ok(client)
    }
}

#[async_trait]
impl DataSource for PostgresTarget {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn read(&self, query: &str) -> Result<RecordSet, ConnectorError> {
        let client = self.connect().await?;
        let query_err = |err: tokio_postgres::Error| ConnectorError::Query {
            backend: BACKEND,
            query: query.to_string(),
            detail: err.to_string(),
        };

        let stmt = client.prepare(query).await.map_err(query_err)?;
        let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();
        let rows = client.query(&stmt, &[]).await.map_err(query_err)?;

        Ok(record_set_from_rows(columns, &rows))
    }

    async fn validate(&self) -> Result<(), ConnectorError> {
        self.connect().await.map(|_| ())
    }
}

#[async_trait]
impl DataSink for PostgresTarget {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn execute(&self, statement: &str) -> Result<Option<RecordSet>, ConnectorError> {
        let client = self.connect().await?;
        let query_err = |err: tokio_postgres::Error| ConnectorError::Query {
            backend: BACKEND,
            query: statement.to_string(),
            detail: err.to_string(),
        };

        let stmt = client.prepare(statement).await.map_err(query_err)?;
        if stmt.columns().is_empty() {
            client.execute(&stmt, &[]).await.map_err(query_err)?;
            return Ok(None);
        }

        let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();
        let rows = client.query(&stmt, &[]).await.map_err(query_err)?;
        Ok(Some(record_set_from_rows(columns, &rows)))
    }

    async fn insert(
        &self,
        batch: &InsertBatch<'_>,
        columns: &[String],
        table: &str,
    ) -> Result<(), ConnectorError> {
        if batch.is_empty() || columns.is_empty() {
            return Ok(());
        }

        let load_err = |err: tokio_postgres::Error| ConnectorError::Load {
            backend: BACKEND,
            table: table.to_string(),
            detail: err.to_string(),
        };

        // Values go over the wire as their text rendering; Null binds
        // as SQL NULL, never as a "None" literal.
        let text_rows: Vec<Vec<Option<String>>> = batch
            .rows
            .iter()
            .map(|row| row.iter().map(|value| value.to_text()).collect())
            .collect();

        let rows_per_statement = (MAX_PARAMS_PER_STATEMENT / columns.len()).max(1);

        let mut client = self.connect().await?;
        let tx = client.transaction().await.map_err(load_err)?;

        for chunk in text_rows.chunks(rows_per_statement) {
            let sql = multi_row_insert_sql(table, columns, chunk.len());
            let params: Vec<&(dyn ToSql + Sync)> = chunk
                .iter()
                .flatten()
                .map(|value| value as &(dyn ToSql + Sync))
                .collect();
            tx.execute(sql.as_str(), &params).await.map_err(load_err)?;
        }

        tx.commit().await.map_err(load_err)
    }
}

/// Renders `INSERT INTO t ("a", "b") VALUES ($1, $2), ($3, $4), ...`.
/// The table name is passed through as a plain identifier; column names
/// are quoted; values are always bind parameters.
fn multi_row_insert_sql(table: &str, columns: &[String], row_count: usize) -> String {
    let quoted: Vec<String> = columns
        .iter()
        .map(|c| format!("\"{}\"", c.replace('"', "\"\"")))
        .collect();

    let mut sql = format!("INSERT INTO {table} ({}) VALUES ", quoted.join(", "));
    let mut param = 1;
    for row in 0..row_count {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for col in 0..columns.len() {
            if col > 0 {
                sql.push_str(", ");
            }
            sql.push('$');
            sql.push_str(&param.to_string());
            param += 1;
        }
        sql.push(')');
    }
    sql
}

fn record_set_from_rows(columns: Vec<String>, rows: &[Row]) -> RecordSet {
    let mut record_set = RecordSet::new(columns);
    for row in rows {
        let values = (0..row.len()).map(|idx| value_from_pg(row, idx)).collect();
        record_set.push_row(values);
    }
    record_set
}

fn value_from_pg(row: &Row, idx: usize) -> Value {
    let ty = row.columns()[idx].type_();
    match ty.name() {
        "int2" => opt(row
            .try_get::<_, Option<i16>>(idx)
            .map(|v| v.map(|v| Value::Int(v as i64)))),
        "int4" => opt(row
            .try_get::<_, Option<i32>>(idx)
            .map(|v| v.map(|v| Value::Int(v as i64)))),
        "int8" => opt(row.try_get::<_, Option<i64>>(idx).map(|v| v.map(Value::Int))),
        "float4" => opt(row
            .try_get::<_, Option<f32>>(idx)
            .map(|v| v.map(|v| Value::Float(v as f64)))),
        "float8" => opt(row
            .try_get::<_, Option<f64>>(idx)
            .map(|v| v.map(Value::Float))),
        "bool" => opt(row
            .try_get::<_, Option<bool>>(idx)
            .map(|v| v.map(Value::Boolean))),
        "date" => opt(row
            .try_get::<_, Option<NaiveDate>>(idx)
            .map(|v| v.map(Value::Date))),
        "timestamp" => opt(row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .map(|v| v.map(|naive| Value::Timestamp(Utc.from_utc_datetime(&naive))))),
        "timestamptz" => opt(row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .map(|v| v.map(Value::Timestamp))),
        "json" | "jsonb" => opt(row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .map(|v| v.map(Value::Json))),
        name => match row.try_get::<_, Option<String>>(idx) {
            Ok(value) => value.map(Value::String).unwrap_or(Value::Null),
            Err(err) => {
                warn!(column = idx, ty = name, error = %err, "unreadable column, storing NULL");
                Value::Null
            }
        },
    }
}

fn opt(result: Result<Option<Value>, tokio_postgres::Error>) -> Value {
    match result {
        Ok(Some(value)) => value,
        Ok(None) => Value::Null,
        Err(err) => {
            warn!(error = %err, "column decode failed, storing NULL");
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_sql_numbers_parameters_row_major() {
        let sql = multi_row_insert_sql("stage", &["a".into(), "b".into()], 2);
        assert_eq!(
            sql,
            "INSERT INTO stage (\"a\", \"b\") VALUES ($1, $2), ($3, $4)"
        );
    }

    #[test]
    fn insert_sql_escapes_quotes_in_column_names() {
        let sql = multi_row_insert_sql("t", &["we\"ird".into()], 1);
        assert_eq!(sql, "INSERT INTO t (\"we\"\"ird\") VALUES ($1)");
    }

    #[test]
    fn unsupported_driver_is_a_config_error() {
        let profile = RelationalProfile {
            host: "h".into(),
            user: "u".into(),
            password: "p".into(),
            driver: "oracle".into(),
            database: "d".into(),
        };
        assert!(matches!(
            PostgresTarget::new(profile),
            Err(ConnectorError::Config(_))
        ));
    }
}
