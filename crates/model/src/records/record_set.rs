use crate::{core::value::Value, records::batch::InsertBatch};
use serde::{Deserialize, Serialize};

/// An in-memory ordered table: fixed named columns, ordered rows.
/// Produced by one extraction call, consumed by one load call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>) -> Self {
        RecordSet {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        RecordSet { columns, rows }
    }

    /// Appends a row. The row is padded with `Null` or truncated to the
    /// column count so every stored row has the same arity.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Splits the rows into contiguous batches of at most `batch_size`
    /// rows, in order. The final batch may be shorter.
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = InsertBatch<'_>> {
        let batch_size = batch_size.max(1);
        self.rows
            .chunks(batch_size)
            .enumerate()
            .map(|(index, rows)| InsertBatch { index, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_row_pads_to_column_arity() {
        let mut rs = RecordSet::new(vec!["a".into(), "b".into(), "c".into()]);
        rs.push_row(vec![Value::Int(1)]);
        assert_eq!(rs.rows()[0], vec![Value::Int(1), Value::Null, Value::Null]);
    }

    #[test]
    fn empty_record_set_yields_no_batches() {
        let rs = RecordSet::new(vec!["a".into()]);
        assert_eq!(rs.batches(100).count(), 0);
    }
}
