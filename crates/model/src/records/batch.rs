use crate::core::value::Value;

/// A contiguous slice of a record set loaded and committed as one unit.
/// Concatenating all batches in index order reproduces the source rows
/// exactly.
#[derive(Debug, Clone, Copy)]
pub struct InsertBatch<'a> {
    pub index: usize,
    pub rows: &'a [Vec<Value>],
}

impl InsertBatch<'_> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
