use model::{core::value::Value, records::record_set::RecordSet};

/// Casts every value to its text representation; missing values stay
/// the null sentinel. Pure and backend-independent: row count and
/// column order are preserved exactly.
pub fn normalize(record_set: &RecordSet) -> RecordSet {
    let rows = record_set
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|value| match value.to_text() {
                    Some(text) => Value::String(text),
                    None => Value::Null,
                })
                .collect()
        })
        .collect();

    RecordSet::with_rows(record_set.columns().to_vec(), rows)
}
