use crate::{capability::DataSource, error::ConnectorError, profile::SheetProfile};
use async_trait::async_trait;
use csv::ReaderBuilder;
use model::{core::value::Value, records::record_set::RecordSet};

const BACKEND: &str = "spreadsheet";

/// Header/first-row similarity above this ratio fails validation: it
/// usually means the configured header row actually points at data.
const MAX_HEADER_SIMILARITY: u32 = 70;

/// Spreadsheet extract over a delimited text file.
///
/// Mirrors the spreadsheet parse surface: a header-row index (rows
/// above it are skipped), an optional column-range selector, and every
/// value read as text. Empty cells are missing values.
pub struct SheetSource {
    profile: SheetProfile,
}

impl SheetSource {
    pub fn new(profile: SheetProfile) -> Self {
        SheetSource { profile }
    }

    fn read_file(&self) -> Result<RecordSet, ConnectorError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.profile.delimiter)
            .from_path(&self.profile.path)
            .map_err(|err| ConnectorError::Connectivity {
                backend: BACKEND,
                detail: format!("{}: {err}", self.profile.path.display()),
            })?;

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| ConnectorError::Fetch {
                backend: BACKEND,
                context: self.profile.path.display().to_string(),
                detail: err.to_string(),
            })?;
            records.push(record);
        }

        if records.len() <= self.profile.header_row {
            return Err(ConnectorError::Validation(format!(
                "header row {} is past the end of '{}'",
                self.profile.header_row,
                self.profile.path.display()
            )));
        }

        let header = &records[self.profile.header_row];
        let keep = |idx: usize| match &self.profile.columns {
            Some(range) => range.contains(idx),
            None => true,
        };

        let columns: Vec<String> = header
            .iter()
            .enumerate()
            .filter(|(idx, _)| keep(*idx))
            .map(|(_, name)| name.trim().to_string())
            .collect();

        let mut record_set = RecordSet::new(columns);
        for record in &records[self.profile.header_row + 1..] {
            let row: Vec<Value> = (0..header.len())
                .filter(|idx| keep(*idx))
                .map(|idx| match record.get(idx) {
                    Some(cell) if !cell.trim().is_empty() => Value::String(cell.to_string()),
                    _ => Value::Null,
                })
                .collect();
            record_set.push_row(row);
        }
        Ok(record_set)
    }
}

#[async_trait]
impl DataSource for SheetSource {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn read(&self, _query: &str) -> Result<RecordSet, ConnectorError> {
        let record_set = self.read_file()?;
        validate_content(&record_set)?;
        Ok(record_set)
    }

    async fn validate(&self) -> Result<(), ConnectorError> {
        validate_content(&self.read_file()?)
    }
}

/// Content preconditions checked before any destructive flow step.
fn validate_content(record_set: &RecordSet) -> Result<(), ConnectorError> {
    if record_set.is_empty() {
        return Err(ConnectorError::Validation("the extract is empty".into()));
    }

    for (idx, name) in record_set.columns().iter().enumerate() {
        if name.is_empty() {
            return Err(ConnectorError::Validation(format!(
                "column {idx} has a blank header; check the configured header row"
            )));
        }
    }

    for (idx, name) in record_set.columns().iter().enumerate() {
        let all_null = record_set.rows().iter().all(|row| row[idx].is_null());
        if all_null {
            return Err(ConnectorError::Validation(format!(
                "column '{name}' contains only missing values"
            )));
        }
    }

    // A header that closely matches the first data row means the sheet
    // layout shifted and data is being read as headers (or vice versa).
    let first_row = &record_set.rows()[0];
    for (idx, name) in record_set.columns().iter().enumerate() {
        if let Some(text) = first_row[idx].to_text() {
            let similarity = similarity_ratio(name, &text);
            if similarity > MAX_HEADER_SIMILARITY {
                return Err(ConnectorError::Validation(format!(
                    "header '{name}' is too similar to first-row value '{text}' \
                     (similarity {similarity}%); check the sheet layout"
                )));
            }
        }
    }

    Ok(())
}

/// Similarity of two strings as a 0..=100 ratio based on edit distance.
fn similarity_ratio(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 100;
    }
    let distance = levenshtein(&a, &b);
    (100 * (longest - distance) / longest) as u32
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}
