use crate::error::ConnectorError;
use chrono::NaiveDate;
use std::{ops::RangeInclusive, path::PathBuf, time::Duration};

pub const DEFAULT_ANALYTICAL_PORT: u16 = 30015;

/// Connection parameters for the analytical source database.
#[derive(Debug, Clone)]
pub struct AnalyticalProfile {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
}

impl AnalyticalProfile {
    pub fn new(host: &str, user: &str, password: &str) -> Self {
        AnalyticalProfile {
            host: host.to_string(),
            port: DEFAULT_ANALYTICAL_PORT,
            user: user.to_string(),
            password: password.to_string(),
            database: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }
}

/// Connection parameters for the relational target database. The
/// `driver` name selects the wire driver; unsupported names are a
/// configuration error at adapter construction, not at first use.
#[derive(Debug, Clone)]
pub struct RelationalProfile {
    pub host: String,
    pub user: String,
    pub password: String,
    pub driver: String,
    pub database: String,
}

impl RelationalProfile {
    pub fn conn_string(&self) -> String {
        format!(
            "host={} user={} password={} dbname={}",
            self.host, self.user, self.password, self.database
        )
    }
}

/// Parameters for a spreadsheet extract: file path, which row carries
/// the header, and an optional column-range selector such as "B:F".
#[derive(Debug, Clone)]
pub struct SheetProfile {
    pub path: PathBuf,
    pub header_row: usize,
    pub columns: Option<ColumnRange>,
    pub delimiter: u8,
}

impl SheetProfile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SheetProfile {
            path: path.into(),
            header_row: 0,
            columns: None,
            delimiter: b',',
        }
    }

    pub fn with_header_row(mut self, header_row: usize) -> Self {
        self.header_row = header_row;
        self
    }

    pub fn with_columns(mut self, range: ColumnRange) -> Self {
        self.columns = Some(range);
        self
    }
}

/// Spreadsheet-style column selector, e.g. "B:F" keeps columns 1..=5.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRange {
    pub start: usize,
    pub end: usize,
}

impl ColumnRange {
    pub fn parse(selector: &str) -> Result<Self, ConnectorError> {
        let (start, end) = selector.split_once(':').ok_or_else(|| {
            ConnectorError::Config(format!(
                "invalid column range '{selector}', expected e.g. 'B:F'"
            ))
        })?;
        let start = column_index(start)?;
        let end = column_index(end)?;
        if end < start {
            return Err(ConnectorError::Config(format!(
                "column range '{selector}' ends before it starts"
            )));
        }
        Ok(ColumnRange { start, end })
    }

    pub fn indices(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index <= self.end
    }
}

/// Converts a spreadsheet column label (A, B, .., Z, AA, ..) to a
/// zero-based index.
fn column_index(label: &str) -> Result<usize, ConnectorError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(ConnectorError::Config("empty column label".into()));
    }
    let mut index = 0usize;
    for ch in label.chars() {
        let ch = ch.to_ascii_uppercase();
        if !ch.is_ascii_uppercase() {
            return Err(ConnectorError::Config(format!(
                "invalid column label '{label}'"
            )));
        }
        index = index * 26 + (ch as usize - 'A' as usize + 1);
    }
    Ok(index - 1)
}

/// Parameters for the paginated HTTP API source.
#[derive(Debug, Clone)]
pub struct ApiProfile {
    pub base_url: String,
    pub start_date: NaiveDate,
    pub page_size: usize,
    pub timeout: Duration,
}

impl ApiProfile {
    pub fn new(base_url: &str, start_date: NaiveDate) -> Self {
        ApiProfile {
            base_url: base_url.to_string(),
            start_date,
            page_size: 500,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
