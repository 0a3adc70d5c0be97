use crate::error::IngestError;
use csv::ReaderBuilder;
use std::path::Path;

/// Column identifier: a header label or a zero-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Name(String),
    Index(usize),
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnRef::Name(name) => f.write_str(name),
            ColumnRef::Index(idx) => write!(f, "column {}", idx),
        }
    }
}

/// Raw cell text as decoded from CSV, with the first record read as labels.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub labels: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn width(&self) -> usize {
        self.labels.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Re-read the table as if the source declared no header: the label row
    /// becomes data row 0 and labels become positional numerals.
    pub fn into_headerless(self) -> RawTable {
        let labels = (0..self.labels.len()).map(|i| i.to_string()).collect();
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.push(self.labels);
        rows.extend(self.rows);
        RawTable { labels, rows }
    }

    pub fn position(&self, column: &ColumnRef) -> Option<usize> {
        match column {
            ColumnRef::Name(name) => self.labels.iter().position(|label| label == name),
            ColumnRef::Index(idx) if *idx < self.labels.len() => Some(*idx),
            ColumnRef::Index(_) => None,
        }
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|label| label == name)
    }

    /// Cells of one column starting at `skip`; short rows yield empty cells.
    pub fn column(&self, column: &ColumnRef, skip: usize) -> Option<Vec<&str>> {
        let idx = self.position(column)?;
        Some(
            self.rows
                .iter()
                .skip(skip)
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

/// Decode CSV bytes into a [`RawTable`]. Ragged rows are accepted; blank lines
/// are skipped by the reader.
pub fn decode_csv(bytes: &[u8]) -> Result<RawTable, IngestError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut records = reader.records();
    let labels: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(str::to_string).collect(),
        None => {
            return Err(IngestError::MalformedInput {
                reason: "no columns to parse from file".into(),
            })
        }
    };
    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawTable { labels, rows })
}

/// Read and decode a CSV file from disk.
pub fn read_csv(path: &Path) -> Result<RawTable, IngestError> {
    let bytes = std::fs::read(path).map_err(|err| IngestError::MalformedInput {
        reason: format!("failed to read {}: {}", path.display(), err),
    })?;
    decode_csv(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_record_becomes_labels() {
        let table = decode_csv(b"time,eda\n0,1.5\n1,1.6\n").unwrap();
        assert_eq!(table.labels, vec!["time", "eda"]);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.column(&ColumnRef::Name("eda".into()), 0).unwrap(),
            vec!["1.5", "1.6"]
        );
    }

    #[test]
    fn headerless_view_restores_label_row() {
        let table = decode_csv(b"1583412345.0\n4.0\n0.1\n").unwrap().into_headerless();
        assert_eq!(table.labels, vec!["0"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(0, 0), Some("1583412345.0"));
    }

    #[test]
    fn short_rows_yield_empty_cells() {
        let table = decode_csv(b"a,b\n1,2\n3\n").unwrap();
        assert_eq!(table.column(&ColumnRef::Index(1), 0).unwrap(), vec!["2", ""]);
    }

    #[test]
    fn empty_input_is_malformed() {
        assert!(matches!(
            decode_csv(b""),
            Err(IngestError::MalformedInput { .. })
        ));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        assert!(matches!(
            decode_csv(b"eda\n\xff\xfe\n"),
            Err(IngestError::MalformedInput { .. })
        ));
    }
}
