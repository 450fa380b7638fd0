//! Header-bearing delimited files
//!
//! Double-quoted fields may contain the delimiter, newlines and doubled
//! quotes (`""`). The first row names the columns.

use super::{IngestError, IngestResult};
use indexmap::IndexMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One data row: column name → raw cell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// 1-based line the row starts on, 0 for records built in memory
    pub line: usize,
    pub fields: IndexMap<String, String>,
}

impl Record {
    pub fn new<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Record {
            line: 0,
            fields: fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// The first column, the natural key of interchange files
    pub fn first(&self) -> Option<(&str, &str)> {
        self.fields.first().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Supplies records with named fields
pub trait TabularSource {
    /// Short name used in logs and reports
    fn name(&self) -> String;

    fn records(&self) -> IngestResult<Vec<Record>>;
}

/// Records held in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pub name: String,
    pub records: Vec<Record>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Self {
        MemorySource {
            name: name.into(),
            records,
        }
    }
}

impl TabularSource for MemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn records(&self) -> IngestResult<Vec<Record>> {
        Ok(self.records.clone())
    }
}

/// A delimited file on disk
#[derive(Debug, Clone)]
pub struct DelimitedFile {
    path: PathBuf,
    delimiter: char,
}

impl DelimitedFile {
    pub fn new(path: impl Into<PathBuf>, delimiter: char) -> Self {
        DelimitedFile {
            path: path.into(),
            delimiter,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TabularSource for DelimitedFile {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn records(&self) -> IngestResult<Vec<Record>> {
        let text = fs::read_to_string(&self.path).map_err(|source| IngestError::Io {
            path: self.path.clone(),
            source,
        })?;
        let records = parse_delimited(&text, self.delimiter).map_err(|(line, reason)| IngestError::Malformed {
            source_name: self.name(),
            line,
            reason,
        })?;
        debug!(path = %self.path.display(), records = records.len(), "delimited file read");
        Ok(records)
    }
}

/// Split `text` into rows of cells. Errors carry the offending line.
fn split_rows(text: &str, delimiter: char) -> Result<Vec<(usize, Vec<String>)>, (usize, String)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_start = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    cell.push(c);
                }
                _ => cell.push(c),
            }
            continue;
        }

        match c {
            '"' if cell.is_empty() => in_quotes = true,
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut cell));
                rows.push((row_start, std::mem::take(&mut row)));
                line += 1;
                row_start = line;
            }
            c if c == delimiter => row.push(std::mem::take(&mut cell)),
            _ => cell.push(c),
        }
    }

    if in_quotes {
        return Err((row_start, "unterminated quoted field".to_string()));
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push((row_start, row));
    }
    // Blank lines carry no data
    rows.retain(|(_, cells)| !(cells.len() == 1 && cells[0].is_empty()));
    Ok(rows)
}

/// Parse a header-bearing delimited document into records
pub fn parse_delimited(text: &str, delimiter: char) -> Result<Vec<Record>, (usize, String)> {
    let mut rows = split_rows(text, delimiter)?.into_iter();
    let Some((_, header)) = rows.next() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header.into_iter().map(|h| h.trim().to_string()).collect();

    rows.map(|(line, cells)| {
        if cells.len() > header.len() {
            return Err((
                line,
                format!("{} cells for {} columns", cells.len(), header.len()),
            ));
        }
        let mut fields: IndexMap<String, String> = header.iter().cloned().zip(cells).collect();
        // Short rows are padded so every record carries every column
        for column in &header {
            fields.entry(column.clone()).or_default();
        }
        Ok(Record { line, fields })
    })
    .collect()
}

fn quote_cell(cell: &str, delimiter: char) -> String {
    if cell.contains(delimiter) || cell.contains('"') || cell.contains('\n') || cell.contains('\r') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Write a header and rows, quoting cells that need it
pub fn write_delimited<W: Write>(
    writer: &mut W,
    delimiter: char,
    header: &[&str],
    rows: &[Vec<String>],
) -> std::io::Result<()> {
    let separator = delimiter.to_string();
    let line: Vec<String> = header.iter().map(|h| quote_cell(h, delimiter)).collect();
    writeln!(writer, "{}", line.join(&separator))?;
    for row in rows {
        let line: Vec<String> = row.iter().map(|c| quote_cell(c, delimiter)).collect();
        writeln!(writer, "{}", line.join(&separator))?;
    }
    Ok(())
}

/// Write an interchange file at `path`
pub fn write_delimited_file(path: &Path, delimiter: char, header: &[&str], rows: &[Vec<String>]) -> IngestResult<()> {
    let io_err = |source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::io::BufWriter::new(fs::File::create(path).map_err(io_err)?);
    write_delimited(&mut file, delimiter, header, rows).map_err(io_err)?;
    file.flush().map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_quoted_cells() {
        let text = "id;title;participants\n1;\"Smart; grids\";A;B\n";
        assert!(parse_delimited(text, ';').is_err());

        let text = "id;title\n1;\"Smart; \"\"grids\"\"\"\n2;\"multi\nline\"\n";
        let records = parse_delimited(text, ';').unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("title"), Some("Smart; \"grids\""));
        assert_eq!(records[1].get("title"), Some("multi\nline"));
        assert_eq!(records[1].line, 3);
    }

    #[test]
    fn test_short_rows_are_padded_and_blank_lines_skipped() {
        let text = "\u{feff}rcn,persons\r\n10\r\n\r\n11,Ann Lee\r\n";
        let records = parse_delimited(text, ',').unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("persons"), Some(""));
        assert_eq!(records[1].first(), Some(("rcn", "11")));
    }

    #[test]
    fn test_unterminated_quote() {
        let err = parse_delimited("a,b\n1,\"open\n", ',').unwrap_err();
        assert_eq!(err.0, 2);
    }

    #[test]
    fn test_write_then_read_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys.csv");
        let rows = vec![
            vec!["1".to_string(), "energy;solar, wind".to_string()],
            vec!["2".to_string(), "say \"hi\"".to_string()],
        ];
        write_delimited_file(&path, ',', &["id", "keyphrases"], &rows).unwrap();

        let records = DelimitedFile::new(&path, ',').records().unwrap();
        assert_eq!(records[0].get("keyphrases"), Some("energy;solar, wind"));
        assert_eq!(records[1].get("keyphrases"), Some("say \"hi\""));
    }

    #[test]
    fn test_missing_file() {
        let source = DelimitedFile::new("/nonexistent/cordis.csv", ';');
        assert!(matches!(source.records(), Err(IngestError::Io { .. })));
    }
}
