//! CSV dataset loading.
//!
//! Reads a header row plus records into a [`Dataset`], enforcing the
//! upload size limit and falling back to Latin-1 for files that are not
//! valid UTF-8.

use super::{Cell, Column, Dataset, DatasetError};
use std::path::Path;
use tracing::{debug, info, warn};

/// Load a CSV file, rejecting files larger than `max_size_mb`.
pub fn load_csv(path: &Path, max_size_mb: u64) -> Result<Dataset, DatasetError> {
    let metadata = std::fs::metadata(path)?;
    let size_mb = metadata.len() as f64 / (1024.0 * 1024.0);
    if metadata.len() > max_size_mb * 1024 * 1024 {
        return Err(DatasetError::TooLarge {
            size_mb,
            limit_mb: max_size_mb,
        });
    }

    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    info!("Loading dataset {} ({:.2}MB)", name, size_mb);
    parse_csv(&name, &decode(&bytes))
}

/// Decode bytes as UTF-8, or as Latin-1 when that fails.
fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.trim_start_matches('\u{feff}').to_string(),
        Err(_) => {
            warn!("File is not valid UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// Parse CSV text with a header row.
pub fn parse_csv(name: &str, text: &str) -> Result<Dataset, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(DatasetError::NoColumns);
    }

    let mut cells: Vec<Vec<Cell>> = vec![Vec::new(); headers.len()];
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(DatasetError::RaggedRow {
                row: i + 2,
                found: record.len(),
                expected: headers.len(),
            });
        }
        for (col, column_cells) in cells.iter_mut().enumerate() {
            // Short rows are padded with missing values.
            let cell = record.get(col).map(Cell::parse).unwrap_or(Cell::Missing);
            column_cells.push(cell);
        }
    }

    if cells[0].is_empty() {
        return Err(DatasetError::Empty);
    }

    let columns: Vec<Column> = headers
        .iter()
        .zip(cells)
        .map(|(h, c)| Column::new(h, c))
        .collect();

    let dataset = Dataset::new(name, columns);
    debug!(
        "Parsed {} rows x {} columns",
        dataset.n_rows(),
        dataset.n_columns()
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_csv() {
        let ds = parse_csv("t.csv", "Gender,Age,Region\nF,30,north\nM,,south\n").unwrap();
        assert_eq!(ds.n_rows(), 2);
        assert_eq!(ds.column_names(), vec!["gender", "age", "region"]);
        assert_eq!(ds.column("age").unwrap().cells[1], Cell::Missing);
        assert_eq!(ds.column("age").unwrap().cells[0], Cell::Number(30.0));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let ds = parse_csv("t.csv", "a,b\n1\n2,3\n").unwrap();
        assert_eq!(ds.column("b").unwrap().cells, vec![Cell::Missing, Cell::Number(3.0)]);
    }

    #[test]
    fn test_long_rows_are_rejected() {
        let err = parse_csv("t.csv", "a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(err, DatasetError::RaggedRow { row: 2, .. }));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let err = parse_csv("t.csv", "a,b\n").unwrap_err();
        assert!(matches!(err, DatasetError::Empty));
    }

    #[test]
    fn test_latin1_fallback() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // "género" with é encoded as Latin-1 0xE9
        file.write_all(b"g\xe9nero,score\nf,1\n").unwrap();
        let ds = load_csv(file.path(), 50).unwrap();
        assert_eq!(ds.column_names(), vec!["género", "score"]);
    }

    #[test]
    fn test_size_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![b'a'; 2 * 1024 * 1024]).unwrap();
        let err = load_csv(file.path(), 1).unwrap_err();
        assert!(matches!(err, DatasetError::TooLarge { limit_mb: 1, .. }));
    }
}
