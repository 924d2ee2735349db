//! Reading mutation records from JSON and tab-separated text.

use std::path::Path;

use serde_json::Value;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::Row;

/// Cells read as null in tab-separated files.
const NULL_CELLS: [&str; 3] = ["", ".", "NA"];

/// On-disk layout of a record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// An array of flat objects
    Json,
    /// A header line followed by one record per line
    Tsv,
}

impl RecordFormat {
    /// Picks the format from the file extension; anything but `.json` is TSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => RecordFormat::Json,
            _ => RecordFormat::Tsv,
        }
    }

    pub fn parse(self, content: &str, path: &Path) -> ApplicationResult<Vec<Row>> {
        match self {
            RecordFormat::Json => parse_json_rows(content, path),
            RecordFormat::Tsv => parse_tsv_rows(content, path),
        }
    }
}

fn parse_err(path: &Path, message: impl Into<String>) -> ApplicationError {
    ApplicationError::Parse {
        what: path.display().to_string(),
        message: message.into(),
    }
}

/// Parses `[{"Sample": "S1", "Gene": "TP53", ...}, ...]`.
///
/// Strings, numbers and booleans become text; `null` is a missing value.
pub fn parse_json_rows(content: &str, path: &Path) -> ApplicationResult<Vec<Row>> {
    let value: Value = serde_json::from_str(content).map_err(|e| parse_err(path, e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(parse_err(path, "expected an array of records"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let Value::Object(fields) = item else {
                return Err(parse_err(path, format!("record {} is not an object", i + 1)));
            };
            fields
                .into_iter()
                .map(|(field, value)| {
                    let cell = match value {
                        Value::Null => None,
                        Value::String(s) => Some(s),
                        Value::Number(n) => Some(n.to_string()),
                        Value::Bool(b) => Some(b.to_string()),
                        _ => {
                            return Err(parse_err(
                                path,
                                format!("record {}: field {} is not a scalar", i + 1, field),
                            ))
                        }
                    };
                    Ok((field, cell))
                })
                .collect()
        })
        .collect()
}

/// Parses a tab-separated table with a header line.
pub fn parse_tsv_rows(content: &str, path: &Path) -> ApplicationResult<Vec<Row>> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with('#'));

    let Some((_, header)) = lines.next() else {
        return Err(parse_err(path, "missing header line"));
    };
    let columns: Vec<&str> = header.split('\t').map(str::trim).collect();

    lines
        .map(|(n, line)| {
            let cells: Vec<&str> = line.split('\t').collect();
            if cells.len() != columns.len() {
                return Err(parse_err(
                    path,
                    format!(
                        "line {}: expected {} fields, found {}",
                        n + 1,
                        columns.len(),
                        cells.len()
                    ),
                ));
            }
            Ok(columns
                .iter()
                .zip(cells)
                .map(|(column, cell)| {
                    let cell = cell.trim();
                    let value = (!NULL_CELLS.contains(&cell)).then(|| cell.to_string());
                    (column.to_string(), value)
                })
                .collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_json_with_null_when_parsing_then_reads_missing_value() {
        let content = r#"[{"Sample": "S1", "Gene": "TP53", "Score": 0.5, "Form": null}]"#;
        let rows = parse_json_rows(content, Path::new("muts.json")).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["Gene"], Some("TP53".to_string()));
        assert_eq!(rows[0]["Score"], Some("0.5".to_string()));
        assert_eq!(rows[0]["Form"], None);
    }

    #[test]
    fn given_json_object_when_parsing_then_fails() {
        let result = parse_json_rows(r#"{"Sample": "S1"}"#, Path::new("muts.json"));
        assert!(matches!(result, Err(ApplicationError::Parse { .. })));
    }

    #[test]
    fn given_tsv_with_null_cells_when_parsing_then_reads_missing_values() {
        let content = "Sample\tGene\tProtein\nS1\tTP53\tp.R175H\nS2\tKRAS\t.\nS3\tBRAF\t\n";
        let rows = parse_tsv_rows(content, Path::new("muts.tsv")).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["Protein"], Some("p.R175H".to_string()));
        assert_eq!(rows[1]["Protein"], None);
        assert_eq!(rows[2]["Protein"], None);
    }

    #[test]
    fn given_ragged_tsv_when_parsing_then_reports_line() {
        let err = parse_tsv_rows("Sample\tGene\nS1\n", Path::new("muts.tsv")).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn given_extension_when_detecting_format_then_json_or_tsv() {
        assert_eq!(RecordFormat::from_path(Path::new("a/muts.JSON")), RecordFormat::Json);
        assert_eq!(RecordFormat::from_path(Path::new("a/muts.txt")), RecordFormat::Tsv);
    }
}
