use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use log::{error, info};

use crate::records::DELIMITER;

/// One row of the enricher's input table. The country-tag columns are named
/// by configuration, so rows are read by header position instead of serde.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputRow {
    pub name: String,
    pub link: String,
    pub country_1: String,
    pub country_2: String,
    pub index: String,
}

/// Load the input table. `Name`, `Link` and `Index` columns are required;
/// the two country-tag columns default to empty when absent. Header names
/// are BOM-stripped and whitespace-trimmed before matching.
pub fn load_rows(path: &Path, country_1_col: &str, country_2_col: &str) -> Result<Vec<InputRow>> {
    let file = File::open(path)
        .with_context(|| format!("could not open input file {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .context("could not read input file headers")?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let position = |name: &str| headers.iter().position(|header| header == name);

    let name_idx = position("Name")
        .with_context(|| format!("input file {} is missing the 'Name' column", path.display()))?;
    let link_idx = position("Link")
        .with_context(|| format!("input file {} is missing the 'Link' column", path.display()))?;
    let index_idx = position("Index")
        .with_context(|| format!("input file {} is missing the 'Index' column", path.display()))?;
    let country_1_idx = position(country_1_col);
    let country_2_idx = position(country_2_col);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                error!("Error parsing input record: {}", e);
                continue;
            }
        };
        let field = |idx: Option<usize>| -> String {
            idx.and_then(|i| record.get(i)).unwrap_or("").to_string()
        };
        rows.push(InputRow {
            name: field(Some(name_idx)),
            link: field(Some(link_idx)),
            country_1: field(country_1_idx),
            country_2: field(country_2_idx),
            index: field(Some(index_idx)),
        });
    }

    info!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_input(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn loads_rows_with_bom_and_padded_headers() {
        let file = write_input(
            "\u{feff}Name * Link *United States*Index\nAcme*https://x.example/a*yes*1\n"
                .as_bytes(),
        );
        let rows = load_rows(file.path(), "United States", "Canada").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Acme");
        assert_eq!(rows[0].link, "https://x.example/a");
        assert_eq!(rows[0].country_1, "yes");
        assert_eq!(rows[0].country_2, "");
        assert_eq!(rows[0].index, "1");
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let file = write_input(b"Name*Index\nAcme*1\n");
        let err = load_rows(file.path(), "United States", "Canada").unwrap_err();
        assert!(err.to_string().contains("'Link'"));
    }

    #[test]
    fn both_country_columns_resolve_when_present() {
        let file = write_input(
            b"Name*Link*United States*Canada*Index\nAcme*https://x.example/a*yes*also*7\n",
        );
        let rows = load_rows(file.path(), "United States", "Canada").unwrap();
        assert_eq!(rows[0].country_1, "yes");
        assert_eq!(rows[0].country_2, "also");
        assert_eq!(rows[0].index, "7");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_rows(&dir.path().join("absent.csv"), "A", "B").unwrap_err();
        assert!(err.to_string().contains("could not open input file"));
    }
}
